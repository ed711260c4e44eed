//! gatehouse-domain: authorization type system and relationship graph.
//!
//! The crate turns a user-authored authorization model into a validated,
//! queryable relationship graph:
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                gatehouse-domain                  │
//! ├──────────────────────────────────────────────────┤
//! │  model/       - model values, references, walker │
//! │  typesystem/  - validation + indexed queries     │
//! │  graph/       - relationship edges for solvers   │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Construction is one-shot: build a model, validate it once with
//! [`TypeSystem::new_and_validate`], then serve queries from the immutable
//! handle. All queries are pure and safe for concurrent readers.
//!
//! ```
//! use gatehouse_domain::model::{
//!     AuthorizationModel, RelationReference, TypeDefinition, Userset, SCHEMA_VERSION_1_1,
//! };
//! use gatehouse_domain::{RelationshipGraph, TypeSystem};
//! use std::sync::Arc;
//!
//! let model = AuthorizationModel::with_types(
//!     SCHEMA_VERSION_1_1,
//!     vec![
//!         TypeDefinition::new("user"),
//!         TypeDefinition::new("document")
//!             .with_relation("viewer", Userset::this())
//!             .with_related_types("viewer", vec![RelationReference::direct("user")]),
//!     ],
//! );
//!
//! let typesystem = Arc::new(TypeSystem::new_and_validate(model)?);
//! let graph = RelationshipGraph::new(typesystem);
//! let edges = graph.get_relationship_edges(
//!     &RelationReference::userset("document", "viewer"),
//!     &RelationReference::direct("user"),
//! )?;
//! assert_eq!(edges.len(), 1);
//! # Ok::<(), gatehouse_domain::TypesystemError>(())
//! ```

pub mod error;
pub mod graph;
pub mod model;
pub mod typesystem;

pub use error::{TypesystemError, TypesystemResult};
pub use graph::{
    CancelSignal, EdgeCondition, RelationshipEdge, RelationshipEdgeKind, RelationshipGraph,
};
pub use typesystem::{Relation, TypeSystem};
