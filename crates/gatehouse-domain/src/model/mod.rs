//! Authorization model value types and structural utilities.
//!
//! This module contains:
//! - the immutable model document ([`AuthorizationModel`], [`TypeDefinition`],
//!   [`Userset`]);
//! - relation references and their subsumption rules ([`RelationReference`]);
//! - the rewrite-tree walker ([`walker`]).

pub mod reference;
pub mod types;
#[cfg(test)]
mod types_proptest;
pub mod walker;

pub use reference::RelationReference;
pub use types::{
    AuthorizationModel, Metadata, ObjectRelation, RelationMetadata, TypeDefinition, Userset,
    SCHEMA_VERSION_1_0, SCHEMA_VERSION_1_1,
};
