//! Error types for model validation and graph queries.

use thiserror::Error;

fn reference_string(related_type: &str, related_relation: Option<&str>) -> String {
    match related_relation {
        Some(relation) => format!("{related_type}#{relation}"),
        None => related_type.to_string(),
    }
}

/// Errors surfaced by the type system and the relationship graph.
///
/// Validation returns the first error of the first failing defect class;
/// graph queries fail fast with the precise error. Every variant carries the
/// offending symbols so callers can reconstruct the message for the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypesystemError {
    /// `this` or `self` used as a type or relation name.
    #[error("'{name}' is a reserved keyword and cannot be used as a type or relation name")]
    ReservedKeywords { name: String },

    /// The same type is defined more than once in a model.
    #[error("the type '{type_name}' is defined more than once")]
    DuplicateTypes { type_name: String },

    /// Empty rewrite, or a relation referencing itself without a tuple hop.
    #[error("the definition of relation '{relation}' on type '{type_name}' is invalid")]
    InvalidUsersetRewrite { type_name: String, relation: String },

    /// A rewrite references a relation not defined on the named type.
    #[error("relation '{relation}' is undefined on type '{type_name}'")]
    RelationUndefined { type_name: String, relation: String },

    /// A graph query named a type that is not in the model.
    #[error("object type '{type_name}' is undefined")]
    ObjectTypeUndefined { type_name: String },

    /// A relation with a `this` leaf has an empty list of related types.
    #[error("the assignable relation '{relation}' on type '{type_name}' must have at least one related type")]
    AssignableRelation { type_name: String, relation: String },

    /// A relation without a `this` leaf has a non-empty list of related types.
    #[error("the non-assignable relation '{relation}' on type '{type_name}' must not have related types")]
    NonAssignableRelation { type_name: String, relation: String },

    /// A related-type entry names a missing type or relation, or an entry
    /// that cannot resolve to concrete objects is used on a tupleset relation.
    #[error(
        "the related type '{}' on relation '{}' of type '{}' is not valid",
        reference_string(.related_type, .related_relation.as_deref()),
        .relation,
        .type_name
    )]
    InvalidRelationType {
        type_name: String,
        relation: String,
        related_type: String,
        related_relation: Option<String>,
    },

    /// The relation never reaches an assignable leaf; evaluation would be vacuous.
    #[error("relation '{relation}' on type '{type_name}' has no entrypoints to an assignable relation")]
    NoEntrypoints { type_name: String, relation: String },

    /// As above, but caused by a cycle through non-tuple combinators.
    #[error("relation '{relation}' on type '{type_name}' is part of a cycle with no entrypoints")]
    NoEntrypointsLoop { type_name: String, relation: String },

    /// A caller-supplied cancellation signal fired mid-query.
    #[error("the operation was cancelled")]
    Cancelled,
}

/// Result type for type system and graph operations.
pub type TypesystemResult<T> = Result<T, TypesystemError>;
