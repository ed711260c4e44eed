//! Core value types for the authorization model.
//!
//! The shapes here mirror the wire representation of an authorization model:
//! a versioned document of type definitions, each holding a map of relation
//! name to userset rewrite plus (for schema 1.1) per-relation metadata that
//! lists the user types directly assignable through tuples.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::reference::RelationReference;

/// Schema version without per-relation type metadata.
pub const SCHEMA_VERSION_1_0: &str = "1.0";
/// Schema version carrying `directly_related_user_types` metadata.
pub const SCHEMA_VERSION_1_1: &str = "1.1";

/// A versioned, immutable authorization model.
///
/// Models are content-addressed by a server-assigned `id` and never mutated
/// in place; a new model version replaces the old one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationModel {
    /// Server-assigned identifier. Opaque to the core.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// One of [`SCHEMA_VERSION_1_0`] or [`SCHEMA_VERSION_1_1`].
    pub schema_version: String,
    #[serde(default)]
    pub type_definitions: Vec<TypeDefinition>,
}

impl AuthorizationModel {
    /// Creates an empty model with the given schema version.
    pub fn new(schema_version: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            schema_version: schema_version.into(),
            type_definitions: Vec::new(),
        }
    }

    /// Creates a model with the given schema version and type definitions.
    pub fn with_types(
        schema_version: impl Into<String>,
        type_definitions: Vec<TypeDefinition>,
    ) -> Self {
        Self {
            id: String::new(),
            schema_version: schema_version.into(),
            type_definitions,
        }
    }
}

/// A named object type and the relations defined on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// The type name (e.g. "document", "folder").
    #[serde(rename = "type")]
    pub type_name: String,
    /// Relation name to userset rewrite. Keys are unique; map order carries
    /// no semantics.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<String, Userset>,
    /// Per-relation type metadata (schema 1.1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl TypeDefinition {
    /// Creates a type definition with no relations.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            relations: BTreeMap::new(),
            metadata: None,
        }
    }

    /// Adds a relation with the given rewrite.
    pub fn with_relation(mut self, name: impl Into<String>, rewrite: Userset) -> Self {
        self.relations.insert(name.into(), rewrite);
        self
    }

    /// Records the directly related user types for a relation.
    pub fn with_related_types(
        mut self,
        relation: impl Into<String>,
        directly_related_user_types: Vec<RelationReference>,
    ) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::default)
            .relations
            .insert(
                relation.into(),
                RelationMetadata {
                    directly_related_user_types,
                },
            );
        self
    }
}

/// Schema 1.1 metadata attached to a type definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<String, RelationMetadata>,
}

/// Metadata for a single relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationMetadata {
    /// The user types that may be written directly into tuples for this
    /// relation. User-authored order is preserved for round-tripping but has
    /// no semantic effect.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directly_related_user_types: Vec<RelationReference>,
}

/// An (object, relation) pair inside a tuple-to-userset rewrite.
///
/// Only the `relation` field carries meaning at the model level; `object` is
/// kept for wire fidelity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRelation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub object: String,
    pub relation: String,
}

impl ObjectRelation {
    /// Creates an object relation referring to the given relation name.
    pub fn relation(relation: impl Into<String>) -> Self {
        Self {
            object: String::new(),
            relation: relation.into(),
        }
    }
}

/// A userset rewrite: the rule expressing how a relation's user set is
/// computed from tuples and other usersets.
///
/// The six shapes form a closed variant; evaluation and analysis dispatch on
/// the tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Userset {
    /// The users directly assigned to `(object, relation)` via tuples.
    This,
    /// The users computed by evaluating another relation on the same object.
    ComputedUserset { relation: String },
    /// For each tuple `(object, tupleset.relation, u)`, the users computed
    /// by evaluating `(u, computed_userset.relation)`.
    #[serde(rename_all = "camelCase")]
    TupleToUserset {
        tupleset: ObjectRelation,
        computed_userset: ObjectRelation,
    },
    Union { children: Vec<Userset> },
    Intersection { children: Vec<Userset> },
    /// Users in `base` that are not in `subtract` ("but not").
    Difference {
        base: Box<Userset>,
        subtract: Box<Userset>,
    },
}

impl Userset {
    /// Direct assignment ("self" in the modeling language).
    pub fn this() -> Self {
        Userset::This
    }

    /// A computed userset over a relation on the same object.
    pub fn computed(relation: impl Into<String>) -> Self {
        Userset::ComputedUserset {
            relation: relation.into(),
        }
    }

    /// A tuple-to-userset rewrite ("computed from tupleset").
    pub fn tuple_to_userset(
        tupleset: impl Into<String>,
        computed_userset: impl Into<String>,
    ) -> Self {
        Userset::TupleToUserset {
            tupleset: ObjectRelation::relation(tupleset),
            computed_userset: ObjectRelation::relation(computed_userset),
        }
    }

    pub fn union(children: Vec<Userset>) -> Self {
        Userset::Union { children }
    }

    pub fn intersection(children: Vec<Userset>) -> Self {
        Userset::Intersection { children }
    }

    pub fn difference(base: Userset, subtract: Userset) -> Self {
        Userset::Difference {
            base: Box::new(base),
            subtract: Box::new(subtract),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelationReference;

    #[test]
    fn build_type_definition() {
        let td = TypeDefinition::new("document")
            .with_relation(
                "viewer",
                Userset::union(vec![Userset::this(), Userset::computed("editor")]),
            )
            .with_relation("editor", Userset::this())
            .with_related_types("viewer", vec![RelationReference::direct("user")])
            .with_related_types("editor", vec![RelationReference::direct("user")]);

        assert_eq!(td.type_name, "document");
        assert_eq!(td.relations.len(), 2);
        let metadata = td.metadata.as_ref().unwrap();
        assert_eq!(
            metadata.relations["viewer"].directly_related_user_types,
            vec![RelationReference::direct("user")]
        );
    }

    #[test]
    fn model_json_round_trip() {
        let model = AuthorizationModel::with_types(
            SCHEMA_VERSION_1_1,
            vec![
                TypeDefinition::new("user"),
                TypeDefinition::new("document")
                    .with_relation(
                        "viewer",
                        Userset::union(vec![
                            Userset::this(),
                            Userset::tuple_to_userset("parent", "viewer"),
                        ]),
                    )
                    .with_relation("parent", Userset::this())
                    .with_related_types("viewer", vec![RelationReference::wildcard("user")])
                    .with_related_types("parent", vec![RelationReference::direct("folder")]),
            ],
        );

        let encoded = serde_json::to_string(&model).unwrap();
        let decoded: AuthorizationModel = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, model);
    }

    #[test]
    fn userset_serializes_with_camel_case_tags() {
        let rewrite = Userset::tuple_to_userset("parent", "viewer");
        let value = serde_json::to_value(&rewrite).unwrap();
        assert!(value.get("tupleToUserset").is_some());
        assert_eq!(value["tupleToUserset"]["computedUserset"]["relation"], "viewer");
    }
}
