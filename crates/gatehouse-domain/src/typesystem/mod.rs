//! The type-system handle: indexed, queryable view over a model.
//!
//! [`TypeSystem::new`] wraps any model (validated or not) with lookup
//! indices; every query degrades gracefully on dangling references by
//! returning [`TypesystemError::ObjectTypeUndefined`] or
//! [`TypesystemError::RelationUndefined`]. [`TypeSystem::new_and_validate`]
//! additionally runs the full validation suite and prewarms the derived
//! classifications so that post-validation queries are read-only.
//!
//! # Thread safety
//!
//! The handle is immutable after construction and safe for unsynchronized
//! concurrent reads. The memoized classifications live in `DashMap`s.

mod validation;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{TypesystemError, TypesystemResult};
use crate::model::walker;
use crate::model::{AuthorizationModel, RelationReference, Userset, SCHEMA_VERSION_1_1};

/// An indexed relation: its rewrite plus the schema 1.1 type metadata.
#[derive(Debug, Clone)]
pub struct Relation {
    pub name: String,
    pub rewrite: Userset,
    /// `Some` when the model carried metadata for this relation, even if the
    /// list itself is empty.
    pub type_info: Option<Vec<RelationReference>>,
}

impl Relation {
    /// The allowed user types for direct assignment; empty without metadata.
    pub fn directly_related_user_types(&self) -> &[RelationReference] {
        self.type_info.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug)]
struct TypeEntry {
    relations: BTreeMap<String, Relation>,
    /// Relations of this type used on the tupleset side of some
    /// tuple-to-userset rewrite, under arbitrary combinator nesting.
    tupleset_relations: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetOperation {
    Intersection,
    Exclusion,
}

/// Queryable, immutable view over an authorization model.
#[derive(Debug)]
pub struct TypeSystem {
    model: Arc<AuthorizationModel>,
    types: HashMap<String, TypeEntry>,
    involves_intersection: DashMap<String, bool>,
    involves_exclusion: DashMap<String, bool>,
}

impl TypeSystem {
    /// Builds the indexed view without validating the model.
    ///
    /// Queries on an unvalidated model never panic; dangling references
    /// surface as errors on the query that touches them.
    pub fn new(model: AuthorizationModel) -> Self {
        let mut types = HashMap::with_capacity(model.type_definitions.len());

        for type_def in &model.type_definitions {
            let mut relations = BTreeMap::new();
            let mut tupleset_relations = BTreeSet::new();

            for (name, rewrite) in &type_def.relations {
                let type_info = type_def.metadata.as_ref().and_then(|metadata| {
                    metadata
                        .relations
                        .get(name)
                        .map(|relation| relation.directly_related_user_types.clone())
                });
                relations.insert(
                    name.clone(),
                    Relation {
                        name: name.clone(),
                        rewrite: rewrite.clone(),
                        type_info,
                    },
                );

                let mut tuplesets = Vec::new();
                walker::tupleset_relations(rewrite, &mut tuplesets);
                tupleset_relations.extend(tuplesets.into_iter().map(str::to_string));
            }

            types.insert(
                type_def.type_name.clone(),
                TypeEntry {
                    relations,
                    tupleset_relations,
                },
            );
        }

        Self {
            model: Arc::new(model),
            types,
            involves_intersection: DashMap::new(),
            involves_exclusion: DashMap::new(),
        }
    }

    /// The underlying model.
    pub fn model(&self) -> &AuthorizationModel {
        &self.model
    }

    pub fn schema_version(&self) -> &str {
        &self.model.schema_version
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn has_relation(&self, type_name: &str, relation: &str) -> bool {
        self.types
            .get(type_name)
            .is_some_and(|entry| entry.relations.contains_key(relation))
    }

    /// Looks up a relation on a type.
    pub fn get_relation(&self, type_name: &str, relation: &str) -> TypesystemResult<&Relation> {
        let entry = self
            .types
            .get(type_name)
            .ok_or_else(|| TypesystemError::ObjectTypeUndefined {
                type_name: type_name.to_string(),
            })?;
        entry
            .relations
            .get(relation)
            .ok_or_else(|| TypesystemError::RelationUndefined {
                type_name: type_name.to_string(),
                relation: relation.to_string(),
            })
    }

    /// Whether schema 1.1 type metadata is present for the relation.
    pub fn has_type_info(&self, type_name: &str, relation: &str) -> TypesystemResult<bool> {
        let relation = self.get_relation(type_name, relation)?;
        Ok(self.model.schema_version == SCHEMA_VERSION_1_1 && relation.type_info.is_some())
    }

    /// The allowed user types for direct assignment on `(type, relation)`.
    pub fn directly_related_user_types(
        &self,
        type_name: &str,
        relation: &str,
    ) -> TypesystemResult<&[RelationReference]> {
        Ok(self.get_relation(type_name, relation)?.directly_related_user_types())
    }

    /// The subset of the allowed user types that are not direct-type
    /// references, i.e. usersets and wildcards.
    pub fn directly_related_usersets(
        &self,
        type_name: &str,
        relation: &str,
    ) -> TypesystemResult<Vec<RelationReference>> {
        Ok(self
            .directly_related_user_types(type_name, relation)?
            .iter()
            .filter(|reference| !matches!(reference, RelationReference::Direct { .. }))
            .cloned()
            .collect())
    }

    /// Whether `source` is covered by `target`'s allowed user types under
    /// the subsumption rules of [`RelationReference::subsumes`].
    pub fn is_directly_related(
        &self,
        target: &RelationReference,
        source: &RelationReference,
    ) -> TypesystemResult<bool> {
        let related = self.directly_related_user_types(
            target.type_name(),
            target.relation().unwrap_or_default(),
        )?;
        Ok(related.iter().any(|reference| reference.subsumes(source)))
    }

    /// Whether `target`'s allowed user types include the wildcard
    /// `object_type:*`.
    pub fn is_publicly_assignable(
        &self,
        target: &RelationReference,
        object_type: &str,
    ) -> TypesystemResult<bool> {
        let related = self.directly_related_user_types(
            target.type_name(),
            target.relation().unwrap_or_default(),
        )?;
        Ok(related
            .iter()
            .any(|reference| reference.is_wildcard() && reference.type_name() == object_type))
    }

    /// Whether the relation is used on the tupleset side of any
    /// tuple-to-userset rewrite on its type.
    pub fn is_tupleset_relation(
        &self,
        type_name: &str,
        relation: &str,
    ) -> TypesystemResult<bool> {
        self.get_relation(type_name, relation)?;
        Ok(self
            .types
            .get(type_name)
            .is_some_and(|entry| entry.tupleset_relations.contains(relation)))
    }

    /// Whether any rewrite transitively reachable from `(type, relation)`
    /// (through computed usersets, tuple-to-userset targets, and userset
    /// type restrictions) contains an intersection.
    pub fn relation_involves_intersection(
        &self,
        type_name: &str,
        relation: &str,
    ) -> TypesystemResult<bool> {
        self.relation_involves(type_name, relation, SetOperation::Intersection)
    }

    /// As [`Self::relation_involves_intersection`], for exclusion.
    pub fn relation_involves_exclusion(
        &self,
        type_name: &str,
        relation: &str,
    ) -> TypesystemResult<bool> {
        self.relation_involves(type_name, relation, SetOperation::Exclusion)
    }

    fn involves_cache(&self, operation: SetOperation) -> &DashMap<String, bool> {
        match operation {
            SetOperation::Intersection => &self.involves_intersection,
            SetOperation::Exclusion => &self.involves_exclusion,
        }
    }

    fn relation_involves(
        &self,
        type_name: &str,
        relation: &str,
        operation: SetOperation,
    ) -> TypesystemResult<bool> {
        let key = format!("{type_name}#{relation}");
        if let Some(hit) = self.involves_cache(operation).get(&key) {
            return Ok(*hit);
        }

        self.get_relation(type_name, relation)?;

        let mut visited = HashSet::new();
        let result = self.involves_from_relation(type_name, relation, &mut visited, operation);
        self.involves_cache(operation).insert(key, result);
        Ok(result)
    }

    /// Reachability walk for the involves classification. Only completed
    /// results are cached, so a cache hit is always sound; an in-progress
    /// relation is truncated by the visited set instead.
    fn involves_from_relation(
        &self,
        type_name: &str,
        relation: &str,
        visited: &mut HashSet<(String, String)>,
        operation: SetOperation,
    ) -> bool {
        if !visited.insert((type_name.to_string(), relation.to_string())) {
            return false;
        }
        if let Some(hit) = self
            .involves_cache(operation)
            .get(&format!("{type_name}#{relation}"))
        {
            return *hit;
        }

        let Ok(rel) = self.get_relation(type_name, relation) else {
            return false;
        };

        if self.rewrite_involves(type_name, &rel.rewrite, visited, operation) {
            return true;
        }

        // A userset type restriction pulls in the referenced relation's
        // rewrites even when this relation's own rewrite is a plain `this`.
        rel.directly_related_user_types().iter().any(|reference| {
            match reference {
                RelationReference::Userset {
                    type_name: subject_type,
                    relation: subject_relation,
                } => self.involves_from_relation(
                    subject_type,
                    subject_relation,
                    visited,
                    operation,
                ),
                _ => false,
            }
        })
    }

    fn rewrite_involves(
        &self,
        type_name: &str,
        rewrite: &Userset,
        visited: &mut HashSet<(String, String)>,
        operation: SetOperation,
    ) -> bool {
        match rewrite {
            Userset::This => false,
            Userset::ComputedUserset { relation } => {
                self.has_relation(type_name, relation)
                    && self.involves_from_relation(type_name, relation, visited, operation)
            }
            Userset::TupleToUserset {
                tupleset,
                computed_userset,
            } => {
                let Ok(related) = self.directly_related_user_types(type_name, &tupleset.relation)
                else {
                    return false;
                };
                // Subject types are concrete on a valid model; resolve the
                // computed relation on each and skip the ones lacking it.
                let subject_types: Vec<String> = related
                    .iter()
                    .map(|reference| reference.type_name().to_string())
                    .collect();
                subject_types.into_iter().any(|subject_type| {
                    self.has_relation(&subject_type, &computed_userset.relation)
                        && self.involves_from_relation(
                            &subject_type,
                            &computed_userset.relation,
                            visited,
                            operation,
                        )
                })
            }
            Userset::Union { children } => children
                .iter()
                .any(|child| self.rewrite_involves(type_name, child, visited, operation)),
            Userset::Intersection { children } => {
                operation == SetOperation::Intersection
                    || children
                        .iter()
                        .any(|child| self.rewrite_involves(type_name, child, visited, operation))
            }
            Userset::Difference { base, subtract } => {
                operation == SetOperation::Exclusion
                    || self.rewrite_involves(type_name, base, visited, operation)
                    || self.rewrite_involves(type_name, subtract, visited, operation)
            }
        }
    }
}
