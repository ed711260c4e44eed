//! Model validation: well-formedness checks and the entrypoint analysis.
//!
//! Checks run in a fixed order and stop at the first failure, so a
//! structural defect never cascades into misleading follow-on errors:
//! reserved names, duplicate types, rewrite well-formedness (empty rewrites,
//! unresolved references, non-tuple-mediated self-references), schema 1.1
//! type-restriction consistency, and finally the entrypoint analysis.

use std::collections::{BTreeSet, HashSet};
use std::ops::ControlFlow;

use crate::error::{TypesystemError, TypesystemResult};
use crate::model::walker::{self, RewriteLeaf};
use crate::model::{AuthorizationModel, RelationReference, Userset, SCHEMA_VERSION_1_1};

use super::TypeSystem;

const RESERVED_NAMES: [&str; 2] = ["this", "self"];

impl TypeSystem {
    /// Validates `model` and returns the queryable handle.
    ///
    /// On success the derived classifications (involves-intersection,
    /// involves-exclusion) are prewarmed so later queries never recompute
    /// them.
    pub fn new_and_validate(model: AuthorizationModel) -> TypesystemResult<Self> {
        let typesystem = Self::new(model);
        typesystem.validate()?;
        typesystem.prewarm_classifications()?;
        tracing::debug!(
            types = typesystem.model().type_definitions.len(),
            schema_version = typesystem.schema_version(),
            "validated authorization model"
        );
        Ok(typesystem)
    }

    fn validate(&self) -> TypesystemResult<()> {
        self.check_reserved_names()?;
        self.check_duplicate_types()?;
        self.check_rewrites()?;
        self.check_type_restrictions()?;
        self.check_entrypoints()
    }

    fn check_reserved_names(&self) -> TypesystemResult<()> {
        for type_def in &self.model().type_definitions {
            if RESERVED_NAMES.contains(&type_def.type_name.as_str()) {
                return Err(TypesystemError::ReservedKeywords {
                    name: type_def.type_name.clone(),
                });
            }
            for relation in type_def.relations.keys() {
                if RESERVED_NAMES.contains(&relation.as_str()) {
                    return Err(TypesystemError::ReservedKeywords {
                        name: relation.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_duplicate_types(&self) -> TypesystemResult<()> {
        let mut seen = HashSet::new();
        for type_def in &self.model().type_definitions {
            if !seen.insert(type_def.type_name.as_str()) {
                return Err(TypesystemError::DuplicateTypes {
                    type_name: type_def.type_name.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_rewrites(&self) -> TypesystemResult<()> {
        for type_def in &self.model().type_definitions {
            for (name, rewrite) in &type_def.relations {
                if walker::has_empty_combinator(rewrite) {
                    return Err(TypesystemError::InvalidUsersetRewrite {
                        type_name: type_def.type_name.clone(),
                        relation: name.clone(),
                    });
                }
                self.check_rewrite_references(&type_def.type_name, rewrite)?;
                if walker::references_relation(rewrite, name) {
                    return Err(TypesystemError::InvalidUsersetRewrite {
                        type_name: type_def.type_name.clone(),
                        relation: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Every computed userset and tuple-to-userset component must resolve to
    /// a defined relation. A tuple-to-userset's computed relation is looked
    /// up across the whole model: which subject types actually carry it is
    /// settled by the entrypoint analysis, not here.
    fn check_rewrite_references(
        &self,
        type_name: &str,
        rewrite: &Userset,
    ) -> TypesystemResult<()> {
        let error = walker::walk_leaves(rewrite, &mut |leaf, _| {
            match leaf {
                RewriteLeaf::This => {}
                RewriteLeaf::ComputedUserset { relation } => {
                    if !self.has_relation(type_name, relation) {
                        return ControlFlow::Break(TypesystemError::RelationUndefined {
                            type_name: type_name.to_string(),
                            relation: relation.to_string(),
                        });
                    }
                }
                RewriteLeaf::TupleToUserset {
                    tupleset,
                    computed_userset,
                } => {
                    if !self.has_relation(type_name, tupleset) {
                        return ControlFlow::Break(TypesystemError::RelationUndefined {
                            type_name: type_name.to_string(),
                            relation: tupleset.to_string(),
                        });
                    }
                    let defined_somewhere = self
                        .model()
                        .type_definitions
                        .iter()
                        .any(|td| td.relations.contains_key(computed_userset));
                    if !defined_somewhere {
                        return ControlFlow::Break(TypesystemError::RelationUndefined {
                            type_name: type_name.to_string(),
                            relation: computed_userset.to_string(),
                        });
                    }
                }
            }
            ControlFlow::Continue(())
        });
        match error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn check_type_restrictions(&self) -> TypesystemResult<()> {
        if self.schema_version() != SCHEMA_VERSION_1_1 {
            return Ok(());
        }

        for type_def in &self.model().type_definitions {
            let tupleset_relations = self.tupleset_relations_of(&type_def.type_name);

            for (name, rewrite) in &type_def.relations {
                let related = self
                    .get_relation(&type_def.type_name, name)?
                    .directly_related_user_types();
                let assignable = walker::contains_this(rewrite);

                if assignable && related.is_empty() {
                    return Err(TypesystemError::AssignableRelation {
                        type_name: type_def.type_name.clone(),
                        relation: name.clone(),
                    });
                }
                if !assignable && !related.is_empty() {
                    return Err(TypesystemError::NonAssignableRelation {
                        type_name: type_def.type_name.clone(),
                        relation: name.clone(),
                    });
                }

                for reference in related {
                    self.check_related_type(&type_def.type_name, name, reference)?;

                    // A tupleset relation must resolve to concrete objects,
                    // so neither wildcards nor usersets may be assignable to it.
                    if tupleset_relations.contains(name.as_str())
                        && (reference.is_wildcard() || reference.is_userset())
                    {
                        return Err(TypesystemError::InvalidRelationType {
                            type_name: type_def.type_name.clone(),
                            relation: name.clone(),
                            related_type: reference.type_name().to_string(),
                            related_relation: reference.relation().map(str::to_string),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn check_related_type(
        &self,
        type_name: &str,
        relation: &str,
        reference: &RelationReference,
    ) -> TypesystemResult<()> {
        let valid = match reference {
            RelationReference::Direct { type_name } | RelationReference::Wildcard { type_name } => {
                self.has_type(type_name)
            }
            RelationReference::Userset {
                type_name,
                relation,
            } => self.has_relation(type_name, relation),
        };
        if valid {
            Ok(())
        } else {
            Err(TypesystemError::InvalidRelationType {
                type_name: type_name.to_string(),
                relation: relation.to_string(),
                related_type: reference.type_name().to_string(),
                related_relation: reference.relation().map(str::to_string),
            })
        }
    }

    fn tupleset_relations_of(&self, type_name: &str) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        if let Some(type_def) = self
            .model()
            .type_definitions
            .iter()
            .find(|td| td.type_name == type_name)
        {
            for rewrite in type_def.relations.values() {
                let mut tuplesets = Vec::new();
                walker::tupleset_relations(rewrite, &mut tuplesets);
                out.extend(tuplesets);
            }
        }
        out
    }

    /// Entrypoint analysis: every relation must reach at least one
    /// assignable `this` leaf along a finite path. The walk distinguishes
    /// running out of assignable leaves (`NoEntrypoints`) from re-entering
    /// an unfinished relation through non-tuple combinators
    /// (`NoEntrypointsLoop`).
    fn check_entrypoints(&self) -> TypesystemResult<()> {
        for type_def in &self.model().type_definitions {
            for name in type_def.relations.keys() {
                let relation = self.get_relation(&type_def.type_name, name)?;
                let mut visited = HashSet::new();
                visited.insert((type_def.type_name.clone(), name.clone()));

                let (has_entrypoint, has_loop) = self.has_entrypoints(
                    &type_def.type_name,
                    name,
                    &relation.rewrite,
                    &visited,
                )?;

                if !has_entrypoint {
                    return Err(if has_loop {
                        TypesystemError::NoEntrypointsLoop {
                            type_name: type_def.type_name.clone(),
                            relation: name.clone(),
                        }
                    } else {
                        TypesystemError::NoEntrypoints {
                            type_name: type_def.type_name.clone(),
                            relation: name.clone(),
                        }
                    });
                }
            }
        }
        Ok(())
    }

    /// Returns `(has_entrypoint, has_loop)` for one rewrite.
    ///
    /// The visited set is branch-local: each descent through a relation
    /// boundary extends a copy, so repeated relations across sibling
    /// branches stay legal. Re-entry through a `this` type restriction or a
    /// tuple-to-userset hop is skipped silently (the tuple hop breaks the
    /// cycle); re-entry through a computed userset is the loop signal.
    fn has_entrypoints(
        &self,
        type_name: &str,
        relation_name: &str,
        rewrite: &Userset,
        visited: &HashSet<(String, String)>,
    ) -> TypesystemResult<(bool, bool)> {
        match rewrite {
            Userset::This => {
                if self.schema_version() != SCHEMA_VERSION_1_1 {
                    // 1.0 models carry no type metadata; direct assignment
                    // is always possible.
                    return Ok((true, false));
                }
                let related = self
                    .get_relation(type_name, relation_name)?
                    .directly_related_user_types();

                let mut has_loop = false;
                for reference in related {
                    match reference {
                        RelationReference::Direct { .. } | RelationReference::Wildcard { .. } => {
                            return Ok((true, false));
                        }
                        RelationReference::Userset {
                            type_name: subject_type,
                            relation: subject_relation,
                        } => {
                            let key = (subject_type.clone(), subject_relation.clone());
                            if visited.contains(&key) {
                                continue;
                            }
                            let Ok(subject) = self.get_relation(subject_type, subject_relation)
                            else {
                                continue;
                            };
                            let mut visited = visited.clone();
                            visited.insert(key);
                            let (has_entrypoint, child_loop) = self.has_entrypoints(
                                subject_type,
                                subject_relation,
                                &subject.rewrite,
                                &visited,
                            )?;
                            if has_entrypoint {
                                return Ok((true, false));
                            }
                            has_loop |= child_loop;
                        }
                    }
                }
                Ok((false, has_loop))
            }

            Userset::ComputedUserset { relation } => {
                let computed = self.get_relation(type_name, relation)?;
                let key = (type_name.to_string(), relation.clone());
                if visited.contains(&key) {
                    return Ok((false, true));
                }
                let mut visited = visited.clone();
                visited.insert(key);
                self.has_entrypoints(type_name, relation, &computed.rewrite, &visited)
            }

            Userset::TupleToUserset {
                tupleset,
                computed_userset,
            } => {
                let tupleset_relation = self.get_relation(type_name, &tupleset.relation)?;
                let computed = &computed_userset.relation;

                let mut has_loop = false;
                for reference in tupleset_relation.directly_related_user_types() {
                    let subject_type = reference.type_name();
                    let Ok(subject) = self.get_relation(subject_type, computed) else {
                        continue;
                    };
                    let key = (subject_type.to_string(), computed.clone());
                    if visited.contains(&key) {
                        continue;
                    }
                    let mut visited = visited.clone();
                    visited.insert(key);
                    let (has_entrypoint, child_loop) = self.has_entrypoints(
                        subject_type,
                        computed,
                        &subject.rewrite,
                        &visited,
                    )?;
                    if has_entrypoint {
                        return Ok((true, false));
                    }
                    has_loop |= child_loop;
                }
                Ok((false, has_loop))
            }

            Userset::Union { children } => {
                let mut has_loop = false;
                for child in children {
                    let (has_entrypoint, child_loop) =
                        self.has_entrypoints(type_name, relation_name, child, visited)?;
                    if has_entrypoint {
                        return Ok((true, false));
                    }
                    has_loop |= child_loop;
                }
                Ok((false, has_loop))
            }

            Userset::Intersection { children } => {
                for child in children {
                    let (has_entrypoint, child_loop) =
                        self.has_entrypoints(type_name, relation_name, child, visited)?;
                    if !has_entrypoint {
                        return Ok((false, child_loop));
                    }
                }
                Ok((true, false))
            }

            Userset::Difference { base, subtract } => {
                let (has_entrypoint, base_loop) =
                    self.has_entrypoints(type_name, relation_name, base, visited)?;
                if !has_entrypoint {
                    return Ok((false, base_loop));
                }
                // The subtracted branch needs no entrypoint of its own, but
                // a cycle inside it still makes evaluation non-terminating.
                let (_, subtract_loop) =
                    self.has_entrypoints(type_name, relation_name, subtract, visited)?;
                if subtract_loop {
                    return Ok((false, true));
                }
                Ok((true, false))
            }
        }
    }

    fn prewarm_classifications(&self) -> TypesystemResult<()> {
        for type_def in &self.model().type_definitions {
            for name in type_def.relations.keys() {
                self.relation_involves_intersection(&type_def.type_name, name)?;
                self.relation_involves_exclusion(&type_def.type_name, name)?;
            }
        }
        Ok(())
    }
}
