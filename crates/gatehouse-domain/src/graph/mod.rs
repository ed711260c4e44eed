//! The relationship graph: edges a solver follows from a target relation
//! toward a source user or userset.
//!
//! Nodes are relation references; edges point from the target toward the
//! relations an answer can be drawn from. Edges are plain data: solvers
//! consume edge lists, and the graph never calls back into a solver.


use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{TypesystemError, TypesystemResult};
use crate::model::{RelationReference, Userset};
use crate::typesystem::TypeSystem;

/// A cloneable cancellation handle.
///
/// Deep traversals check the signal at every relation frame and abort with
/// [`TypesystemError::Cancelled`] once it fires. A caller enforcing a
/// deadline flips the signal from its timer.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a solver moves across a [`RelationshipEdge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationshipEdgeKind {
    /// The target relation is directly assignable from the source type;
    /// resolution reduces to a tuple lookup on the target.
    Direct,
    /// Traverse a computed-userset rewrite to the target.
    ComputedUserset,
    /// Hop via a tuple on the tupleset relation, then continue from the
    /// target.
    TupleToUserset,
}

impl fmt::Display for RelationshipEdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationshipEdgeKind::Direct => "direct",
            RelationshipEdgeKind::ComputedUserset => "computed_userset",
            RelationshipEdgeKind::TupleToUserset => "ttu",
        };
        f.write_str(name)
    }
}

/// Whether an edge alone proves membership or must be re-confirmed against
/// the siblings of an intersection or exclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeCondition {
    NoFurtherEval,
    RequiresFurtherEval,
}

/// A directed edge from a target relation toward a relation an answer can be
/// drawn from. Comparable by field equality; ordering is stable so tests can
/// sort edge lists before comparing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationshipEdge {
    pub kind: RelationshipEdgeKind,
    pub target_reference: RelationReference,
    /// The tupleset relation hopped over; `Some` only for
    /// [`RelationshipEdgeKind::TupleToUserset`].
    pub tupleset_relation: Option<RelationReference>,
    pub condition: EdgeCondition,
}

impl RelationshipEdge {
    fn direct(target: &RelationReference, condition: EdgeCondition) -> Self {
        Self {
            kind: RelationshipEdgeKind::Direct,
            target_reference: target.clone(),
            tupleset_relation: None,
            condition,
        }
    }

    fn computed_userset(target: &RelationReference, condition: EdgeCondition) -> Self {
        Self {
            kind: RelationshipEdgeKind::ComputedUserset,
            target_reference: target.clone(),
            tupleset_relation: None,
            condition,
        }
    }

    fn tuple_to_userset(
        target: &RelationReference,
        tupleset_relation: RelationReference,
        condition: EdgeCondition,
    ) -> Self {
        Self {
            kind: RelationshipEdgeKind::TupleToUserset,
            target_reference: target.clone(),
            tupleset_relation: Some(tupleset_relation),
            condition,
        }
    }
}

impl fmt::Display for RelationshipEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tupleset_relation {
            Some(tupleset) => write!(
                f,
                "{} ({}, tupleset {})",
                self.target_reference, self.kind, tupleset
            ),
            None => write!(f, "{} ({})", self.target_reference, self.kind),
        }
    }
}

/// Read-only view over a [`TypeSystem`] answering edge queries.
#[derive(Debug, Clone)]
pub struct RelationshipGraph {
    typesystem: Arc<TypeSystem>,
    cancel: CancelSignal,
}

impl RelationshipGraph {
    pub fn new(typesystem: Arc<TypeSystem>) -> Self {
        Self {
            typesystem,
            cancel: CancelSignal::new(),
        }
    }

    /// Installs a cancellation signal checked during traversal.
    pub fn with_cancel_signal(typesystem: Arc<TypeSystem>, cancel: CancelSignal) -> Self {
        Self { typesystem, cancel }
    }

    /// Enumerates all edges from `target` whose traversal can plausibly
    /// reach `source`. Returns an empty list when no connectivity exists.
    pub fn get_relationship_edges(
        &self,
        target: &RelationReference,
        source: &RelationReference,
    ) -> TypesystemResult<Vec<RelationshipEdge>> {
        tracing::trace!(%target, %source, "enumerating relationship edges");
        let mut visited = HashSet::new();
        self.edges_for_relation(target, source, false, &mut visited, false)
    }

    /// As [`Self::get_relationship_edges`], but inside an intersection or
    /// exclusion only the proof obligation survives: the first operand of an
    /// intersection, the base of an exclusion. Lets evaluators short-circuit.
    pub fn get_pruned_relationship_edges(
        &self,
        target: &RelationReference,
        source: &RelationReference,
    ) -> TypesystemResult<Vec<RelationshipEdge>> {
        tracing::trace!(%target, %source, "enumerating pruned relationship edges");
        let mut visited = HashSet::new();
        self.edges_for_relation(target, source, false, &mut visited, true)
    }

    /// One relation frame: cycle guard, rewrite lookup, descend.
    ///
    /// `on_candidate_path` records whether this frame sits on the
    /// proof-obligation path of an enclosing intersection or exclusion; any
    /// edge emitted under it requires further evaluation.
    fn edges_for_relation(
        &self,
        target: &RelationReference,
        source: &RelationReference,
        on_candidate_path: bool,
        visited: &mut HashSet<String>,
        prune: bool,
    ) -> TypesystemResult<Vec<RelationshipEdge>> {
        if self.cancel.is_cancelled() {
            return Err(TypesystemError::Cancelled);
        }

        let type_name = target.type_name();
        let relation_name = target.relation().unwrap_or_default();
        if !visited.insert(format!("{type_name}#{relation_name}")) {
            return Ok(Vec::new());
        }

        let relation = self.typesystem.get_relation(type_name, relation_name)?;
        self.edges_for_rewrite(
            target,
            source,
            &relation.rewrite,
            on_candidate_path,
            visited,
            prune,
        )
    }

    fn edges_for_rewrite(
        &self,
        target: &RelationReference,
        source: &RelationReference,
        rewrite: &Userset,
        on_candidate_path: bool,
        visited: &mut HashSet<String>,
        prune: bool,
    ) -> TypesystemResult<Vec<RelationshipEdge>> {
        let condition = if on_candidate_path {
            EdgeCondition::RequiresFurtherEval
        } else {
            EdgeCondition::NoFurtherEval
        };

        match rewrite {
            Userset::This => {
                let mut edges = Vec::new();

                let directly_related = self.typesystem.is_directly_related(target, source)?;
                let publicly_assignable = self
                    .typesystem
                    .is_publicly_assignable(target, source.type_name())?;
                if directly_related || publicly_assignable {
                    edges.push(RelationshipEdge::direct(target, condition));
                }

                // Userset restrictions widen the search: the answer may live
                // behind e.g. group#member even when the source type is not
                // directly assignable here.
                let related = self.typesystem.directly_related_user_types(
                    target.type_name(),
                    target.relation().unwrap_or_default(),
                )?;
                for reference in related {
                    if let RelationReference::Userset {
                        type_name,
                        relation,
                    } = reference
                    {
                        let inner = RelationReference::userset(type_name, relation);
                        edges.extend(self.edges_for_relation(
                            &inner,
                            source,
                            on_candidate_path,
                            visited,
                            prune,
                        )?);
                    }
                }
                Ok(edges)
            }

            Userset::ComputedUserset { relation } => {
                let mut edges = Vec::new();

                if source.type_name() == target.type_name()
                    && source.relation() == Some(relation.as_str())
                {
                    edges.push(RelationshipEdge::computed_userset(target, condition));
                }

                let inner = RelationReference::userset(target.type_name(), relation);
                edges.extend(self.edges_for_relation(
                    &inner,
                    source,
                    on_candidate_path,
                    visited,
                    prune,
                )?);
                Ok(edges)
            }

            Userset::TupleToUserset {
                tupleset,
                computed_userset,
            } => {
                let computed = computed_userset.relation.as_str();
                let mut edges = Vec::new();

                let subject_types = self
                    .typesystem
                    .directly_related_user_types(target.type_name(), &tupleset.relation)?;
                for reference in subject_types {
                    let subject_type = reference.type_name();
                    if !self.typesystem.has_relation(subject_type, computed) {
                        continue;
                    }

                    if source.type_name() == subject_type && source.relation() == Some(computed) {
                        // The tuple hop jumps over the computed relation's
                        // own rewrite, so an intersection or exclusion hidden
                        // inside it must still be re-confirmed.
                        let requires_eval = on_candidate_path
                            || self
                                .typesystem
                                .relation_involves_intersection(subject_type, computed)?
                            || self
                                .typesystem
                                .relation_involves_exclusion(subject_type, computed)?;
                        edges.push(RelationshipEdge::tuple_to_userset(
                            target,
                            RelationReference::userset(target.type_name(), &tupleset.relation),
                            if requires_eval {
                                EdgeCondition::RequiresFurtherEval
                            } else {
                                EdgeCondition::NoFurtherEval
                            },
                        ));
                    }

                    let inner = RelationReference::userset(subject_type, computed);
                    edges.extend(self.edges_for_relation(
                        &inner,
                        source,
                        on_candidate_path,
                        visited,
                        prune,
                    )?);
                }
                Ok(edges)
            }

            Userset::Union { children } => {
                let mut edges = Vec::new();
                for child in children {
                    edges.extend(self.edges_for_rewrite(
                        target,
                        source,
                        child,
                        on_candidate_path,
                        visited,
                        prune,
                    )?);
                }
                Ok(edges)
            }

            Userset::Intersection { children } => {
                let Some(first) = children.first() else {
                    return Ok(Vec::new());
                };
                if prune {
                    // Only the proof obligation: candidates found through the
                    // first operand, confirmed against the whole intersection.
                    return self.edges_for_rewrite(target, source, first, true, visited, prune);
                }

                let mut edges =
                    self.edges_for_rewrite(target, source, first, true, visited, prune)?;
                for child in &children[1..] {
                    edges.extend(self.edges_for_rewrite(
                        target,
                        source,
                        child,
                        on_candidate_path,
                        visited,
                        prune,
                    )?);
                }
                Ok(edges)
            }

            Userset::Difference { base, subtract } => {
                if prune {
                    return self.edges_for_rewrite(target, source, base, true, visited, prune);
                }

                let mut edges =
                    self.edges_for_rewrite(target, source, base, true, visited, prune)?;
                edges.extend(self.edges_for_rewrite(
                    target,
                    source,
                    subtract,
                    on_candidate_path,
                    visited,
                    prune,
                )?);
                Ok(edges)
            }
        }
    }
}
