//! Structural traversal of userset rewrite trees.
//!
//! The walker visits every leaf of a rewrite (`This`, computed userset,
//! tuple-to-userset) together with the stack of boolean combinators enclosing
//! it, in declaration order. It is pure and total; callers stop early with
//! [`ControlFlow::Break`].

use std::ops::ControlFlow;

use super::types::Userset;

/// A boolean combinator on the path from the rewrite root to a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Union,
    Intersection,
    DifferenceBase,
    DifferenceSubtract,
}

/// A leaf of a rewrite tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteLeaf<'a> {
    This,
    ComputedUserset {
        relation: &'a str,
    },
    TupleToUserset {
        tupleset: &'a str,
        computed_userset: &'a str,
    },
}

/// Visits every leaf of `rewrite` with its enclosing combinator stack.
///
/// Returns whatever the visitor breaks with, or `None` if the walk ran to
/// completion.
pub fn walk_leaves<'a, B>(
    rewrite: &'a Userset,
    visit: &mut impl FnMut(RewriteLeaf<'a>, &[Combinator]) -> ControlFlow<B>,
) -> Option<B> {
    let mut stack = Vec::new();
    match walk(rewrite, &mut stack, visit) {
        ControlFlow::Break(value) => Some(value),
        ControlFlow::Continue(()) => None,
    }
}

fn walk<'a, B>(
    rewrite: &'a Userset,
    stack: &mut Vec<Combinator>,
    visit: &mut impl FnMut(RewriteLeaf<'a>, &[Combinator]) -> ControlFlow<B>,
) -> ControlFlow<B> {
    match rewrite {
        Userset::This => visit(RewriteLeaf::This, stack),
        Userset::ComputedUserset { relation } => {
            visit(RewriteLeaf::ComputedUserset { relation }, stack)
        }
        Userset::TupleToUserset {
            tupleset,
            computed_userset,
        } => visit(
            RewriteLeaf::TupleToUserset {
                tupleset: &tupleset.relation,
                computed_userset: &computed_userset.relation,
            },
            stack,
        ),
        Userset::Union { children } => walk_children(children, Combinator::Union, stack, visit),
        Userset::Intersection { children } => {
            walk_children(children, Combinator::Intersection, stack, visit)
        }
        Userset::Difference { base, subtract } => {
            stack.push(Combinator::DifferenceBase);
            walk(base, stack, visit)?;
            stack.pop();
            stack.push(Combinator::DifferenceSubtract);
            let result = walk(subtract, stack, visit);
            stack.pop();
            result
        }
    }
}

fn walk_children<'a, B>(
    children: &'a [Userset],
    combinator: Combinator,
    stack: &mut Vec<Combinator>,
    visit: &mut impl FnMut(RewriteLeaf<'a>, &[Combinator]) -> ControlFlow<B>,
) -> ControlFlow<B> {
    stack.push(combinator);
    for child in children {
        walk(child, stack, visit)?;
    }
    stack.pop();
    ControlFlow::Continue(())
}

/// Whether the rewrite contains a `This` leaf, i.e. the relation is
/// assignable through tuples.
pub fn contains_this(rewrite: &Userset) -> bool {
    walk_leaves(rewrite, &mut |leaf, _| match leaf {
        RewriteLeaf::This => ControlFlow::Break(()),
        _ => ControlFlow::Continue(()),
    })
    .is_some()
}

/// Whether an `Intersection` node occurs anywhere in this rewrite tree.
/// Shallow: does not follow references into other relations.
pub fn contains_intersection(rewrite: &Userset) -> bool {
    contains_combinator(rewrite, Combinator::Intersection)
}

/// Whether a `Difference` node occurs anywhere in this rewrite tree.
/// Shallow: does not follow references into other relations.
pub fn contains_exclusion(rewrite: &Userset) -> bool {
    contains_combinator(rewrite, Combinator::DifferenceBase)
}

fn contains_combinator(rewrite: &Userset, combinator: Combinator) -> bool {
    match rewrite {
        Userset::Union { children } => children
            .iter()
            .any(|child| contains_combinator(child, combinator)),
        Userset::Intersection { children } => {
            combinator == Combinator::Intersection
                || children
                    .iter()
                    .any(|child| contains_combinator(child, combinator))
        }
        Userset::Difference { base, subtract } => {
            combinator == Combinator::DifferenceBase
                || contains_combinator(base, combinator)
                || contains_combinator(subtract, combinator)
        }
        _ => false,
    }
}

/// Whether the rewrite references `relation` through a computed userset that
/// is not mediated by a tuple-to-userset hop. Such a self-reference makes
/// the relation undecidable.
pub fn references_relation(rewrite: &Userset, relation: &str) -> bool {
    walk_leaves(rewrite, &mut |leaf, _| match leaf {
        RewriteLeaf::ComputedUserset { relation: name } if name == relation => {
            ControlFlow::Break(())
        }
        _ => ControlFlow::Continue(()),
    })
    .is_some()
}

/// Whether any combinator in the tree has no children. An empty combinator
/// denotes an empty (invalid) rewrite.
pub fn has_empty_combinator(rewrite: &Userset) -> bool {
    match rewrite {
        Userset::Union { children } | Userset::Intersection { children } => {
            children.is_empty()
                || children.iter().any(has_empty_combinator)
        }
        Userset::Difference { base, subtract } => {
            has_empty_combinator(base) || has_empty_combinator(subtract)
        }
        _ => false,
    }
}

/// Collects the tupleset relation names used by tuple-to-userset leaves,
/// under arbitrary combinator nesting.
pub fn tupleset_relations<'a>(rewrite: &'a Userset, out: &mut Vec<&'a str>) {
    walk_leaves::<()>(rewrite, &mut |leaf, _| {
        if let RewriteLeaf::TupleToUserset { tupleset, .. } = leaf {
            out.push(tupleset);
        }
        ControlFlow::Continue(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rewrite() -> Userset {
        // (this | editor) but not (restricted & banned from org)
        Userset::difference(
            Userset::union(vec![Userset::this(), Userset::computed("editor")]),
            Userset::intersection(vec![
                Userset::computed("restricted"),
                Userset::tuple_to_userset("org", "banned"),
            ]),
        )
    }

    #[test]
    fn visits_leaves_with_combinator_stacks() {
        let rewrite = sample_rewrite();
        let mut seen = Vec::new();
        walk_leaves::<()>(&rewrite, &mut |leaf, stack| {
            seen.push((format!("{leaf:?}"), stack.to_vec()));
            ControlFlow::Continue(())
        });

        assert_eq!(seen.len(), 4);
        assert_eq!(
            seen[0].1,
            vec![Combinator::DifferenceBase, Combinator::Union]
        );
        assert_eq!(
            seen[3].1,
            vec![Combinator::DifferenceSubtract, Combinator::Intersection]
        );
    }

    #[test]
    fn early_exit_stops_the_walk() {
        let rewrite = sample_rewrite();
        let mut visited = 0;
        let found = walk_leaves(&rewrite, &mut |leaf, _| {
            visited += 1;
            match leaf {
                RewriteLeaf::ComputedUserset { relation } => ControlFlow::Break(relation.to_string()),
                _ => ControlFlow::Continue(()),
            }
        });

        assert_eq!(found.as_deref(), Some("editor"));
        assert_eq!(visited, 2);
    }

    #[test]
    fn classifies_combinators() {
        let rewrite = sample_rewrite();
        assert!(contains_this(&rewrite));
        assert!(contains_intersection(&rewrite));
        assert!(contains_exclusion(&rewrite));

        let plain = Userset::union(vec![Userset::this(), Userset::computed("editor")]);
        assert!(!contains_intersection(&plain));
        assert!(!contains_exclusion(&plain));
        assert!(!contains_this(&Userset::computed("editor")));
    }

    #[test]
    fn self_reference_is_found_under_nesting() {
        let rewrite = sample_rewrite();
        assert!(references_relation(&rewrite, "restricted"));
        assert!(!references_relation(&rewrite, "viewer"));
        // tuple-to-userset names do not count as computed references
        assert!(!references_relation(&rewrite, "banned"));
    }

    #[test]
    fn empty_combinators_are_detected() {
        assert!(has_empty_combinator(&Userset::union(vec![])));
        assert!(has_empty_combinator(&Userset::difference(
            Userset::this(),
            Userset::intersection(vec![]),
        )));
        assert!(!has_empty_combinator(&sample_rewrite()));
    }

    #[test]
    fn collects_tupleset_relations() {
        let mut tuplesets = Vec::new();
        let rewrite = sample_rewrite();
        tupleset_relations(&rewrite, &mut tuplesets);
        assert_eq!(tuplesets, vec!["org"]);
    }
}
