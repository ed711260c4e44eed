//! Property-based tests for model types and structural utilities.

#[cfg(test)]
mod tests {
    use std::ops::ControlFlow;

    use proptest::prelude::*;

    use crate::model::walker::{self, RewriteLeaf};
    use crate::model::{RelationReference, Userset};

    fn type_name_strategy() -> impl Strategy<Value = String> {
        "[a-z]{1,8}"
    }

    fn reference_strategy() -> impl Strategy<Value = RelationReference> {
        prop_oneof![
            type_name_strategy().prop_map(RelationReference::direct),
            (type_name_strategy(), "[a-z]{1,8}")
                .prop_map(|(t, r)| RelationReference::userset(t, r)),
            type_name_strategy().prop_map(RelationReference::wildcard),
        ]
    }

    fn rewrite_strategy() -> impl Strategy<Value = Userset> {
        let leaf = prop_oneof![
            Just(Userset::this()),
            "[a-z]{1,8}".prop_map(Userset::computed),
            ("[a-z]{1,8}", "[a-z]{1,8}")
                .prop_map(|(tupleset, computed)| Userset::tuple_to_userset(tupleset, computed)),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 1..4).prop_map(Userset::union),
                prop::collection::vec(inner.clone(), 1..4).prop_map(Userset::intersection),
                (inner.clone(), inner)
                    .prop_map(|(base, subtract)| Userset::difference(base, subtract)),
            ]
        })
    }

    fn collect_leaves(rewrite: &Userset) -> Vec<String> {
        let mut leaves = Vec::new();
        walker::walk_leaves::<()>(rewrite, &mut |leaf, stack| {
            leaves.push(format!("{leaf:?}@{stack:?}"));
            ControlFlow::Continue(())
        });
        leaves
    }

    proptest! {
        #[test]
        fn subsumption_requires_equal_types(
            entry in reference_strategy(),
            source in reference_strategy(),
        ) {
            if entry.type_name() != source.type_name() {
                prop_assert!(!entry.subsumes(&source));
            }
        }

        #[test]
        fn wildcard_subsumes_direct_and_itself(type_name in type_name_strategy()) {
            let wildcard = RelationReference::wildcard(&type_name);
            let direct = RelationReference::direct(&type_name);

            prop_assert!(wildcard.subsumes(&direct));
            prop_assert!(wildcard.subsumes(&wildcard));
            prop_assert!(direct.subsumes(&direct));
            prop_assert!(!direct.subsumes(&wildcard));
        }

        #[test]
        fn userset_references_subsume_exactly_themselves(
            entry in reference_strategy(),
            source in reference_strategy(),
        ) {
            if entry.is_userset() || source.is_userset() {
                prop_assert_eq!(entry.subsumes(&source), entry == source);
            }
        }

        #[test]
        fn display_round_trips_through_the_wire_shape(reference in reference_strategy()) {
            let encoded = serde_json::to_string(&reference).unwrap();
            let decoded: RelationReference = serde_json::from_str(&encoded).unwrap();
            prop_assert_eq!(&decoded, &reference);
            prop_assert_eq!(decoded.to_string(), reference.to_string());
        }

        #[test]
        fn walker_is_total_and_deterministic(rewrite in rewrite_strategy()) {
            let first = collect_leaves(&rewrite);
            let second = collect_leaves(&rewrite);

            prop_assert!(!first.is_empty());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn contains_this_matches_the_walk(rewrite in rewrite_strategy()) {
            let has_this_leaf = walker::walk_leaves(&rewrite, &mut |leaf, _| match leaf {
                RewriteLeaf::This => ControlFlow::Break(()),
                _ => ControlFlow::Continue(()),
            })
            .is_some();
            prop_assert_eq!(walker::contains_this(&rewrite), has_this_leaf);
        }

        #[test]
        fn references_relation_matches_the_walk(
            rewrite in rewrite_strategy(),
            relation in "[a-z]{1,8}",
        ) {
            let referenced = walker::walk_leaves(&rewrite, &mut |leaf, _| match leaf {
                RewriteLeaf::ComputedUserset { relation: name } if name == relation => {
                    ControlFlow::Break(())
                }
                _ => ControlFlow::Continue(()),
            })
            .is_some();
            prop_assert_eq!(walker::references_relation(&rewrite, &relation), referenced);
        }
    }
}
