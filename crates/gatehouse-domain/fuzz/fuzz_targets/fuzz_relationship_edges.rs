//! Fuzz target for relationship-edge enumeration.
//!
//! Exercises `RelationshipGraph` and the classifier queries over arbitrary,
//! deliberately unvalidated models to find crashes, panics, and infinite
//! loops. Dangling references must surface as errors, cyclic models must
//! terminate through the visited-set guards, and repeated queries must
//! return equal results.

#![no_main]

use std::sync::Arc;

use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;

use gatehouse_domain::model::{
    AuthorizationModel, RelationReference, TypeDefinition, Userset, SCHEMA_VERSION_1_1,
};
use gatehouse_domain::{RelationshipGraph, TypeSystem};

const TYPE_NAMES: [&str; 4] = ["user", "group", "folder", "document"];
const RELATION_NAMES: [&str; 6] = ["viewer", "editor", "owner", "member", "parent", "admin"];

fn arbitrary_rewrite(u: &mut Unstructured, depth: u32) -> arbitrary::Result<Userset> {
    let variant = if depth == 0 {
        u.int_in_range(0..=2)?
    } else {
        u.int_in_range(0..=5)?
    };
    Ok(match variant {
        0 => Userset::this(),
        1 => Userset::computed(*u.choose(&RELATION_NAMES)?),
        2 => Userset::tuple_to_userset(*u.choose(&RELATION_NAMES)?, *u.choose(&RELATION_NAMES)?),
        3 | 4 => {
            let count = u.int_in_range(1..=3)?;
            let mut children = Vec::with_capacity(count);
            for _ in 0..count {
                children.push(arbitrary_rewrite(u, depth - 1)?);
            }
            if variant == 3 {
                Userset::union(children)
            } else {
                Userset::intersection(children)
            }
        }
        _ => Userset::difference(
            arbitrary_rewrite(u, depth - 1)?,
            arbitrary_rewrite(u, depth - 1)?,
        ),
    })
}

fn arbitrary_reference(u: &mut Unstructured) -> arbitrary::Result<RelationReference> {
    Ok(match u.int_in_range(0..=2)? {
        0 => RelationReference::direct(*u.choose(&TYPE_NAMES)?),
        1 => RelationReference::userset(*u.choose(&TYPE_NAMES)?, *u.choose(&RELATION_NAMES)?),
        _ => RelationReference::wildcard(*u.choose(&TYPE_NAMES)?),
    })
}

fn arbitrary_model(u: &mut Unstructured) -> arbitrary::Result<AuthorizationModel> {
    let mut types = Vec::new();
    for type_name in TYPE_NAMES {
        if u.arbitrary::<bool>()? {
            continue;
        }
        let mut type_def = TypeDefinition::new(type_name);
        let relation_count = u.int_in_range(0usize..=4)?;
        for _ in 0..relation_count {
            let name = *u.choose(&RELATION_NAMES)?;
            type_def = type_def.with_relation(name, arbitrary_rewrite(u, 3)?);
            if u.arbitrary::<bool>()? {
                let reference_count = u.int_in_range(0usize..=3)?;
                let mut references = Vec::with_capacity(reference_count);
                for _ in 0..reference_count {
                    references.push(arbitrary_reference(u)?);
                }
                type_def = type_def.with_related_types(name, references);
            }
        }
        types.push(type_def);
    }
    Ok(AuthorizationModel::with_types(SCHEMA_VERSION_1_1, types))
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(model) = arbitrary_model(&mut u) else {
        return;
    };
    let Ok(target) = arbitrary_reference(&mut u) else {
        return;
    };
    let Ok(source) = arbitrary_reference(&mut u) else {
        return;
    };

    let typesystem = Arc::new(TypeSystem::new(model));
    let graph = RelationshipGraph::new(Arc::clone(&typesystem));

    let first = graph.get_relationship_edges(&target, &source);
    let second = graph.get_relationship_edges(&target, &source);
    assert_eq!(first, second);

    let _ = graph.get_pruned_relationship_edges(&target, &source);

    let type_name = target.type_name();
    let relation = target.relation().unwrap_or_default();
    let _ = typesystem.relation_involves_intersection(type_name, relation);
    let _ = typesystem.relation_involves_exclusion(type_name, relation);
    let _ = typesystem.is_tupleset_relation(type_name, relation);
    let _ = typesystem.is_directly_related(&target, &source);
    let _ = typesystem.is_publicly_assignable(&target, source.type_name());
});
