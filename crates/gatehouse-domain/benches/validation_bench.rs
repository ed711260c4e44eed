//! Performance benchmarks for model validation.
//!
//! Run with: cargo bench -p gatehouse-domain --bench validation_bench
//!
//! These benchmarks measure how `new_and_validate` scales with model depth:
//! the entrypoint analysis and the classifier prewarm both walk the rewrite
//! graph, so a deep folder hierarchy is the stress shape.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use gatehouse_domain::model::{
    AuthorizationModel, RelationReference, TypeDefinition, Userset, SCHEMA_VERSION_1_1,
};
use gatehouse_domain::TypeSystem;

/// A folder hierarchy `depth` levels deep. Each level grants `viewer`
/// directly or through the parent folder one level up; the last level points
/// back at the first so the cycle guards are exercised too.
fn folder_chain_model(depth: usize) -> AuthorizationModel {
    let mut types = vec![
        TypeDefinition::new("user"),
        TypeDefinition::new("group")
            .with_relation("member", Userset::this())
            .with_related_types("member", vec![RelationReference::direct("user")]),
    ];

    for level in 0..depth {
        let parent_level = (level + 1) % depth;
        types.push(
            TypeDefinition::new(format!("folder_{level}"))
                .with_relation("parent", Userset::this())
                .with_related_types(
                    "parent",
                    vec![RelationReference::direct(format!("folder_{parent_level}"))],
                )
                .with_relation(
                    "viewer",
                    Userset::union(vec![
                        Userset::this(),
                        Userset::tuple_to_userset("parent", "viewer"),
                    ]),
                )
                .with_related_types(
                    "viewer",
                    vec![
                        RelationReference::direct("user"),
                        RelationReference::userset("group", "member"),
                    ],
                ),
        );
    }

    AuthorizationModel::with_types(SCHEMA_VERSION_1_1, types)
}

fn validation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("new_and_validate");
    for depth in [4usize, 16, 64] {
        let model = folder_chain_model(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &model, |b, model| {
            b.iter(|| {
                let typesystem = TypeSystem::new_and_validate(model.clone()).unwrap();
                black_box(typesystem)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, validation_benchmark);
criterion_main!(benches);
