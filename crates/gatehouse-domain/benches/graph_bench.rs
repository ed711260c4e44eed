//! Performance benchmarks for relationship-edge enumeration.
//!
//! Run with: cargo bench -p gatehouse-domain --bench graph_bench
//!
//! These benchmarks measure:
//! - Edge enumeration over a GitHub-style model (wide unions, usersets,
//!   tuple-to-userset hops)
//! - Pruned edge enumeration through an intersection
//! - Scaling of edge enumeration with folder-hierarchy depth

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use gatehouse_domain::model::{
    AuthorizationModel, RelationReference, TypeDefinition, Userset, SCHEMA_VERSION_1_1,
};
use gatehouse_domain::{RelationshipGraph, TypeSystem};

fn user_and_team() -> Vec<TypeDefinition> {
    vec![
        TypeDefinition::new("user"),
        TypeDefinition::new("team")
            .with_relation("member", Userset::this())
            .with_related_types(
                "member",
                vec![
                    RelationReference::direct("user"),
                    RelationReference::userset("team", "member"),
                ],
            ),
    ]
}

/// The usual GitHub-style model: org roles granted to users and team
/// members, repo roles layered through unions and granted from the owning
/// organization via tuple-to-userset.
fn github_model() -> AuthorizationModel {
    let user_and_team_member = || {
        vec![
            RelationReference::direct("user"),
            RelationReference::userset("team", "member"),
        ]
    };
    let org_role = || {
        vec![
            RelationReference::direct("user"),
            RelationReference::userset("organization", "member"),
        ]
    };

    let mut types = user_and_team();
    types.push(
        TypeDefinition::new("organization")
            .with_relation(
                "member",
                Userset::union(vec![Userset::this(), Userset::computed("owner")]),
            )
            .with_related_types("member", vec![RelationReference::direct("user")])
            .with_relation("owner", Userset::this())
            .with_related_types("owner", vec![RelationReference::direct("user")])
            .with_relation("repo_admin", Userset::this())
            .with_related_types("repo_admin", org_role())
            .with_relation("repo_reader", Userset::this())
            .with_related_types("repo_reader", org_role())
            .with_relation("repo_writer", Userset::this())
            .with_related_types("repo_writer", org_role()),
    );
    types.push(
        TypeDefinition::new("repo")
            .with_relation(
                "admin",
                Userset::union(vec![
                    Userset::this(),
                    Userset::tuple_to_userset("owner", "repo_admin"),
                ]),
            )
            .with_related_types("admin", user_and_team_member())
            .with_relation(
                "maintainer",
                Userset::union(vec![Userset::this(), Userset::computed("admin")]),
            )
            .with_related_types("maintainer", user_and_team_member())
            .with_relation("owner", Userset::this())
            .with_related_types("owner", vec![RelationReference::direct("organization")])
            .with_relation(
                "reader",
                Userset::union(vec![
                    Userset::this(),
                    Userset::computed("triager"),
                    Userset::tuple_to_userset("owner", "repo_reader"),
                ]),
            )
            .with_related_types("reader", user_and_team_member())
            .with_relation(
                "triager",
                Userset::union(vec![Userset::this(), Userset::computed("writer")]),
            )
            .with_related_types("triager", user_and_team_member())
            .with_relation(
                "writer",
                Userset::union(vec![
                    Userset::this(),
                    Userset::computed("maintainer"),
                    Userset::tuple_to_userset("owner", "repo_writer"),
                ]),
            )
            .with_related_types("writer", user_and_team_member()),
    );

    AuthorizationModel::with_types(SCHEMA_VERSION_1_1, types)
}

/// A folder hierarchy `depth` levels deep, viewer granted from the parent.
fn folder_chain_model(depth: usize) -> AuthorizationModel {
    let mut types = vec![TypeDefinition::new("user")];
    for level in 0..depth {
        let mut folder = TypeDefinition::new(format!("folder_{level}")).with_relation(
            "viewer",
            if level + 1 < depth {
                Userset::union(vec![
                    Userset::this(),
                    Userset::tuple_to_userset("parent", "viewer"),
                ])
            } else {
                Userset::this()
            },
        );
        folder = folder.with_related_types("viewer", vec![RelationReference::direct("user")]);
        if level + 1 < depth {
            folder = folder
                .with_relation("parent", Userset::this())
                .with_related_types(
                    "parent",
                    vec![RelationReference::direct(format!("folder_{}", level + 1))],
                );
        }
        types.push(folder);
    }
    AuthorizationModel::with_types(SCHEMA_VERSION_1_1, types)
}

fn intersection_model() -> AuthorizationModel {
    AuthorizationModel::with_types(
        SCHEMA_VERSION_1_1,
        vec![
            TypeDefinition::new("user"),
            TypeDefinition::new("document")
                .with_relation("allowed", Userset::this())
                .with_related_types("allowed", vec![RelationReference::direct("user")])
                .with_relation(
                    "viewer",
                    Userset::intersection(vec![Userset::this(), Userset::computed("allowed")]),
                )
                .with_related_types("viewer", vec![RelationReference::direct("user")]),
        ],
    )
}

fn build_graph(model: AuthorizationModel) -> RelationshipGraph {
    RelationshipGraph::new(Arc::new(TypeSystem::new_and_validate(model).unwrap()))
}

fn github_edges_benchmark(c: &mut Criterion) {
    let graph = build_graph(github_model());
    let reader = RelationReference::userset("repo", "reader");

    c.bench_function("get_relationship_edges/github_reader_user", |b| {
        let source = RelationReference::direct("user");
        b.iter(|| black_box(graph.get_relationship_edges(&reader, &source).unwrap()))
    });

    c.bench_function("get_relationship_edges/github_reader_team_member", |b| {
        let source = RelationReference::userset("team", "member");
        b.iter(|| black_box(graph.get_relationship_edges(&reader, &source).unwrap()))
    });
}

fn pruned_edges_benchmark(c: &mut Criterion) {
    let graph = build_graph(intersection_model());
    let viewer = RelationReference::userset("document", "viewer");
    let source = RelationReference::direct("user");

    c.bench_function("get_pruned_relationship_edges/intersection", |b| {
        b.iter(|| {
            black_box(
                graph
                    .get_pruned_relationship_edges(&viewer, &source)
                    .unwrap(),
            )
        })
    });
}

fn folder_chain_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_relationship_edges/folder_chain");
    for depth in [4usize, 16, 64] {
        let graph = build_graph(folder_chain_model(depth));
        let target = RelationReference::userset("folder_0", "viewer");
        let source = RelationReference::direct("user");
        group.bench_with_input(
            BenchmarkId::from_parameter(depth),
            &(graph, target, source),
            |b, (graph, target, source)| {
                b.iter(|| black_box(graph.get_relationship_edges(target, source).unwrap()))
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    github_edges_benchmark,
    pruned_edges_benchmark,
    folder_chain_benchmark
);
criterion_main!(benches);
