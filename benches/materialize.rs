//! Benchmarks for streaming and materializing resolution results.
//!
//! Run with: `cargo bench --bench materialize`
//!
//! ## Workloads
//!
//! | Benchmark | Measures |
//! |-----------|----------|
//! | stream | Graph walk into an in-memory store |
//! | stream_and_materialize | Walk plus a full replay of the records |
//! | eager | Building the result without a record stream |

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use resolution_result::graph::NodeIndex;
use resolution_result::{
    AttributeContainer, ComponentIdentifier, ComponentResult, ComponentSelectionReason,
    ComponentSelector, InMemoryBinaryStore, InMemoryDependencyGraph, ModuleVersionIdentifier,
    ResolutionResultCache, ResolvedVariantResult, StreamingResolutionResultBuilder,
};

/// Layered graph: every component depends on up to `fan_out` components of
/// the next layer. Variants share a handful of attribute containers.
fn build_layered_graph(components: usize, fan_out: usize) -> (InMemoryDependencyGraph, NodeIndex) {
    let shared: Vec<_> = ["java-api", "java-runtime", "native-link"]
        .iter()
        .map(|usage| Arc::new(AttributeContainer::new().with("usage", *usage)))
        .collect();

    let mut graph = InMemoryDependencyGraph::new();
    let nodes: Vec<_> = (0..components)
        .map(|i| {
            let name = format!("lib{i}");
            let owner = ComponentIdentifier::module("org.bench", name.as_str(), "1.0");
            let variant = ResolvedVariantResult::new(owner.clone(), "runtime", shared[i % shared.len()].clone());
            graph.add_component(
                ComponentResult::new(
                    i as i64,
                    ModuleVersionIdentifier::new("org.bench", name.as_str(), "1.0"),
                    ComponentSelectionReason::REQUESTED,
                    owner,
                )
                .with_variants(vec![Arc::new(variant)]),
            )
        })
        .collect();

    for i in 0..components {
        for k in 1..=fan_out {
            let target = i * fan_out + k;
            if target >= components {
                break;
            }
            graph.add_edge(
                nodes[i],
                nodes[target],
                ComponentSelector::module("org.bench", format!("lib{target}"), "1.0"),
                ComponentSelectionReason::REQUESTED,
            );
        }
    }
    (graph, nodes[0])
}

fn stream(graph: &InMemoryDependencyGraph, root: NodeIndex) -> resolution_result::ResolutionResultFactory {
    let mut builder = StreamingResolutionResultBuilder::new(
        Box::new(InMemoryBinaryStore::new()),
        Arc::new(ResolutionResultCache::new()),
    );
    graph.walk(root, &mut builder).unwrap();
    builder.complete().unwrap()
}

fn bench_materialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("materialize");

    for components in [100usize, 1_000, 10_000] {
        let (graph, root) = build_layered_graph(components, 4);
        group.throughput(Throughput::Elements(components as u64));

        group.bench_with_input(BenchmarkId::new("stream", components), &components, |b, _| {
            b.iter(|| black_box(stream(&graph, root)))
        });

        group.bench_with_input(
            BenchmarkId::new("stream_and_materialize", components),
            &components,
            |b, _| {
                b.iter(|| {
                    let factory = stream(&graph, root);
                    black_box(factory.create().unwrap())
                })
            },
        );

        group.bench_with_input(BenchmarkId::new("eager", components), &components, |b, _| {
            b.iter(|| black_box(graph.to_resolution_result(root).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_materialize);
criterion_main!(benches);
