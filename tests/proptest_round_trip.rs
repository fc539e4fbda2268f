//! Property-based round trips over random graphs.

use std::sync::Arc;

use proptest::prelude::*;
use resolution_result::{
    AttributeContainer, Capability, ComponentIdentifier, ComponentResult, ComponentSelectionReason,
    ComponentSelector, InMemoryBinaryStore, InMemoryDependencyGraph, ModuleVersionIdentifier,
    ResolutionResultCache, ResolveFailure, ResolvedVariantResult, StreamingResolutionResultBuilder,
    VersionConstraint,
};

#[derive(Debug, Clone)]
struct GraphShape {
    components: usize,
    edges: Vec<(usize, usize, bool)>,
    failures: Vec<usize>,
}

fn graph_shape() -> impl Strategy<Value = GraphShape> {
    (1usize..12).prop_flat_map(|components| {
        (
            prop::collection::vec((0..components, 0..components, any::<bool>()), 0..30),
            prop::collection::vec(0..components, 0..4),
        )
            .prop_map(move |(edges, failures)| GraphShape {
                components,
                edges,
                failures,
            })
    })
}

fn make_component(id: usize) -> ComponentResult {
    let name = format!("c{id}");
    let owner = ComponentIdentifier::module("org", name.as_str(), "1.0");
    // Two attribute containers shared across all variants.
    let attributes = Arc::new(
        AttributeContainer::new()
            .with("usage", if id % 2 == 0 { "java-api" } else { "java-runtime" })
            .with("version", 17i64),
    );
    let mut variant = ResolvedVariantResult::new(owner.clone(), "runtime", attributes)
        .with_capability(Capability::new("org", name.as_str(), Some("1.0".to_string())));
    if id % 3 == 0 {
        let platform = ComponentIdentifier::module("org", "platform", "1.0");
        let external = ResolvedVariantResult::new(platform, "platform", Arc::new(AttributeContainer::new()));
        variant = variant.with_external_variant(Arc::new(external));
    }

    let reason = if id == 0 {
        ComponentSelectionReason::ROOT
    } else if id % 2 == 0 {
        ComponentSelectionReason::CONFLICT_RESOLUTION
    } else {
        ComponentSelectionReason::REQUESTED
    };
    let repository = (id % 2 == 1).then(|| "central".to_string());

    ComponentResult::new(id as i64, ModuleVersionIdentifier::new("org", name.as_str(), "1.0"), reason, owner)
        .with_variants(vec![Arc::new(variant)])
        .with_repository_name(repository)
}

fn build_graph(shape: &GraphShape) -> (InMemoryDependencyGraph, resolution_result::graph::NodeIndex) {
    let mut graph = InMemoryDependencyGraph::new();
    let nodes: Vec<_> = (0..shape.components).map(|id| graph.add_component(make_component(id))).collect();

    for &(from, to, constraint) in &shape.edges {
        let selector = ComponentSelector::module_with_constraint(
            "org",
            format!("c{to}"),
            VersionConstraint::prefer("1.0").rejecting("0.9"),
        );
        if constraint {
            graph.add_constraint(nodes[from], nodes[to], selector, ComponentSelectionReason::FORCED);
        } else {
            graph.add_edge(nodes[from], nodes[to], selector, ComponentSelectionReason::REQUESTED);
        }
    }
    for &from in &shape.failures {
        let selector = ComponentSelector::module("com.x", format!("missing{from}"), "1.0");
        graph.add_failed_edge(
            nodes[from],
            ResolveFailure::new(selector, "not found").with_cause("404"),
            ComponentSelectionReason::REQUESTED,
        );
    }
    (graph, nodes[0])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_streamed_graph_matches_walked_graph(shape in graph_shape()) {
        let (graph, root) = build_graph(&shape);
        let expected = graph.to_resolution_result(root).unwrap();

        let mut builder = StreamingResolutionResultBuilder::new(
            Box::new(InMemoryBinaryStore::new()),
            Arc::new(ResolutionResultCache::new()),
        );
        graph.walk(root, &mut builder).unwrap();
        let factory = builder.complete().unwrap();
        let result = factory.create().unwrap();

        prop_assert_eq!(result.fingerprint(), expected.fingerprint());
        prop_assert_eq!(&*result, &expected);
    }

    #[test]
    fn prop_fingerprint_ignores_walk_order(shape in graph_shape()) {
        let (graph, root) = build_graph(&shape);
        let mut reversed = shape.clone();
        reversed.edges.reverse();
        let (reversed_graph, reversed_root) = build_graph(&reversed);

        let a = graph.to_resolution_result(root).unwrap();
        let b = reversed_graph.to_resolution_result(reversed_root).unwrap();
        prop_assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
