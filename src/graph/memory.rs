//! In-memory resolved graph.
//!
//! Holds a resolved graph as plain nodes and drives any
//! [`DependencyGraphVisitor`] over it breadth-first. Used to feed the streaming
//! builder from code that already has the whole graph, and as the reference
//! graph in tests and benches.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use super::{DependencyGraphComponent, DependencyGraphNode, DependencyGraphVisitor};
use crate::types::{
    ComponentResult, ComponentSelectionReason, ComponentSelector, DependencyOutcome,
    DependencyResult, ResolutionResult, ResolutionResultGraphBuilder, ResolveFailure,
    ResultGraphError,
};

/// Index of a node in an [`InMemoryDependencyGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

/// A node: one selected variant of a component plus its outgoing edges.
#[derive(Debug, Clone)]
pub struct GraphNode {
    owner: Arc<ComponentResult>,
    edges: Vec<DependencyResult>,
    targets: Vec<Option<NodeIndex>>,
}

impl DependencyGraphNode for GraphNode {
    type Component = ComponentResult;
    type Edge = DependencyResult;

    fn owner(&self) -> &ComponentResult {
        &self.owner
    }

    fn outgoing_edges(&self) -> &[DependencyResult] {
        &self.edges
    }
}

/// Resolved graph held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDependencyGraph {
    nodes: Vec<GraphNode>,
}

impl InMemoryDependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node owned by `component`.
    ///
    /// Adding several nodes with the same component models a component with
    /// several selected variants.
    pub fn add_node(&mut self, component: Arc<ComponentResult>) -> NodeIndex {
        self.nodes.push(GraphNode {
            owner: component,
            edges: Vec::new(),
            targets: Vec::new(),
        });
        NodeIndex(self.nodes.len() - 1)
    }

    /// Add a node owning a new component.
    pub fn add_component(&mut self, component: ComponentResult) -> NodeIndex {
        self.add_node(Arc::new(component))
    }

    fn push_resolved(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        requested: ComponentSelector,
        constraint: bool,
        reason: ComponentSelectionReason,
    ) {
        let target = &self.nodes[to.0].owner;
        let outcome = DependencyOutcome::Resolved {
            selected: target.result_id(),
            resolved_variant: target.selected_variants().first().cloned(),
        };
        let node = &mut self.nodes[from.0];
        let edge = DependencyResult::new(node.owner.result_id(), requested, constraint, reason, outcome);
        node.edges.push(edge);
        node.targets.push(Some(to));
    }

    /// Add a resolved dependency edge.
    pub fn add_edge(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        requested: ComponentSelector,
        reason: ComponentSelectionReason,
    ) {
        self.push_resolved(from, to, requested, false, reason);
    }

    /// Add a resolved constraint edge.
    pub fn add_constraint(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        requested: ComponentSelector,
        reason: ComponentSelectionReason,
    ) {
        self.push_resolved(from, to, requested, true, reason);
    }

    /// Add an edge that failed to resolve. The failure's selector is the
    /// requested selector.
    pub fn add_failed_edge(&mut self, from: NodeIndex, failure: ResolveFailure, reason: ComponentSelectionReason) {
        let node = &mut self.nodes[from.0];
        let edge = DependencyResult::new(
            node.owner.result_id(),
            failure.selector.clone(),
            false,
            reason,
            DependencyOutcome::Unresolved {
                failure: Arc::new(failure),
            },
        );
        node.edges.push(edge);
        node.targets.push(None);
    }

    /// Node by index.
    pub fn node(&self, index: NodeIndex) -> &GraphNode {
        &self.nodes[index.0]
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Push the graph reachable from `root` through `visitor`.
    ///
    /// Nodes are visited breadth-first; each reachable node gets exactly one
    /// `visit_node` and one `visit_edges` call, before any of its unvisited
    /// children.
    pub fn walk<V>(&self, root: NodeIndex, visitor: &mut V) -> Result<(), V::Error>
    where
        V: DependencyGraphVisitor<GraphNode>,
    {
        let root_node = &self.nodes[root.0];
        visitor.start(root_node)?;

        let mut queued = vec![false; self.nodes.len()];
        let mut queue = VecDeque::from([root]);
        queued[root.0] = true;

        while let Some(index) = queue.pop_front() {
            let node = &self.nodes[index.0];
            visitor.visit_node(node)?;
            visitor.visit_edges(node)?;
            for target in node.targets.iter().flatten() {
                if !queued[target.0] {
                    queued[target.0] = true;
                    queue.push_back(*target);
                }
            }
        }

        visitor.finish(root_node)
    }

    /// Build the result graph directly, without a record stream.
    pub fn to_resolution_result(&self, root: NodeIndex) -> Result<ResolutionResult, ResultGraphError> {
        let mut visitor = EagerResultVisitor::default();
        self.walk(root, &mut visitor)?;
        let root_id = self.nodes[root.0].owner.result_id();
        visitor.builder.complete(root_id)
    }
}

#[derive(Default)]
struct EagerResultVisitor {
    builder: ResolutionResultGraphBuilder,
    seen: HashSet<i64>,
}

impl DependencyGraphVisitor<GraphNode> for EagerResultVisitor {
    type Error = ResultGraphError;

    fn start(&mut self, _root: &GraphNode) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_node(&mut self, node: &GraphNode) -> Result<(), Self::Error> {
        if self.seen.insert(node.owner.result_id()) {
            self.builder.visit_component(node.owner.as_ref().clone())?;
        }
        Ok(())
    }

    fn visit_edges(&mut self, node: &GraphNode) -> Result<(), Self::Error> {
        self.builder
            .visit_outgoing_edges(node.owner.result_id(), node.edges.iter().cloned());
        Ok(())
    }

    fn finish(&mut self, _root: &GraphNode) -> Result<(), Self::Error> {
        Ok(())
    }
}
