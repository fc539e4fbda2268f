//! Producer-side interface: the resolved dependency graph as seen by the
//! result store.
//!
//! The graph walker owns the resolved graph and pushes it through a
//! [`DependencyGraphVisitor`] in a single pass:
//!
//! ```text
//! start(root)
//! for every node, parents before children:
//!     visit_node(node)
//!     visit_edges(node)
//! finish(root)
//! ```
//!
//! Several nodes may share one owning component (one node per selected
//! variant), so components can be seen more than once.

pub mod memory;

use std::sync::Arc;

use crate::types::{
    ComponentIdentifier, ComponentResult, ComponentSelectionReason, ComponentSelector,
    DependencyOutcome, DependencyResult, ModuleVersionIdentifier, ResolvedVariantResult,
};

/// A resolved component owning one or more graph nodes.
pub trait DependencyGraphComponent {
    /// Id unique to this component within the resolution.
    fn result_id(&self) -> i64;

    /// Module coordinates.
    fn module_version(&self) -> &ModuleVersionIdentifier;

    /// Why this version was selected.
    fn selection_reason(&self) -> &ComponentSelectionReason;

    /// Component identity.
    fn component_id(&self) -> &ComponentIdentifier;

    /// Selected variants.
    fn selected_variants(&self) -> &[Arc<ResolvedVariantResult>];

    /// Repository the component came from.
    fn repository_name(&self) -> Option<&str>;
}

/// An outgoing edge of a graph node.
pub trait DependencyGraphEdge {
    /// What was requested.
    fn requested(&self) -> &ComponentSelector;

    /// Whether the edge is a constraint.
    fn is_constraint(&self) -> bool;

    /// Why the edge resolved the way it did.
    fn reason(&self) -> &ComponentSelectionReason;

    /// Resolved target or failure.
    fn outcome(&self) -> &DependencyOutcome;
}

/// A node of the resolved graph.
pub trait DependencyGraphNode {
    /// Owning component type.
    type Component: DependencyGraphComponent;
    /// Edge type.
    type Edge: DependencyGraphEdge;

    /// The component this node belongs to.
    fn owner(&self) -> &Self::Component;

    /// Outgoing edges.
    fn outgoing_edges(&self) -> &[Self::Edge];
}

/// Receives a resolved graph from the walker.
pub trait DependencyGraphVisitor<N: DependencyGraphNode> {
    /// Error type for visitor callbacks.
    type Error;

    /// Called once, first.
    fn start(&mut self, root: &N) -> Result<(), Self::Error>;

    /// Called once per node, before [`visit_edges`](Self::visit_edges).
    fn visit_node(&mut self, node: &N) -> Result<(), Self::Error>;

    /// Called once per node, after [`visit_node`](Self::visit_node).
    fn visit_edges(&mut self, node: &N) -> Result<(), Self::Error>;

    /// Called once, last.
    fn finish(&mut self, root: &N) -> Result<(), Self::Error>;
}

impl DependencyGraphComponent for ComponentResult {
    fn result_id(&self) -> i64 {
        self.id()
    }

    fn module_version(&self) -> &ModuleVersionIdentifier {
        ComponentResult::module_version(self)
    }

    fn selection_reason(&self) -> &ComponentSelectionReason {
        ComponentResult::selection_reason(self)
    }

    fn component_id(&self) -> &ComponentIdentifier {
        ComponentResult::component_id(self)
    }

    fn selected_variants(&self) -> &[Arc<ResolvedVariantResult>] {
        self.variants()
    }

    fn repository_name(&self) -> Option<&str> {
        ComponentResult::repository_name(self)
    }
}

impl DependencyGraphEdge for DependencyResult {
    fn requested(&self) -> &ComponentSelector {
        DependencyResult::requested(self)
    }

    fn is_constraint(&self) -> bool {
        DependencyResult::is_constraint(self)
    }

    fn reason(&self) -> &ComponentSelectionReason {
        DependencyResult::reason(self)
    }

    fn outcome(&self) -> &DependencyOutcome {
        DependencyResult::outcome(self)
    }
}

pub use memory::{GraphNode, InMemoryDependencyGraph, NodeIndex};
