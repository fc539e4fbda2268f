//! The materialized resolution result graph.
//!
//! Components live in an arena addressed by their `result_id`. Edges refer to
//! their targets by id instead of holding pointers, so a graph can be rebuilt
//! from a record stream in which an edge names a component that has not been
//! read yet.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::failure::ResolveFailure;
use super::identifier::{ComponentIdentifier, ComponentSelector, ModuleVersionIdentifier};
use super::reason::ComponentSelectionReason;
use super::variant::{AttributeContainer, ResolvedVariantResult};
use crate::canonical::canonical_hash_hex;

/// Identity of one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResolutionId(Uuid);

impl ResolutionId {
    /// Generate a fresh resolution id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ResolutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResolutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ResolutionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Where an edge ended up.
///
/// An edge is either resolved to a component or failed; never both, never
/// neither.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DependencyOutcome {
    /// The edge selected a component.
    Resolved {
        /// `result_id` of the selected component.
        selected: i64,
        /// Variant of the selected component the edge points at.
        resolved_variant: Option<Arc<ResolvedVariantResult>>,
    },
    /// The edge failed to resolve.
    Unresolved {
        /// The resolution failure.
        failure: Arc<ResolveFailure>,
    },
}

/// A dependency edge of the result graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DependencyResult {
    from: i64,
    requested: ComponentSelector,
    constraint: bool,
    reason: ComponentSelectionReason,
    #[serde(flatten)]
    outcome: DependencyOutcome,
}

impl DependencyResult {
    /// Create an edge.
    pub fn new(
        from: i64,
        requested: ComponentSelector,
        constraint: bool,
        reason: ComponentSelectionReason,
        outcome: DependencyOutcome,
    ) -> Self {
        Self {
            from,
            requested,
            constraint,
            reason,
            outcome,
        }
    }

    /// `result_id` of the component declaring the dependency.
    pub fn from(&self) -> i64 {
        self.from
    }

    /// What was requested.
    pub fn requested(&self) -> &ComponentSelector {
        &self.requested
    }

    /// Whether the edge is a dependency constraint rather than a dependency.
    pub fn is_constraint(&self) -> bool {
        self.constraint
    }

    /// Why the edge resolved the way it did.
    pub fn reason(&self) -> &ComponentSelectionReason {
        &self.reason
    }

    /// Resolution outcome.
    pub fn outcome(&self) -> &DependencyOutcome {
        &self.outcome
    }

    /// `result_id` of the selected component, `None` for failed edges.
    pub fn selected_component_id(&self) -> Option<i64> {
        match &self.outcome {
            DependencyOutcome::Resolved { selected, .. } => Some(*selected),
            DependencyOutcome::Unresolved { .. } => None,
        }
    }

    /// Selected variant of the target, if known.
    pub fn resolved_variant(&self) -> Option<&Arc<ResolvedVariantResult>> {
        match &self.outcome {
            DependencyOutcome::Resolved { resolved_variant, .. } => resolved_variant.as_ref(),
            DependencyOutcome::Unresolved { .. } => None,
        }
    }

    /// Resolution failure, `None` for resolved edges.
    pub fn failure(&self) -> Option<&Arc<ResolveFailure>> {
        match &self.outcome {
            DependencyOutcome::Resolved { .. } => None,
            DependencyOutcome::Unresolved { failure } => Some(failure),
        }
    }

    /// Whether the edge resolved.
    pub fn is_resolved(&self) -> bool {
        matches!(self.outcome, DependencyOutcome::Resolved { .. })
    }
}

/// A resolved component: one node of the result graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentResult {
    id: i64,
    module_version: ModuleVersionIdentifier,
    selection_reason: ComponentSelectionReason,
    component_id: ComponentIdentifier,
    variants: Vec<Arc<ResolvedVariantResult>>,
    repository_name: Option<String>,
    dependencies: Vec<DependencyResult>,
}

impl ComponentResult {
    /// Create a component without variants or dependencies.
    pub fn new(
        id: i64,
        module_version: ModuleVersionIdentifier,
        selection_reason: ComponentSelectionReason,
        component_id: ComponentIdentifier,
    ) -> Self {
        Self {
            id,
            module_version,
            selection_reason,
            component_id,
            variants: Vec::new(),
            repository_name: None,
            dependencies: Vec::new(),
        }
    }

    /// Set the selected variants.
    pub fn with_variants(mut self, variants: Vec<Arc<ResolvedVariantResult>>) -> Self {
        self.variants = variants;
        self
    }

    /// Set the repository the component was resolved from.
    pub fn with_repository_name(mut self, repository_name: Option<String>) -> Self {
        self.repository_name = repository_name;
        self
    }

    /// `result_id` of this component.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Module coordinates.
    pub fn module_version(&self) -> &ModuleVersionIdentifier {
        &self.module_version
    }

    /// Why this version was selected.
    pub fn selection_reason(&self) -> &ComponentSelectionReason {
        &self.selection_reason
    }

    /// Component identity.
    pub fn component_id(&self) -> &ComponentIdentifier {
        &self.component_id
    }

    /// Selected variants.
    pub fn variants(&self) -> &[Arc<ResolvedVariantResult>] {
        &self.variants
    }

    /// Display name of the primary selected variant.
    pub fn variant_name(&self) -> Option<&str> {
        self.variants.first().map(|v| v.display_name.as_str())
    }

    /// Attributes of the primary selected variant.
    pub fn variant_attributes(&self) -> Option<&AttributeContainer> {
        self.variants.first().map(|v| v.attributes.as_ref())
    }

    /// Repository the component was resolved from.
    pub fn repository_name(&self) -> Option<&str> {
        self.repository_name.as_deref()
    }

    /// Outgoing edges, in the order they were recorded.
    pub fn dependencies(&self) -> &[DependencyResult] {
        &self.dependencies
    }
}

impl fmt::Display for ComponentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.component_id)
    }
}

/// Error assembling a result graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResultGraphError {
    /// A component was referenced but never described.
    #[error("Component {0} is referenced but was never recorded")]
    MissingComponent(i64),
    /// The root component was never described.
    #[error("Root component {0} was never recorded")]
    MissingRoot(i64),
    /// A component was described twice.
    #[error("Component {0} was recorded more than once")]
    DuplicateComponent(i64),
}

/// Immutable, fully linked resolution result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    root: i64,
    components: Vec<ComponentResult>,
    index: HashMap<i64, usize>,
}

impl ResolutionResult {
    /// The root component.
    pub fn root(&self) -> &ComponentResult {
        // `ResolutionResultGraphBuilder::complete` guarantees the root exists.
        &self.components[self.index[&self.root]]
    }

    /// Component by `result_id`.
    pub fn component(&self, id: i64) -> Option<&ComponentResult> {
        self.index.get(&id).map(|&slot| &self.components[slot])
    }

    /// Every component, in the order they were first mentioned.
    pub fn all_components(&self) -> impl Iterator<Item = &ComponentResult> {
        self.components.iter()
    }

    /// Every edge of the graph.
    pub fn all_dependencies(&self) -> impl Iterator<Item = &DependencyResult> {
        self.components.iter().flat_map(|c| c.dependencies.iter())
    }

    /// Failed edges of the graph.
    pub fn unresolved_dependencies(&self) -> impl Iterator<Item = &DependencyResult> {
        self.all_dependencies().filter(|d| !d.is_resolved())
    }

    /// Resolved edges selecting the component `id`.
    pub fn dependents(&self, id: i64) -> impl Iterator<Item = &DependencyResult> {
        self.all_dependencies()
            .filter(move |d| d.selected_component_id() == Some(id))
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the graph has no components. Never true for a completed graph.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Order-independent fingerprint of the graph.
    ///
    /// Two results describing the same components and edges under the same
    /// `result_id`s share a fingerprint, regardless of the order in which
    /// components and edges were recorded.
    pub fn fingerprint(&self) -> String {
        let mut components: Vec<FingerprintComponent<'_>> = self
            .components
            .iter()
            .map(|component| {
                let mut dependencies: Vec<String> = component
                    .dependencies
                    .iter()
                    .map(canonical_hash_hex)
                    .collect();
                dependencies.sort();
                FingerprintComponent {
                    id: component.id,
                    module_version: &component.module_version,
                    selection_reason: &component.selection_reason,
                    component_id: &component.component_id,
                    variants: &component.variants,
                    repository_name: component.repository_name.as_deref(),
                    dependencies,
                }
            })
            .collect();
        components.sort_by_key(|c| c.id);

        canonical_hash_hex(&FingerprintInput {
            root: self.root,
            components,
        })
    }
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    root: i64,
    components: Vec<FingerprintComponent<'a>>,
}

#[derive(Serialize)]
struct FingerprintComponent<'a> {
    id: i64,
    module_version: &'a ModuleVersionIdentifier,
    selection_reason: &'a ComponentSelectionReason,
    component_id: &'a ComponentIdentifier,
    variants: &'a [Arc<ResolvedVariantResult>],
    repository_name: Option<&'a str>,
    dependencies: Vec<String>,
}

#[derive(Debug, Default)]
struct Slot {
    component: Option<ComponentResult>,
    dependencies: Vec<DependencyResult>,
}

/// Assembles a [`ResolutionResult`] from components and edges in any order.
///
/// Every mention of a `result_id`, as a component or as an edge target,
/// gets or creates its arena slot. [`complete`](Self::complete) checks that
/// every slot was eventually described.
#[derive(Debug, Default)]
pub struct ResolutionResultGraphBuilder {
    slots: Vec<Slot>,
    index: HashMap<i64, usize>,
}

impl ResolutionResultGraphBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_create(&mut self, id: i64) -> usize {
        let slots = &mut self.slots;
        *self.index.entry(id).or_insert_with(|| {
            slots.push(Slot::default());
            slots.len() - 1
        })
    }

    /// Record a component.
    pub fn visit_component(&mut self, component: ComponentResult) -> Result<(), ResultGraphError> {
        let id = component.id;
        let slot = self.get_or_create(id);
        let slot = &mut self.slots[slot];
        if slot.component.is_some() {
            return Err(ResultGraphError::DuplicateComponent(id));
        }
        slot.component = Some(component);
        Ok(())
    }

    /// Attach outgoing edges to the component `from`.
    ///
    /// An edge equal to one already attached to the component is dropped.
    pub fn visit_outgoing_edges(&mut self, from: i64, edges: impl IntoIterator<Item = DependencyResult>) {
        let owner = self.get_or_create(from);
        for edge in edges {
            if let Some(target) = edge.selected_component_id() {
                self.get_or_create(target);
            }
            let dependencies = &mut self.slots[owner].dependencies;
            if !dependencies.contains(&edge) {
                dependencies.push(edge);
            }
        }
    }

    /// Number of distinct `result_id`s mentioned so far.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Link everything and return the immutable result rooted at `root`.
    pub fn complete(self, root: i64) -> Result<ResolutionResult, ResultGraphError> {
        if !matches!(self.index.get(&root), Some(&slot) if self.slots[slot].component.is_some()) {
            return Err(ResultGraphError::MissingRoot(root));
        }

        let mut ids: Vec<(usize, i64)> = self.index.iter().map(|(&id, &slot)| (slot, id)).collect();
        ids.sort_unstable();

        let mut components = Vec::with_capacity(self.slots.len());
        for ((_, id), slot) in ids.into_iter().zip(self.slots) {
            let mut component = slot.component.ok_or(ResultGraphError::MissingComponent(id))?;
            component.dependencies = slot.dependencies;
            components.push(component);
        }

        Ok(ResolutionResult {
            root,
            components,
            index: self.index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(id: i64, name: &str) -> ComponentResult {
        ComponentResult::new(
            id,
            ModuleVersionIdentifier::new("org", name, "1.0"),
            ComponentSelectionReason::REQUESTED,
            ComponentIdentifier::module("org", name, "1.0"),
        )
    }

    fn edge(from: i64, to: i64, name: &str) -> DependencyResult {
        DependencyResult::new(
            from,
            ComponentSelector::module("org", name, "1.0"),
            false,
            ComponentSelectionReason::REQUESTED,
            DependencyOutcome::Resolved {
                selected: to,
                resolved_variant: None,
            },
        )
    }

    #[test]
    fn test_forward_reference_is_linked() {
        let mut builder = ResolutionResultGraphBuilder::new();
        builder.visit_component(component(0, "root")).unwrap();
        // Edge to 1 before 1 is described.
        builder.visit_outgoing_edges(0, vec![edge(0, 1, "a")]);
        builder.visit_component(component(1, "a")).unwrap();

        let result = builder.complete(0).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.root().dependencies()[0].selected_component_id(), Some(1));
        assert_eq!(result.component(1).unwrap().module_version().module.name, "a");
        assert_eq!(result.dependents(1).count(), 1);
    }

    #[test]
    fn test_equal_edges_collapse() {
        let mut builder = ResolutionResultGraphBuilder::new();
        builder.visit_component(component(0, "root")).unwrap();
        builder.visit_component(component(1, "a")).unwrap();
        builder.visit_outgoing_edges(0, vec![edge(0, 1, "a")]);
        builder.visit_outgoing_edges(0, vec![edge(0, 1, "a")]);

        let result = builder.complete(0).unwrap();
        assert_eq!(result.root().dependencies().len(), 1);
    }

    #[test]
    fn test_dangling_reference_is_rejected() {
        let mut builder = ResolutionResultGraphBuilder::new();
        builder.visit_component(component(0, "root")).unwrap();
        builder.visit_outgoing_edges(0, vec![edge(0, 7, "ghost")]);

        assert_eq!(builder.complete(0), Err(ResultGraphError::MissingComponent(7)));
    }

    #[test]
    fn test_missing_root_is_rejected() {
        let mut builder = ResolutionResultGraphBuilder::new();
        builder.visit_component(component(1, "a")).unwrap();

        assert_eq!(builder.complete(0), Err(ResultGraphError::MissingRoot(0)));
    }

    #[test]
    fn test_duplicate_component_is_rejected() {
        let mut builder = ResolutionResultGraphBuilder::new();
        builder.visit_component(component(1, "a")).unwrap();

        assert_eq!(
            builder.visit_component(component(1, "a")),
            Err(ResultGraphError::DuplicateComponent(1))
        );
    }

    #[test]
    fn test_fingerprint_ignores_recording_order() {
        let mut first = ResolutionResultGraphBuilder::new();
        first.visit_component(component(0, "root")).unwrap();
        first.visit_component(component(1, "a")).unwrap();
        first.visit_component(component(2, "b")).unwrap();
        first.visit_outgoing_edges(0, vec![edge(0, 1, "a"), edge(0, 2, "b")]);

        let mut second = ResolutionResultGraphBuilder::new();
        second.visit_outgoing_edges(0, vec![edge(0, 2, "b"), edge(0, 1, "a")]);
        second.visit_component(component(2, "b")).unwrap();
        second.visit_component(component(1, "a")).unwrap();
        second.visit_component(component(0, "root")).unwrap();

        let first = first.complete(0).unwrap();
        let second = second.complete(0).unwrap();
        assert_eq!(first.fingerprint(), second.fingerprint());

        let mut third = ResolutionResultGraphBuilder::new();
        third.visit_component(component(0, "root")).unwrap();
        third.visit_component(component(1, "a")).unwrap();
        third.visit_outgoing_edges(0, vec![edge(0, 1, "a")]);
        third.visit_component(component(2, "b")).unwrap();
        assert_ne!(first.fingerprint(), third.complete(0).unwrap().fingerprint());
    }
}
