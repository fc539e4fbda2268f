//! Streaming writer of resolution results.
//!
//! [`StreamingResolutionResultBuilder`] is the [`DependencyGraphVisitor`] the
//! resolver walks its graph through. Every component and edge is encoded into
//! a record and appended to the binary store as soon as it is visited, so the
//! resolver never has to keep a second copy of the graph in memory. Once the
//! walk finishes, [`complete`](StreamingResolutionResultBuilder::complete)
//! hands out the factory that materializes the graph on demand.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::cache::ResolutionResultCache;
use crate::codec::identifier::{write_component_identifier, write_component_selector, write_module_version};
use crate::codec::reason::write_reason;
use crate::codec::{CodecError, Encoder, ResolvedVariantWriter};
use crate::config::ResultStoreConfig;
use crate::graph::{DependencyGraphComponent, DependencyGraphEdge, DependencyGraphNode, DependencyGraphVisitor};
use crate::materialize::ResolutionResultFactory;
use crate::record::{RecordTag, EDGE_FAILED, EDGE_RESOLVED};
use crate::store::{BinaryData, BinaryStore, StoreError};
use crate::types::{ComponentSelector, DependencyOutcome, ResolutionId, ResolveFailure};

/// Error raised while streaming a graph.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A value could not be encoded.
    #[error("Failed to encode resolution result: {0}")]
    Codec(#[from] CodecError),
    /// The store rejected a record.
    #[error("Failed to store resolution result: {0}")]
    Store(#[from] StoreError),
    /// The graph was visited after `finish`.
    #[error("Resolution result stream is already finished")]
    AlreadyFinished,
    /// `complete` was called before `finish`.
    #[error("Resolution result stream is not finished")]
    NotFinished,
    /// An earlier write failed and the stream was discarded.
    #[error("Resolution result stream was discarded after a failed write")]
    Failed,
}

/// Visitor that streams a resolved graph into a [`BinaryStore`].
pub struct StreamingResolutionResultBuilder {
    resolution: ResolutionId,
    store: Option<Box<dyn BinaryStore>>,
    data: Option<Box<dyn BinaryData>>,
    record: Vec<u8>,
    variants: ResolvedVariantWriter,
    visited: HashSet<i64>,
    failures: HashMap<ComponentSelector, Arc<ResolveFailure>>,
    cache: Arc<ResolutionResultCache>,
    records_written: u64,
    failed: bool,
}

impl StreamingResolutionResultBuilder {
    /// Stream into `store`, caching the materialized result in `cache`.
    pub fn new(store: Box<dyn BinaryStore>, cache: Arc<ResolutionResultCache>) -> Self {
        Self::with_record_capacity(store, cache, ResultStoreConfig::default().record_buffer_capacity)
    }

    /// Open a store as configured and stream into it.
    pub fn from_config(config: &ResultStoreConfig, cache: Arc<ResolutionResultCache>) -> Result<Self, StoreError> {
        Ok(Self::with_record_capacity(
            config.open_store()?,
            cache,
            config.record_buffer_capacity,
        ))
    }

    fn with_record_capacity(
        store: Box<dyn BinaryStore>,
        cache: Arc<ResolutionResultCache>,
        capacity: usize,
    ) -> Self {
        Self {
            resolution: ResolutionId::new(),
            store: Some(store),
            data: None,
            record: Vec::with_capacity(capacity),
            variants: ResolvedVariantWriter::new(),
            visited: HashSet::new(),
            failures: HashMap::new(),
            cache,
            records_written: 0,
            failed: false,
        }
    }

    /// Identity of this resolution.
    pub fn resolution_id(&self) -> ResolutionId {
        self.resolution
    }

    /// Number of records written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Number of failed edges registered so far, counted by selector.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Hand out the factory for the finished stream.
    pub fn complete(self) -> Result<ResolutionResultFactory, BuildError> {
        if self.failed {
            return Err(BuildError::Failed);
        }
        let Self {
            resolution,
            data,
            failures,
            cache,
            ..
        } = self;
        let data = data.ok_or(BuildError::NotFinished)?;
        Ok(ResolutionResultFactory::new(resolution, data, failures, cache))
    }

    /// Whether a write failed and the stream was discarded.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    fn ensure_open(&self) -> Result<(), BuildError> {
        if self.failed {
            return Err(BuildError::Failed);
        }
        if self.store.is_none() {
            return Err(BuildError::AlreadyFinished);
        }
        Ok(())
    }

    /// Drop the store and refuse every later call. The dedup tables and the
    /// visited set no longer match what reached the store.
    fn discard(&mut self, err: &BuildError) {
        warn!(
            resolution = %self.resolution,
            records = self.records_written,
            error = %err,
            "Discarding resolution result stream"
        );
        self.store = None;
        self.data = None;
        self.failed = true;
    }

    /// Encode one record and append it, discarding the stream on failure.
    fn write_record<F>(&mut self, tag: RecordTag, encode: F) -> Result<(), BuildError>
    where
        F: FnOnce(&mut Encoder<&mut Vec<u8>>, &mut ResolvedVariantWriter) -> Result<(), CodecError>,
    {
        self.ensure_open()?;
        let result = self.append_record(tag, encode);
        if let Err(err) = &result {
            self.discard(err);
        }
        result
    }

    fn append_record<F>(&mut self, tag: RecordTag, encode: F) -> Result<(), BuildError>
    where
        F: FnOnce(&mut Encoder<&mut Vec<u8>>, &mut ResolvedVariantWriter) -> Result<(), CodecError>,
    {
        let store = self.store.as_mut().ok_or(BuildError::AlreadyFinished)?;

        self.record.clear();
        let mut enc = Encoder::new(&mut self.record);
        enc.write_byte(tag.to_byte())?;
        encode(&mut enc, &mut self.variants)?;

        store.write(&self.record)?;
        self.records_written += 1;
        trace!(
            resolution = %self.resolution,
            record = tag.name(),
            bytes = self.record.len(),
            "Wrote record"
        );
        Ok(())
    }
}

impl std::fmt::Debug for StreamingResolutionResultBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResolutionResultBuilder")
            .field("resolution", &self.resolution)
            .field("finished", &self.store.is_none())
            .field("failed", &self.failed)
            .field("records_written", &self.records_written)
            .field("components", &self.visited.len())
            .field("failures", &self.failures.len())
            .finish()
    }
}

fn write_component<W, C>(
    enc: &mut Encoder<W>,
    variants: &mut ResolvedVariantWriter,
    component: &C,
) -> Result<(), CodecError>
where
    W: Write,
    C: DependencyGraphComponent,
{
    enc.write_long(component.result_id())?;
    write_module_version(enc, component.module_version())?;
    write_reason(enc, component.selection_reason())?;
    write_component_identifier(enc, component.component_id())?;
    let selected = component.selected_variants();
    enc.write_len(selected.len())?;
    for variant in selected {
        variants.write(enc, Some(variant))?;
    }
    enc.write_nullable_string(component.repository_name())
}

fn write_edge<W, E>(enc: &mut Encoder<W>, variants: &mut ResolvedVariantWriter, edge: &E) -> Result<(), CodecError>
where
    W: Write,
    E: DependencyGraphEdge,
{
    write_component_selector(enc, edge.requested())?;
    enc.write_bool(edge.is_constraint())?;
    write_reason(enc, edge.reason())?;
    match edge.outcome() {
        DependencyOutcome::Resolved {
            selected,
            resolved_variant,
        } => {
            enc.write_byte(EDGE_RESOLVED)?;
            enc.write_long(*selected)?;
            variants.write(enc, resolved_variant.as_ref())
        }
        DependencyOutcome::Unresolved { .. } => enc.write_byte(EDGE_FAILED),
    }
}

impl<N: DependencyGraphNode> DependencyGraphVisitor<N> for StreamingResolutionResultBuilder {
    type Error = BuildError;

    fn start(&mut self, root: &N) -> Result<(), BuildError> {
        self.ensure_open()?;
        debug!(
            resolution = %self.resolution,
            root = root.owner().result_id(),
            "Streaming resolution result"
        );
        Ok(())
    }

    fn visit_node(&mut self, node: &N) -> Result<(), BuildError> {
        self.ensure_open()?;
        let component = node.owner();
        if !self.visited.insert(component.result_id()) {
            return Ok(());
        }
        self.write_record(RecordTag::Component, |enc, variants| {
            write_component(enc, variants, component)
        })
    }

    fn visit_edges(&mut self, node: &N) -> Result<(), BuildError> {
        self.ensure_open()?;
        let edges = node.outgoing_edges();
        if edges.is_empty() {
            return Ok(());
        }

        let from = node.owner().result_id();
        self.write_record(RecordTag::Dependency, |enc, variants| {
            enc.write_long(from)?;
            enc.write_len(edges.len())?;
            for edge in edges {
                write_edge(enc, variants, edge)?;
            }
            Ok(())
        })?;

        for edge in edges {
            if let DependencyOutcome::Unresolved { failure } = edge.outcome() {
                self.failures.insert(edge.requested().clone(), failure.clone());
            }
        }
        Ok(())
    }

    fn finish(&mut self, root: &N) -> Result<(), BuildError> {
        let root = root.owner().result_id();
        self.write_record(RecordTag::Root, |enc, _| enc.write_long(root))?;

        let store = self.store.take().ok_or(BuildError::AlreadyFinished)?;
        let data = match store.done() {
            Ok(data) => data,
            Err(err) => {
                let err = BuildError::from(err);
                self.discard(&err);
                return Err(err);
            }
        };
        debug!(
            resolution = %self.resolution,
            records = self.records_written,
            components = self.visited.len(),
            variants = self.variants.variant_count(),
            failures = self.failures.len(),
            bytes = data.len(),
            "Resolution result stream complete"
        );
        self.data = Some(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphNode, InMemoryDependencyGraph, NodeIndex};
    use crate::store::InMemoryBinaryStore;
    use crate::types::{
        ComponentIdentifier, ComponentResult, ComponentSelectionReason, ModuleVersionIdentifier, VersionConstraint,
    };

    fn component(id: i64, name: &str) -> ComponentResult {
        ComponentResult::new(
            id,
            ModuleVersionIdentifier::new("org", name, "1.0"),
            ComponentSelectionReason::REQUESTED,
            ComponentIdentifier::module("org", name, "1.0"),
        )
    }

    fn builder() -> StreamingResolutionResultBuilder {
        StreamingResolutionResultBuilder::new(
            Box::new(InMemoryBinaryStore::new()),
            Arc::new(ResolutionResultCache::new()),
        )
    }

    fn two_variant_graph() -> (InMemoryDependencyGraph, NodeIndex) {
        let mut graph = InMemoryDependencyGraph::new();
        let root = graph.add_component(component(0, "root"));
        let lib = Arc::new(component(1, "lib"));
        let api = graph.add_node(lib.clone());
        let runtime = graph.add_node(lib);
        graph.add_edge(root, api, ComponentSelector::module("org", "lib", "1.0"), ComponentSelectionReason::REQUESTED);
        graph.add_edge(root, runtime, ComponentSelector::module("org", "lib", "1.0"), ComponentSelectionReason::REQUESTED);
        (graph, root)
    }

    #[test]
    fn test_component_written_once_per_owner() {
        let (graph, root) = two_variant_graph();
        let mut builder = builder();
        graph.walk(root, &mut builder).unwrap();

        // Two COMPONENT records, one DEPENDENCY record for root, ROOT.
        assert_eq!(builder.records_written(), 4);
    }

    #[test]
    fn test_failures_registered_by_selector() {
        let mut graph = InMemoryDependencyGraph::new();
        let root = graph.add_component(component(0, "root"));
        let missing = ComponentSelector::module("com.x", "missing", "1.0");
        graph.add_failed_edge(
            root,
            ResolveFailure::new(missing, "not found"),
            ComponentSelectionReason::REQUESTED,
        );

        let mut builder = builder();
        graph.walk(root, &mut builder).unwrap();
        assert_eq!(builder.failure_count(), 1);
    }

    #[test]
    fn test_visit_after_finish_fails() {
        let (graph, root) = two_variant_graph();
        let mut builder = builder();
        graph.walk(root, &mut builder).unwrap();

        let node: &GraphNode = graph.node(root);
        assert!(matches!(builder.visit_node(node), Err(BuildError::AlreadyFinished)));
        assert!(matches!(builder.finish(node), Err(BuildError::AlreadyFinished)));
    }

    #[test]
    fn test_complete_before_finish_fails() {
        let (graph, root) = two_variant_graph();
        let mut builder = builder();
        builder.start(graph.node(root)).unwrap();
        builder.visit_node(graph.node(root)).unwrap();
        assert!(matches!(builder.complete(), Err(BuildError::NotFinished)));
    }

    #[test]
    fn test_failed_write_discards_stream() {
        let mut graph = InMemoryDependencyGraph::new();
        let root = graph.add_component(component(0, "root"));
        let a = graph.add_component(component(1, "a"));
        let b = graph.add_component(component(2, "b"));
        graph.add_edge(root, a, ComponentSelector::module("org", "a", "1.0"), ComponentSelectionReason::REQUESTED);
        graph.add_edge(
            root,
            b,
            ComponentSelector::module_with_constraint(
                "org",
                "b",
                VersionConstraint::prefer("1.0").rejecting("0.9").rejecting("0.8"),
            ),
            ComponentSelectionReason::REQUESTED,
        );

        let mut builder = builder();
        builder.start(graph.node(root)).unwrap();
        builder.visit_node(graph.node(root)).unwrap();
        let err = builder.visit_edges(graph.node(root)).unwrap_err();
        assert!(matches!(err, BuildError::Codec(CodecError::Unsupported(_))));
        assert!(builder.is_failed());

        assert!(matches!(builder.visit_node(graph.node(a)), Err(BuildError::Failed)));
        assert!(matches!(builder.visit_edges(graph.node(a)), Err(BuildError::Failed)));
        assert!(matches!(builder.finish(graph.node(root)), Err(BuildError::Failed)));
        assert!(matches!(builder.complete(), Err(BuildError::Failed)));
    }
}
