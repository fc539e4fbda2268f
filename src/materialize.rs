//! Lazy materialization of streamed resolution results.
//!
//! A [`ResolutionResultFactory`] owns the finished record stream of one
//! resolution. The first [`create`](ResolutionResultFactory::create) replays
//! the stream into a [`ResolutionResult`] under a mutex and publishes it in the
//! shared cache; every other caller, concurrent or later, gets the same `Arc`.

use std::collections::HashMap;
use std::io::{BufReader, Read};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::ResolutionResultCache;
use crate::codec::identifier::{read_component_identifier, read_component_selector, read_module_version};
use crate::codec::reason::read_reason;
use crate::codec::{CodecError, Decoder, ResolvedVariantReader};
use crate::record::{RecordTag, EDGE_FAILED, EDGE_RESOLVED};
use crate::store::{BinaryData, StoreError};
use crate::types::{
    ComponentResult, ComponentSelector, DependencyOutcome, DependencyResult, ResolutionId,
    ResolutionResult, ResolutionResultGraphBuilder, ResolveFailure, ResultGraphError,
};

/// Error decoding the record stream.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// A value could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The records do not form a consistent graph.
    #[error(transparent)]
    Graph(#[from] ResultGraphError),
    /// The record tag is not known to this reader.
    #[error("Unknown record tag {0}")]
    UnknownRecord(u8),
    /// A failed edge has no registered failure.
    #[error("No failure recorded for unresolved dependency {0}")]
    MissingFailure(String),
}

/// Error materializing a resolution result.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    /// The binary data could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The record stream is inconsistent.
    #[error("Could not read resolution result after {records_read} records (last record: {last_record}): {source}")]
    Stream {
        /// Records started before the failure, including the failing one.
        records_read: u64,
        /// Tag name of the last record started.
        last_record: &'static str,
        /// Underlying decode failure.
        source: ReplayError,
    },
}

/// Produces the materialized result of one resolution.
pub struct ResolutionResultFactory {
    resolution: ResolutionId,
    data: Box<dyn BinaryData>,
    failures: HashMap<ComponentSelector, Arc<ResolveFailure>>,
    cache: Arc<ResolutionResultCache>,
    lock: Mutex<()>,
}

impl ResolutionResultFactory {
    pub(crate) fn new(
        resolution: ResolutionId,
        data: Box<dyn BinaryData>,
        failures: HashMap<ComponentSelector, Arc<ResolveFailure>>,
        cache: Arc<ResolutionResultCache>,
    ) -> Self {
        Self {
            resolution,
            data,
            failures,
            cache,
            lock: Mutex::new(()),
        }
    }

    /// Identity of the resolution.
    pub fn resolution_id(&self) -> ResolutionId {
        self.resolution
    }

    /// Size of the record stream in bytes.
    pub fn stream_len(&self) -> u64 {
        self.data.len()
    }

    /// Get the resolution result, materializing it on first call.
    ///
    /// The record stream can only be read once. If that read fails, later
    /// calls fail with [`StoreError::AlreadyConsumed`].
    pub fn create(&self) -> Result<Arc<ResolutionResult>, MaterializeError> {
        let _guard = self.lock.lock();
        self.cache.load(self.resolution, || self.materialize())
    }

    fn materialize(&self) -> Result<ResolutionResult, MaterializeError> {
        let started = Instant::now();
        let reader = self.data.read()?;
        let mut dec = Decoder::new(BufReader::new(reader));

        let mut replay = Replay::new(&self.failures);
        let result = replay
            .run(&mut dec)
            .map_err(|source| MaterializeError::Stream {
                records_read: replay.records_read,
                last_record: replay.last_record,
                source,
            })?;

        debug!(
            resolution = %self.resolution,
            components = result.len(),
            records = replay.records_read,
            bytes = dec.offset(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Materialized resolution result"
        );
        Ok(result)
    }
}

impl Drop for ResolutionResultFactory {
    fn drop(&mut self) {
        if self.cache.evict(self.resolution).is_some() {
            trace!(resolution = %self.resolution, "Evicted resolution result");
        }
    }
}

impl std::fmt::Debug for ResolutionResultFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionResultFactory")
            .field("resolution", &self.resolution)
            .field("data", &self.data)
            .field("failures", &self.failures.len())
            .finish()
    }
}

/// Single pass over a record stream.
struct Replay<'a> {
    failures: &'a HashMap<ComponentSelector, Arc<ResolveFailure>>,
    variants: ResolvedVariantReader,
    graph: ResolutionResultGraphBuilder,
    records_read: u64,
    last_record: &'static str,
}

impl<'a> Replay<'a> {
    fn new(failures: &'a HashMap<ComponentSelector, Arc<ResolveFailure>>) -> Self {
        Self {
            failures,
            variants: ResolvedVariantReader::new(),
            graph: ResolutionResultGraphBuilder::new(),
            records_read: 0,
            last_record: "none",
        }
    }

    fn run<R: Read>(&mut self, dec: &mut Decoder<R>) -> Result<ResolutionResult, ReplayError> {
        loop {
            let Some(tag) = dec.read_byte_or_eof()? else {
                return Err(CodecError::Truncated(dec.offset()).into());
            };
            let record = RecordTag::from_byte(tag).ok_or(ReplayError::UnknownRecord(tag))?;
            self.records_read += 1;
            self.last_record = record.name();
            trace!(record = record.name(), offset = dec.offset() - 1, "Reading record");

            match record {
                RecordTag::Component => {
                    let component = self.read_component(dec)?;
                    self.graph.visit_component(component)?;
                }
                RecordTag::Dependency => {
                    let from = dec.read_long()?;
                    let count = dec.read_len()?;
                    let mut edges = Vec::with_capacity(count.min(256));
                    for _ in 0..count {
                        edges.push(self.read_edge(dec, from)?);
                    }
                    self.graph.visit_outgoing_edges(from, edges);
                }
                RecordTag::Root => {
                    let root = dec.read_long()?;
                    let graph = std::mem::take(&mut self.graph);
                    return Ok(graph.complete(root)?);
                }
            }
        }
    }

    fn read_component<R: Read>(&mut self, dec: &mut Decoder<R>) -> Result<ComponentResult, ReplayError> {
        let id = dec.read_long()?;
        let module_version = read_module_version(dec)?;
        let reason = read_reason(dec)?;
        let component_id = read_component_identifier(dec)?;

        let count = dec.read_len()?;
        let mut variants = Vec::with_capacity(count.min(16));
        for _ in 0..count {
            let variant = self
                .variants
                .read(dec)?
                .ok_or_else(|| CodecError::Malformed(format!("absent variant on component {}", id)))?;
            variants.push(variant);
        }
        let repository_name = dec.read_nullable_string()?;

        Ok(ComponentResult::new(id, module_version, reason, component_id)
            .with_variants(variants)
            .with_repository_name(repository_name))
    }

    fn read_edge<R: Read>(&mut self, dec: &mut Decoder<R>, from: i64) -> Result<DependencyResult, ReplayError> {
        let requested = read_component_selector(dec)?;
        let constraint = dec.read_bool()?;
        let reason = read_reason(dec)?;

        let outcome = match dec.read_byte()? {
            EDGE_RESOLVED => DependencyOutcome::Resolved {
                selected: dec.read_long()?,
                resolved_variant: self.variants.read(dec)?,
            },
            EDGE_FAILED => {
                let failure = self
                    .failures
                    .get(&requested)
                    .cloned()
                    .ok_or_else(|| ReplayError::MissingFailure(requested.to_string()))?;
                DependencyOutcome::Unresolved { failure }
            }
            tag => {
                return Err(CodecError::UnknownTag {
                    kind: "dependency outcome",
                    tag,
                }
                .into())
            }
        };

        Ok(DependencyResult::new(from, requested, constraint, reason, outcome))
    }
}
