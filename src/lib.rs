//! # resolution-result
//!
//! Streaming persistence and lazy materialization of dependency resolution
//! results.
//!
//! A resolver produces one graph per resolution: components selected for
//! each requested module, and the dependency edges between them. This crate
//! keeps that graph out of memory while the build runs and rebuilds it only
//! when somebody asks for it.
//!
//! ## Architecture
//!
//! ```text
//! resolver graph walk
//!        ↓  DependencyGraphVisitor (start, visit_node, visit_edges, finish)
//! StreamingResolutionResultBuilder → records → BinaryStore (memory | file)
//!        ↓  complete()
//! ResolutionResultFactory::create() → replay once → Arc<ResolutionResult>
//!                                            ↓
//!                                   ResolutionResultCache
//! ```
//!
//! ## Guarantees
//!
//! - Each component is written once, however many of its variants are walked
//! - Repeated variants and attribute containers are written once and shared
//!   again after reading
//! - The stream is replayed at most once; concurrent callers of `create`
//!   all get the same `Arc`
//! - Failed dependencies are data on the graph, not errors
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use resolution_result::{
//!     ComponentIdentifier, ComponentResult, ComponentSelectionReason, ComponentSelector,
//!     InMemoryDependencyGraph, ModuleVersionIdentifier, ResolutionResultCache,
//!     ResultStoreConfig, StreamingResolutionResultBuilder,
//! };
//!
//! let mut graph = InMemoryDependencyGraph::new();
//! let root = graph.add_component(ComponentResult::new(
//!     0,
//!     ModuleVersionIdentifier::new("org", "app", "1.0"),
//!     ComponentSelectionReason::ROOT,
//!     ComponentIdentifier::project(":", ":"),
//! ));
//! let lib = graph.add_component(ComponentResult::new(
//!     1,
//!     ModuleVersionIdentifier::new("org", "lib", "2.0"),
//!     ComponentSelectionReason::REQUESTED,
//!     ComponentIdentifier::module("org", "lib", "2.0"),
//! ));
//! graph.add_edge(root, lib, ComponentSelector::module("org", "lib", "2.0"), ComponentSelectionReason::REQUESTED);
//!
//! let cache = Arc::new(ResolutionResultCache::new());
//! let mut builder = StreamingResolutionResultBuilder::from_config(&ResultStoreConfig::in_memory(), cache).unwrap();
//! graph.walk(root, &mut builder).unwrap();
//!
//! let factory = builder.complete().unwrap();
//! let result = factory.create().unwrap();
//! assert_eq!(result.root().dependencies()[0].selected_component_id(), Some(1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod canonical;
pub mod codec;
pub mod record;
pub mod store;
pub mod config;
pub mod cache;
pub mod graph;
pub mod builder;
pub mod materialize;

// Re-exports
pub use types::{
    AttributeContainer, AttributeValue, Capability, ComponentIdentifier, ComponentResult,
    ComponentSelectionCause, ComponentSelectionDescriptor, ComponentSelectionReason,
    ComponentSelector, DependencyOutcome, DependencyResult, ModuleIdentifier,
    ModuleVersionIdentifier, ReasonError, ResolutionId, ResolutionResult,
    ResolutionResultGraphBuilder, ResolveFailure, ResolvedVariantResult, ResultGraphError,
    VersionConstraint,
};
pub use codec::CodecError;
pub use record::RecordTag;
pub use store::{BinaryData, BinaryStore, FileBinaryStore, InMemoryBinaryStore, StoreError};
pub use config::{ConfigError, ResultStoreConfig, StoreBacking};
pub use cache::{CacheStats, ResolutionResultCache};
pub use graph::{
    DependencyGraphComponent, DependencyGraphEdge, DependencyGraphNode, DependencyGraphVisitor,
    InMemoryDependencyGraph,
};
pub use builder::{BuildError, StreamingResolutionResultBuilder};
pub use materialize::{MaterializeError, ReplayError, ResolutionResultFactory};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
