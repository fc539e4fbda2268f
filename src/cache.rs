//! Write-once cache of materialized resolution results.
//!
//! The cache is shared by every resolution of a build. Each entry is keyed by
//! a [`ResolutionId`] and written at most once: the first materialization wins
//! and every later lookup gets the same `Arc`. Entries are evicted by the
//! owning factory when it is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::{ResolutionId, ResolutionResult};

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries in the cache.
    pub len: usize,
    /// Number of results materialized through the cache.
    pub loads: u64,
    /// Number of lookups served from the cache.
    pub hits: u64,
}

/// Shared cache of materialized results.
#[derive(Debug, Default)]
pub struct ResolutionResultCache {
    entries: RwLock<HashMap<ResolutionId, Arc<ResolutionResult>>>,
    loads: AtomicU64,
    hits: AtomicU64,
}

impl ResolutionResultCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result for `id`, or load and cache it.
    ///
    /// Concurrent loads of the same id are not coalesced here; callers that
    /// need single-flight loading serialize calls per id.
    pub fn load<E, F>(&self, id: ResolutionId, load: F) -> Result<Arc<ResolutionResult>, E>
    where
        F: FnOnce() -> Result<ResolutionResult, E>,
    {
        if let Some(result) = self.get(id) {
            return Ok(result);
        }

        let result = Arc::new(load()?);
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(self.entries.write().entry(id).or_insert(result).clone())
    }

    /// Cached result for `id`, if any.
    pub fn get(&self, id: ResolutionId) -> Option<Arc<ResolutionResult>> {
        let result = self.entries.read().get(&id).cloned();
        if result.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Drop the entry for `id`.
    pub fn evict(&self, id: ResolutionId) -> Option<Arc<ResolutionResult>> {
        self.entries.write().remove(&id)
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            len: self.len(),
            loads: self.loads.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
        }
    }
}
