use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use serde::Serialize;
use tracing::trace;

use crate::error::Result;
use crate::storage::EdgeStore;
use crate::types::{VertexId, VertexSet};

/// Default number of cached neighbor sets.
pub const DEFAULT_NEIGHBOR_CACHE_CAPACITY: usize = 131_072;

/// Cache hit/miss counters for one resolver.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct NeighborCacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups recomputed from the store.
    pub misses: u64,
    /// Entries dropped to make room.
    pub evictions: u64,
}

impl NeighborCacheStats {
    /// Fraction of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

/// Computes and memoizes mutual-neighbor sets.
///
/// `neighbors_of(v)` is `outgoing(v) ∩ incoming(v)` without `v` itself. The
/// resolver borrows the store immutably for its whole lifetime, so entries
/// cannot go stale: the cache lives exactly as long as one search run.
pub struct NeighborResolver<'a, S: EdgeStore + ?Sized> {
    store: &'a S,
    cache: Option<LruCache<VertexId, Arc<VertexSet>>>,
    stats: NeighborCacheStats,
}

impl<'a, S: EdgeStore + ?Sized> NeighborResolver<'a, S> {
    /// Creates a resolver; a `capacity` of zero disables caching.
    pub fn new(store: &'a S, capacity: usize) -> Self {
        Self {
            store,
            cache: NonZeroUsize::new(capacity).map(LruCache::new),
            stats: NeighborCacheStats::default(),
        }
    }

    /// Store the resolver reads from.
    pub fn store(&self) -> &'a S {
        self.store
    }

    /// Counters collected so far.
    pub fn stats(&self) -> NeighborCacheStats {
        self.stats
    }

    /// Mutual neighbors of `id`.
    pub fn neighbors_of(&mut self, id: VertexId) -> Result<Arc<VertexSet>> {
        if let Some(cache) = self.cache.as_mut() {
            if let Some(hit) = cache.get(&id) {
                self.stats.hits += 1;
                return Ok(Arc::clone(hit));
            }
        }
        self.stats.misses += 1;
        let neighbors = Arc::new(self.compute(id)?);
        if let Some(cache) = self.cache.as_mut() {
            if let Some((evicted, _)) = cache.push(id, Arc::clone(&neighbors)) {
                self.stats.evictions += 1;
                trace!(evicted = evicted.0, "neighbors.evict");
            }
        }
        Ok(neighbors)
    }

    fn compute(&self, id: VertexId) -> Result<VertexSet> {
        let outgoing = self.store.outgoing(id)?;
        if outgoing.is_empty() {
            return Ok(VertexSet::default());
        }
        let incoming = self.store.incoming(id)?;
        let (small, large) = if outgoing.len() <= incoming.len() {
            (&outgoing, &incoming)
        } else {
            (&incoming, &outgoing)
        };
        let mut mutual: VertexSet = small
            .iter()
            .copied()
            .filter(|candidate| large.contains(candidate))
            .collect();
        mutual.remove(&id);
        Ok(mutual)
    }
}
