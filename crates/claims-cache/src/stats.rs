//! Cache statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters, updated with relaxed atomics.
#[derive(Debug, Default)]
pub struct CacheStatistics {
    /// Lookups that returned claims
    pub hits: AtomicU64,
    /// Lookups that found nothing live
    pub misses: AtomicU64,
    /// Entries stored (including overwrites)
    pub insertions: AtomicU64,
    /// Inserts declined for non-positive TTL
    pub rejected: AtomicU64,
    /// Entries removed because they expired
    pub expirations: AtomicU64,
    /// Entries removed explicitly
    pub evictions: AtomicU64,
}

impl CacheStatistics {
    pub(crate) fn record(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Calculate hit ratio.
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        let total = hits + misses;

        if total == 0.0 { 0.0 } else { hits / total }
    }

    /// Get a snapshot of the counters together with the current size.
    pub fn snapshot(&self, size: usize) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size,
            hit_ratio: self.hit_ratio(),
        }
    }
}

/// A point-in-time snapshot of cache statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub rejected: u64,
    pub expirations: u64,
    pub evictions: u64,
    pub size: usize,
    pub hit_ratio: f64,
}
