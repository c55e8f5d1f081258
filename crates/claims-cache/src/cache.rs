//! In-memory claims cache.
//!
//! Maps a credential (by its SHA-256 digest) to the claims an external
//! validator resolved for it, so repeated requests carrying the same
//! credential skip remote validation.
//!
//! ## Expiry
//!
//! Every entry expires at `min(credential expiry, insert time + max_ttl)`.
//! Expired entries are never returned: [`ClaimsCache::lookup`] treats them as
//! a miss and removes them on the spot. [`ClaimsCache::sweep`] removes the
//! rest and is driven periodically by [`Sweeper`](crate::Sweeper).
//!
//! ## Concurrency
//!
//! Entries live in a sharded [`DashMap`]; each insert replaces an entry
//! atomically, so readers see either the old entry or the new one. Two inserts
//! for the same credential race and the last write wins.
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use claims_cache::ClaimsCache;
//!
//! let cache = ClaimsCache::new(Duration::from_secs(300));
//!
//! match cache.lookup(token) {
//!     Some(claims) => authorize(&claims),
//!     None => {
//!         let (claims, exp) = introspect(token).await?;
//!         cache.insert_unix(token, exp, claims);
//!     }
//! }
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use time::{Duration, OffsetDateTime};

use crate::clock::{Clock, SystemClock};
use crate::config::ClaimsCacheConfig;
use crate::events::{CacheEvent, EvictionListener, TracingListener};
use crate::key::CacheKey;
use crate::stats::{CacheStatistics, CacheStatsSnapshot};

/// Default claims payload: a JSON object of claim name to value.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// A cached claims payload with its absolute expiry.
struct CacheEntry<C> {
    claims: Arc<C>,
    expires_at: OffsetDateTime,
}

impl<C> CacheEntry<C> {
    fn is_live(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

/// Thread-safe cache of resolved claims keyed by credential digest.
///
/// Create one per process at startup, share it as `Arc<ClaimsCache>` with
/// every request handler, and drop it on shutdown.
pub struct ClaimsCache<C = Claims> {
    entries: DashMap<CacheKey, CacheEntry<C>>,
    max_ttl: Duration,
    clock: Arc<dyn Clock>,
    listener: Arc<dyn EvictionListener>,
    stats: CacheStatistics,
}

impl<C> std::fmt::Debug for ClaimsCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimsCache")
            .field("size", &self.entries.len())
            .field("max_ttl", &self.max_ttl)
            .field("stats", &self.stats.snapshot(self.entries.len()))
            .finish()
    }
}

impl<C> ClaimsCache<C>
where
    C: Send + Sync,
{
    /// Create a cache that holds entries for at most `max_ttl`.
    ///
    /// A zero `max_ttl` yields a cache that declines every insert; use
    /// [`ClaimsCacheConfig::validate`] to reject that up front.
    #[must_use]
    pub fn new(max_ttl: std::time::Duration) -> Self {
        Self::with_capacity(max_ttl, 0)
    }

    /// Create a cache with room for `capacity` entries before reallocating.
    #[must_use]
    pub fn with_capacity(max_ttl: std::time::Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
            max_ttl: Duration::try_from(max_ttl).unwrap_or(Duration::MAX),
            clock: Arc::new(SystemClock),
            listener: Arc::new(TracingListener),
            stats: CacheStatistics::default(),
        }
    }

    /// Create a cache from configuration.
    #[must_use]
    pub fn from_config(config: &ClaimsCacheConfig) -> Self {
        Self::with_capacity(config.max_ttl, config.initial_capacity)
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the event listener (defaults to [`TracingListener`]).
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn EvictionListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Get the claims cached for `credential`.
    ///
    /// Returns `None` when nothing was cached or the entry has expired. An
    /// expired entry is removed before returning.
    pub fn lookup(&self, credential: &str) -> Option<Arc<C>> {
        let key = CacheKey::derive(credential);
        let now = self.clock.now();

        let expired = match self.entries.get(&key) {
            Some(entry) if entry.is_live(now) => {
                CacheStatistics::record(&self.stats.hits);
                return Some(Arc::clone(&entry.claims));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.remove_expired(&key, now);
        }

        CacheStatistics::record(&self.stats.misses);
        None
    }

    /// Cache `claims` for `credential` until `expires_at`, capped at
    /// `max_ttl` from now.
    ///
    /// If `expires_at` is not in the future nothing is stored and the call
    /// only emits a [`CacheEvent::Rejected`]. Replaces any previous entry for
    /// the same credential.
    pub fn insert(&self, credential: &str, expires_at: OffsetDateTime, claims: C) {
        self.insert_shared(credential, expires_at, Arc::new(claims));
    }

    /// Same as [`insert`](Self::insert) for claims that are already shared.
    pub fn insert_shared(&self, credential: &str, expires_at: OffsetDateTime, claims: Arc<C>) {
        let key = CacheKey::derive(credential);
        let now = self.clock.now();
        self.admit(key, now, expires_at - now, claims);
    }

    /// Same as [`insert`](Self::insert) with the expiry given as seconds since
    /// the Unix epoch, as found in a JWT or introspection `exp` claim.
    pub fn insert_unix(&self, credential: &str, exp: i64, claims: C) {
        let key = CacheKey::derive(credential);
        let now = self.clock.now();

        let remaining = match OffsetDateTime::from_unix_timestamp(exp) {
            Ok(expires_at) => expires_at - now,
            // Outside the representable range: far future or far past
            Err(_) if exp > 0 => Duration::MAX,
            Err(_) => Duration::MIN,
        };

        self.admit(key, now, remaining, Arc::new(claims));
    }

    fn admit(&self, key: CacheKey, now: OffsetDateTime, remaining: Duration, claims: Arc<C>) {
        let ttl = remaining.min(self.max_ttl);

        if !ttl.is_positive() {
            // Drop a stale entry for this credential while we are here.
            self.remove_expired(&key, now);
            CacheStatistics::record(&self.stats.rejected);
            self.listener.on_event(&CacheEvent::Rejected {
                key,
                overdue: if remaining.is_negative() {
                    remaining.abs()
                } else {
                    Duration::ZERO
                },
            });
            return;
        }

        let Some(expires_at) = now.checked_add(ttl) else {
            CacheStatistics::record(&self.stats.rejected);
            tracing::warn!(key = %key.short(), "Claims cache insert skipped: expiry out of range");
            return;
        };

        self.entries.insert(key, CacheEntry { claims, expires_at });
        CacheStatistics::record(&self.stats.insertions);

        tracing::trace!(
            key = %key.short(),
            ttl_secs = ttl.whole_seconds(),
            clamped = ttl < remaining,
            "Claims cached"
        );
    }

    /// Remove any entry for `credential`, live or not.
    ///
    /// Returns `true` if an entry was removed.
    pub fn evict(&self, credential: &str) -> bool {
        let key = CacheKey::derive(credential);

        if self.entries.remove(&key).is_some() {
            CacheStatistics::record(&self.stats.evictions);
            self.listener.on_event(&CacheEvent::Evicted { key });
            true
        } else {
            false
        }
    }

    /// When the live entry for `credential` expires, if there is one.
    pub fn expires_at(&self, credential: &str) -> Option<OffsetDateTime> {
        let key = CacheKey::derive(credential);
        let now = self.clock.now();

        self.entries
            .get(&key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.expires_at)
    }

    /// Remove all expired entries.
    ///
    /// Expired keys are collected first and then removed one at a time, each
    /// removal re-checking expiry so a concurrent re-insert survives. Only
    /// one removal holds a shard write lock at a time. Collecting holds each
    /// shard's read lock while that shard is scanned, so lookups keep running
    /// but inserts into the shard being scanned wait for the scan.
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();

        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_live(now))
            .map(|entry| *entry.key())
            .collect();

        let removed = expired
            .iter()
            .filter(|key| self.remove_expired(key, now))
            .count();

        if removed > 0 {
            tracing::debug!(
                removed,
                remaining = self.entries.len(),
                "Claims cache sweep completed"
            );
        }

        removed
    }

    /// Remove the entry for `key` only if it is still expired at `now`.
    fn remove_expired(&self, key: &CacheKey, now: OffsetDateTime) -> bool {
        if self
            .entries
            .remove_if(key, |_, entry| !entry.is_live(now))
            .is_some()
        {
            CacheStatistics::record(&self.stats.expirations);
            self.listener.on_event(&CacheEvent::Expired { key: *key });
            true
        } else {
            false
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let size = self.entries.len();
        self.entries.clear();
        tracing::debug!(removed = size, "Claims cache cleared");
    }

    /// Maximum retention for any entry.
    pub fn max_ttl(&self) -> Duration {
        self.max_ttl
    }

    /// Number of stored entries, including expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot(self.entries.len())
    }
}
