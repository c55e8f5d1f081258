//! Removal and rejection events.
//!
//! Events identify entries by [`CacheKey`] only. They are a side channel for
//! logging and metrics and never influence what the cache returns.

use time::Duration;

use crate::key::CacheKey;

/// Something that happened to a cache entry outside the normal hit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    /// A live entry passed its expiry and was removed, either lazily on
    /// access or by a sweep.
    Expired {
        /// Digest of the credential.
        key: CacheKey,
    },

    /// An entry was removed explicitly before it expired.
    Evicted {
        /// Digest of the credential.
        key: CacheKey,
    },

    /// An insert was declined because the credential had no remaining
    /// lifetime.
    Rejected {
        /// Digest of the credential.
        key: CacheKey,
        /// How far past its expiry the credential already was (zero when it
        /// expires exactly now).
        overdue: Duration,
    },
}

impl CacheEvent {
    /// Digest of the credential this event refers to.
    #[must_use]
    pub fn key(&self) -> &CacheKey {
        match self {
            Self::Expired { key } | Self::Evicted { key } | Self::Rejected { key, .. } => key,
        }
    }
}

/// Receives [`CacheEvent`]s.
///
/// Called synchronously from cache operations, after the map has been
/// updated and with no shard lock held. Implementations must be cheap.
pub trait EvictionListener: Send + Sync {
    /// Handle a single event.
    fn on_event(&self, event: &CacheEvent);
}

/// Default listener: logs every event at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl EvictionListener for TracingListener {
    fn on_event(&self, event: &CacheEvent) {
        match event {
            CacheEvent::Expired { key } => {
                tracing::debug!(key = %key.short(), "Claims cache entry expired");
            }
            CacheEvent::Evicted { key } => {
                tracing::debug!(key = %key.short(), "Claims cache entry evicted");
            }
            CacheEvent::Rejected { key, overdue } => {
                tracing::debug!(
                    key = %key.short(),
                    overdue_secs = overdue.whole_seconds(),
                    "Claims cache insert skipped: credential already expired"
                );
            }
        }
    }
}

/// Listener that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl EvictionListener for NoopListener {
    fn on_event(&self, _event: &CacheEvent) {}
}
