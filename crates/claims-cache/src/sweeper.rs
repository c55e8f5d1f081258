//! Background sweep of expired claims.
//!
//! Lookups already ignore expired entries, so the sweeper only keeps memory
//! and the size counters honest for credentials that are never presented
//! again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::cache::ClaimsCache;

/// Periodic sweeper for a [`ClaimsCache`].
pub struct Sweeper;

impl Sweeper {
    /// Start sweeping `cache` every `period` in a background task.
    ///
    /// Must be called from within a Tokio runtime. The task stops when the
    /// returned handle is shut down or dropped.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero. `ClaimsCacheConfig::validate` rejects a
    /// zero `sweep_interval` when the sweep is enabled.
    pub fn start<C>(cache: Arc<ClaimsCache<C>>, period: Duration) -> SweeperHandle
    where
        C: Send + Sync + 'static,
    {
        assert!(!period.is_zero(), "sweep period must be non-zero");

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!(
                interval_secs = period.as_secs(),
                "Claims cache sweeper started"
            );

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.sweep();
                        if removed > 0 {
                            debug!(removed, size = cache.len(), "Swept expired claims");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            info!("Claims cache sweeper shutting down");
                            break;
                        }
                    }
                }
            }
        });

        SweeperHandle { shutdown_tx, task }
    }
}

/// Handle to a running [`Sweeper`] task.
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);

        if let Err(e) = self.task.await {
            warn!(error = %e, "Claims cache sweeper task failed");
        }
    }

    /// Check whether the task has already exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Claims;
    use crate::clock::{Clock, ManualClock};

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let clock = Arc::new(ManualClock::starting_now());
        let now = clock.now();
        let cache: Arc<ClaimsCache> = Arc::new(
            ClaimsCache::new(Duration::from_secs(300)).with_clock(clock.clone()),
        );

        cache.insert("short", now + time::Duration::seconds(5), Claims::new());
        cache.insert("long", now + time::Duration::seconds(120), Claims::new());
        clock.advance(time::Duration::seconds(10));

        let handle = Sweeper::start(Arc::clone(&cache), Duration::from_millis(10));

        // Wait for at least one tick to run
        for _ in 0..100 {
            if cache.len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(cache.len(), 1);
        assert!(cache.lookup("long").is_some());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let cache: Arc<ClaimsCache> = Arc::new(ClaimsCache::new(Duration::from_secs(60)));
        let handle = Sweeper::start(cache, Duration::from_secs(3600));

        assert!(!handle.is_finished());
        handle.shutdown().await;
    }

    #[tokio::test]
    #[should_panic(expected = "sweep period must be non-zero")]
    async fn test_zero_period_rejected() {
        let cache: Arc<ClaimsCache> = Arc::new(ClaimsCache::new(Duration::from_secs(60)));
        let _handle = Sweeper::start(cache, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_drop_stops_task() {
        let cache: Arc<ClaimsCache> = Arc::new(ClaimsCache::new(Duration::from_secs(60)));
        let handle = Sweeper::start(Arc::clone(&cache), Duration::from_secs(3600));
        drop(handle);

        // Only the test's reference remains once the task exits
        for _ in 0..100 {
            if Arc::strong_count(&cache) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(Arc::strong_count(&cache), 1);
    }
}
