//! Process-wide cache lifecycle.
//!
//! A host service builds one [`CacheRuntime`] at startup, hands
//! [`CacheRuntime::cache`] to its request handlers and calls
//! [`CacheRuntime::shutdown`] when it stops.
//!
//! ```ignore
//! let runtime = CacheRuntime::start(&config)?;
//! let state = AppState { claims: runtime.cache() };
//! // ... serve ...
//! runtime.shutdown().await;
//! ```

use std::sync::Arc;

use crate::cache::{Claims, ClaimsCache};
use crate::config::ClaimsCacheConfig;
use crate::error::ConfigError;
use crate::sweeper::{Sweeper, SweeperHandle};

/// A claims cache together with its background sweeper.
pub struct CacheRuntime<C = Claims> {
    cache: Arc<ClaimsCache<C>>,
    sweeper: Option<SweeperHandle>,
}

impl<C> CacheRuntime<C>
where
    C: Send + Sync + 'static,
{
    /// Validate `config`, build the cache and start the sweeper if enabled.
    ///
    /// Must be called from within a Tokio runtime when the sweeper is
    /// enabled.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the configuration is invalid.
    pub fn start(config: &ClaimsCacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_cache(ClaimsCache::from_config(config), config))
    }

    /// Wrap a pre-built cache (custom clock or listener), starting the
    /// sweeper according to `config`.
    ///
    /// The cache's retention is whatever it was built with; only the sweep
    /// settings are taken from `config`.
    pub fn with_cache(cache: ClaimsCache<C>, config: &ClaimsCacheConfig) -> Self {
        let cache = Arc::new(cache);

        let sweeper = (config.sweep_enabled && !config.sweep_interval.is_zero())
            .then(|| Sweeper::start(Arc::clone(&cache), config.sweep_interval));

        tracing::info!(
            max_ttl_secs = cache.max_ttl().whole_seconds(),
            sweep_enabled = sweeper.is_some(),
            "Claims cache initialized"
        );

        Self { cache, sweeper }
    }

    /// Shared handle to the cache.
    #[must_use]
    pub fn cache(&self) -> Arc<ClaimsCache<C>> {
        Arc::clone(&self.cache)
    }

    /// Whether a background sweeper is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_some()
    }

    /// Stop the sweeper and drop all cached claims.
    ///
    /// Other holders of [`cache`](Self::cache) keep a valid but empty cache.
    pub async fn shutdown(self) {
        if let Some(sweeper) = self.sweeper {
            sweeper.shutdown().await;
        }

        let stats = self.cache.stats();
        self.cache.clear();

        tracing::info!(
            hits = stats.hits,
            misses = stats.misses,
            insertions = stats.insertions,
            rejected = stats.rejected,
            expirations = stats.expirations,
            evictions = stats.evictions,
            "Claims cache shut down"
        );
    }
}
