//! # claims-cache
//!
//! Short-lived, in-memory cache of authorization claims keyed by access
//! credential.
//!
//! A protected API that validates bearer credentials remotely (token
//! introspection, userinfo) can cache the resolved claims here and skip the
//! remote call for repeated requests carrying the same credential.
//!
//! ## Guarantees
//!
//! - Credentials are keyed by their SHA-256 digest and never stored raw.
//! - An entry lives until the credential's own expiry or `max_ttl` after
//!   insertion, whichever comes first.
//! - Expired entries are never returned, whether or not a sweep has run.
//! - Inserting an already-expired credential is a silent no-op.
//!
//! ## Modules
//!
//! - [`cache`] - The claims cache
//! - [`key`] - Credential digest used as cache key
//! - [`config`] - Configuration loading and validation
//! - [`resolver`] - Cache-first resolution through an external validator
//! - [`sweeper`] - Background removal of expired entries
//! - [`runtime`] - Startup and shutdown of a process-wide cache
//! - [`events`] - Removal and rejection events for logging and metrics
//! - [`clock`] - Time source abstraction

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod key;
pub mod resolver;
pub mod runtime;
pub mod stats;
pub mod sweeper;

pub use cache::{Claims, ClaimsCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ClaimsCacheConfig;
pub use error::{ConfigError, ResolveError};
pub use events::{CacheEvent, EvictionListener, NoopListener, TracingListener};
pub use key::CacheKey;
pub use resolver::{ClaimsResolver, CredentialValidator, ValidatedCredential};
pub use runtime::CacheRuntime;
pub use stats::{CacheStatistics, CacheStatsSnapshot};
pub use sweeper::{Sweeper, SweeperHandle};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        CacheRuntime, Claims, ClaimsCache, ClaimsCacheConfig, ClaimsResolver,
        CredentialValidator, ResolveError, ValidatedCredential,
    };
}
