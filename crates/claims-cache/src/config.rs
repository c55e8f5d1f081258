//! Claims cache configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [claims_cache]
//! max_ttl = "5m"
//! sweep_enabled = true
//! sweep_interval = "60s"
//! initial_capacity = 1024
//! ```
//!
//! Environment overrides, applied after the file:
//!
//! - `CLAIMS_CACHE_MAX_TTL` (humantime, e.g. `"10m"`)
//! - `CLAIMS_CACHE_SWEEP_INTERVAL` (humantime)
//! - `CLAIMS_CACHE_SWEEP_ENABLED` (`true`/`false`/`1`/`0`)

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_MAX_TTL: &str = "CLAIMS_CACHE_MAX_TTL";
pub const ENV_SWEEP_INTERVAL: &str = "CLAIMS_CACHE_SWEEP_INTERVAL";
pub const ENV_SWEEP_ENABLED: &str = "CLAIMS_CACHE_SWEEP_ENABLED";

/// Claims cache configuration.
///
/// Read once when the cache is built; nothing here can change for the
/// lifetime of a cache instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClaimsCacheConfig {
    /// Maximum time an entry may stay cached, regardless of how long the
    /// credential itself remains valid.
    #[serde(with = "humantime_serde")]
    pub max_ttl: Duration,

    /// Run a background task that removes expired entries.
    /// Lookups never return expired entries either way.
    pub sweep_enabled: bool,

    /// Period of the background sweep.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,

    /// Number of entries to pre-allocate.
    pub initial_capacity: usize,
}

impl Default for ClaimsCacheConfig {
    fn default() -> Self {
        Self {
            max_ttl: Duration::from_secs(300),       // 5 minutes
            sweep_enabled: true,
            sweep_interval: Duration::from_secs(60), // 1 minute
            initial_capacity: 1024,
        }
    }
}

/// Top-level layout of a configuration file.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    claims_cache: ClaimsCacheConfig,
}

impl ClaimsCacheConfig {
    /// Creates a configuration with the given maximum retention and defaults
    /// for everything else.
    #[must_use]
    pub fn with_max_ttl(max_ttl: Duration) -> Self {
        Self {
            max_ttl,
            ..Self::default()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `max_ttl` is zero
    /// - the sweep is enabled with a zero interval
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "max_ttl must be > 0".to_string(),
            ));
        }

        if self.sweep_enabled && self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "sweep_interval must be > 0 when sweep is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Parses the `[claims_cache]` table of a TOML document.
    ///
    /// A document without the table yields the defaults. The result is not
    /// validated.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed TOML or wrongly typed values.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(input)?;
        Ok(file.claims_cache)
    }

    /// Loads a configuration file, applies environment overrides and
    /// validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if an
    /// environment override is malformed, or if validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;

        tracing::debug!(
            path = %path.display(),
            max_ttl_secs = config.max_ttl.as_secs(),
            sweep_enabled = config.sweep_enabled,
            "Claims cache configuration loaded"
        );

        Ok(config)
    }

    /// Applies overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set but cannot be
    /// parsed.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set but cannot be
    /// parsed.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_TTL) {
            self.max_ttl = parse_duration(ENV_MAX_TTL, &value)?;
        }

        if let Some(value) = lookup(ENV_SWEEP_INTERVAL) {
            self.sweep_interval = parse_duration(ENV_SWEEP_INTERVAL, &value)?;
        }

        if let Some(value) = lookup(ENV_SWEEP_ENABLED) {
            self.sweep_enabled = parse_bool(ENV_SWEEP_ENABLED, &value)?;
        }

        Ok(())
    }
}

fn parse_duration(name: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| {
        ConfigError::InvalidValue(format!("{name}: invalid duration '{value}': {e}"))
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue(format!(
            "{name}: invalid boolean '{other}'"
        ))),
    }
}
