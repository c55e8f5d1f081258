//! Error types.
//!
//! The cache itself has no failure modes: a miss is `None` and a declined
//! insert is a no-op. Errors only arise while loading configuration and while
//! resolving a credential through an external validator.

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// The configuration file could not be read.
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML or has the wrong shape.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors returned by [`ClaimsResolver::resolve`](crate::ClaimsResolver::resolve).
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The credential string was empty.
    #[error("Empty credential")]
    EmptyCredential,

    /// The external validator rejected the credential or failed.
    #[error("Credential validation failed: {message}")]
    Validation {
        /// Description of the failure.
        message: String,
    },
}

impl ResolveError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
