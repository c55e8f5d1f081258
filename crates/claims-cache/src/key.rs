//! Cache key derivation.
//!
//! Credentials are never stored or logged as-is. Every cache operation first
//! hashes the raw credential with SHA-256 and works with the digest only, so
//! a dump of the cache internals (or a log line) cannot be replayed as a
//! bearer token.

use std::fmt;

use sha2::{Digest, Sha256};

/// Length of a [`CacheKey`] digest in bytes.
pub const KEY_LEN: usize = 32;

/// SHA-256 digest of a raw credential.
///
/// Identical credentials always produce identical keys. The `Display`
/// implementation renders lowercase hex, which is what shows up in logs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; KEY_LEN]);

impl CacheKey {
    /// Derive the key for a credential.
    ///
    /// Pure and infallible for any input, including the empty string.
    #[must_use]
    pub fn derive(credential: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(credential.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Full lowercase hex rendering of the digest.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex prefix, enough to correlate log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self.short())
    }
}
