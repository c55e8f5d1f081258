//! Read-through resolution of credentials to claims.
//!
//! [`ClaimsResolver`] answers from the cache when it can and otherwise asks a
//! [`CredentialValidator`] (token introspection, a userinfo call, local JWT
//! verification) and caches what it returns.
//!
//! # Example
//!
//! ```ignore
//! struct Introspection { client: reqwest::Client, endpoint: Url }
//!
//! #[async_trait]
//! impl CredentialValidator for Introspection {
//!     type Claims = Claims;
//!
//!     async fn validate(&self, credential: &str) -> Result<ValidatedCredential<Claims>, ResolveError> {
//!         // POST to the introspection endpoint, check `active`, read `exp`
//!     }
//! }
//!
//! let resolver = ClaimsResolver::new(runtime.cache(), Arc::new(introspection));
//! let claims = resolver.resolve(bearer_token).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::cache::ClaimsCache;
use crate::error::ResolveError;

/// Outcome of a successful remote validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCredential<C> {
    /// Authoritative claims for the credential.
    pub claims: C,
    /// When the credential itself stops being valid.
    pub expires_at: OffsetDateTime,
}

impl<C> ValidatedCredential<C> {
    /// Build from an `exp` value in seconds since the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Validation` if `exp` is not a representable
    /// timestamp.
    pub fn from_unix(claims: C, exp: i64) -> Result<Self, ResolveError> {
        let expires_at = OffsetDateTime::from_unix_timestamp(exp)
            .map_err(|e| ResolveError::validation(format!("invalid exp {exp}: {e}")))?;
        Ok(Self { claims, expires_at })
    }
}

/// External collaborator that establishes whether a credential is valid.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    /// Claims payload produced on success.
    type Claims: Send + Sync + 'static;

    /// Validate `credential` and return its claims and expiry.
    async fn validate(
        &self,
        credential: &str,
    ) -> Result<ValidatedCredential<Self::Claims>, ResolveError>;
}

/// Cache-first credential resolver.
pub struct ClaimsResolver<V: CredentialValidator> {
    cache: Arc<ClaimsCache<V::Claims>>,
    validator: Arc<V>,
}

impl<V: CredentialValidator> Clone for ClaimsResolver<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            validator: Arc::clone(&self.validator),
        }
    }
}

impl<V: CredentialValidator> ClaimsResolver<V> {
    /// Creates a resolver over a shared cache.
    pub fn new(cache: Arc<ClaimsCache<V::Claims>>, validator: Arc<V>) -> Self {
        Self { cache, validator }
    }

    /// The underlying cache.
    pub fn cache(&self) -> &Arc<ClaimsCache<V::Claims>> {
        &self.cache
    }

    /// Resolve `credential` to claims.
    ///
    /// Served from the cache when a live entry exists. Otherwise the
    /// validator is called and its result is cached before returning. A
    /// credential the validator reports as already expired is returned but
    /// not cached.
    ///
    /// # Errors
    ///
    /// - `ResolveError::EmptyCredential` for an empty credential
    /// - any error returned by the validator; nothing is cached in that case
    pub async fn resolve(&self, credential: &str) -> Result<Arc<V::Claims>, ResolveError> {
        if credential.is_empty() {
            return Err(ResolveError::EmptyCredential);
        }

        if let Some(claims) = self.cache.lookup(credential) {
            return Ok(claims);
        }

        let validated = self
            .validator
            .validate(credential)
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "Credential validation failed"))?;

        let claims = Arc::new(validated.claims);
        self.cache
            .insert_shared(credential, validated.expires_at, Arc::clone(&claims));

        Ok(claims)
    }

    /// Drop any cached claims for `credential`, e.g. on logout.
    pub fn invalidate(&self, credential: &str) -> bool {
        self.cache.evict(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Claims;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // -------------------------------------------------------------------------
    // Mock Validator
    // -------------------------------------------------------------------------

    struct MockValidator {
        lifetime: time::Duration,
        call_count: AtomicUsize,
    }

    impl MockValidator {
        fn new(lifetime: time::Duration) -> Self {
            Self {
                lifetime,
                call_count: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CredentialValidator for MockValidator {
        type Claims = Claims;

        async fn validate(
            &self,
            credential: &str,
        ) -> Result<ValidatedCredential<Claims>, ResolveError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            if credential.starts_with("bad") {
                return Err(ResolveError::validation("token inactive"));
            }

            let mut claims = Claims::new();
            claims.insert("sub".to_string(), json!(format!("user-of-{credential}")));
            Ok(ValidatedCredential {
                claims,
                expires_at: OffsetDateTime::now_utc() + self.lifetime,
            })
        }
    }

    fn resolver(lifetime: time::Duration) -> (ClaimsResolver<MockValidator>, Arc<MockValidator>) {
        let cache = Arc::new(ClaimsCache::new(Duration::from_secs(300)));
        let validator = Arc::new(MockValidator::new(lifetime));
        (ClaimsResolver::new(cache, Arc::clone(&validator)), validator)
    }

    // -------------------------------------------------------------------------
    // Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (resolver, validator) = resolver(time::Duration::hours(1));

        let first = resolver.resolve("token-1").await.unwrap();
        let second = resolver.resolve("token-1").await.unwrap();

        assert_eq!(first["sub"], json!("user-of-token-1"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(validator.calls(), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_not_cached() {
        let (resolver, validator) = resolver(time::Duration::hours(1));

        for _ in 0..2 {
            let err = resolver.resolve("bad-token").await.unwrap_err();
            assert!(matches!(err, ResolveError::Validation { .. }));
        }

        assert_eq!(validator.calls(), 2);
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_empty_credential() {
        let (resolver, validator) = resolver(time::Duration::hours(1));

        let err = resolver.resolve("").await.unwrap_err();
        assert!(matches!(err, ResolveError::EmptyCredential));
        assert_eq!(validator.calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_validation_result_not_cached() {
        let (resolver, validator) = resolver(time::Duration::seconds(-5));

        let claims = resolver.resolve("token-2").await.unwrap();
        assert_eq!(claims["sub"], json!("user-of-token-2"));
        assert!(resolver.cache().is_empty());

        resolver.resolve("token-2").await.unwrap();
        assert_eq!(validator.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_revalidation() {
        let (resolver, validator) = resolver(time::Duration::hours(1));

        resolver.resolve("token-3").await.unwrap();
        assert!(resolver.invalidate("token-3"));
        resolver.resolve("token-3").await.unwrap();

        assert_eq!(validator.calls(), 2);
    }

    #[test]
    fn test_validated_from_unix() {
        let validated = ValidatedCredential::from_unix((), 1_700_000_000).unwrap();
        assert_eq!(validated.expires_at.unix_timestamp(), 1_700_000_000);

        assert!(ValidatedCredential::from_unix((), i64::MAX).is_err());
    }
}
