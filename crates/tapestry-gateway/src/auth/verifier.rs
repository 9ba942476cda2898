//! Token verification across the ordered key sources.
//!
//! Sources are tried strictly in order. The first source that yields a
//! cryptographically valid, unexpired token wins and later sources are not
//! contacted. If every source fails, the error of the *last* source tried is
//! reported.
//!
//! The whole chain runs under one deadline. When it expires the source in
//! flight is reported as timed out and later sources are not tried.

use crate::auth::claims::Claims;
use crate::auth::jwks::{JwksClient, JwksProvider};
use crate::auth::key_sources::KeySources;
use crate::auth::token::{extract_kid, verify_with_key};
use crate::config::{Config, VERIFICATION_BUDGET};
use crate::errors::{AuthError, KeySourceError};
use crate::observability::metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::instrument;

/// JWT verifier over an ordered list of key sources.
pub struct TokenVerifier {
    /// Key sources in the order they are tried.
    sources: Vec<Arc<dyn JwksProvider>>,

    /// Leeway for exp/nbf/iat.
    clock_skew: Duration,

    /// Upper bound on one source attempt.
    fetch_timeout: Duration,

    /// Upper bound on the whole chain for one token.
    budget: Duration,
}

impl TokenVerifier {
    /// Create a verifier over explicit providers.
    pub fn new(
        sources: Vec<Arc<dyn JwksProvider>>,
        clock_skew: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            sources,
            clock_skew,
            fetch_timeout,
            budget: VERIFICATION_BUDGET,
        }
    }

    /// Override the total verification deadline.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Create a verifier with one cached JWKS client per resolved key source.
    pub fn from_config(key_sources: &KeySources, config: &Config) -> Self {
        let sources = key_sources
            .uris()
            .iter()
            .map(|uri| {
                Arc::new(JwksClient::with_settings(
                    uri.clone(),
                    config.jwks_cache_ttl,
                    config.jwks_fetch_timeout,
                )) as Arc<dyn JwksProvider>
            })
            .collect();

        Self::new(sources, config.jwt_clock_skew, config.jwks_fetch_timeout)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Verify a bearer token and return its claims.
    ///
    /// # Errors
    ///
    /// - `AuthError::NoCredential` if the token is structurally unusable
    ///   (no key source is contacted)
    /// - `AuthError::VerificationExhausted` carrying the last source's error
    ///   if no source verified the token
    /// - `AuthError::Internal` if no key sources are configured
    ///
    /// The last-source diagnostic only applies once a token reaches the key
    /// sources. Oversized or structurally malformed tokens, including tokens
    /// without a `kid`, fail as `NoCredential` before any source is tried.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let kid = extract_kid(token).map_err(|e| {
            tracing::debug!(target: "tg.auth.verifier", error = %e, "Token rejected before key lookup");
            AuthError::NoCredential(e.to_string())
        })?;

        let deadline = Instant::now() + self.budget;
        let mut last_failure: Option<(&str, KeySourceError)> = None;

        for (position, source) in self.sources.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(
                    target: "tg.auth.verifier",
                    position = position,
                    "Verification deadline reached, remaining key sources skipped"
                );
                break;
            }

            let attempt_timeout = self.fetch_timeout.min(remaining);
            match self
                .try_source(source.as_ref(), token, &kid, attempt_timeout)
                .await
            {
                Ok(claims) => {
                    tracing::debug!(
                        target: "tg.auth.verifier",
                        position = position,
                        source = %source.uri(),
                        "Token verified"
                    );
                    metrics::record_key_source_hit(position);
                    return Ok(claims);
                }
                Err(error) => {
                    tracing::debug!(
                        target: "tg.auth.verifier",
                        position = position,
                        source = %source.uri(),
                        error = %error,
                        "Key source could not verify token"
                    );
                    last_failure = Some((source.uri(), error));
                }
            }
        }

        match last_failure {
            Some((source_uri, error)) => {
                tracing::warn!(
                    target: "tg.auth.verifier",
                    source = %source_uri,
                    error = %error,
                    sources_tried = self.sources.len(),
                    "All key sources failed"
                );
                Err(AuthError::VerificationExhausted {
                    source_uri: source_uri.to_string(),
                    error,
                })
            }
            None => Err(AuthError::Internal("no key sources configured".to_string())),
        }
    }

    /// One attempt against one source. No retries.
    async fn try_source(
        &self,
        source: &dyn JwksProvider,
        token: &str,
        kid: &str,
        attempt_timeout: Duration,
    ) -> Result<Claims, KeySourceError> {
        let jwk = tokio::time::timeout(attempt_timeout, source.get_key(kid))
            .await
            .map_err(|_| KeySourceError::TimedOut)??;

        verify_with_key(token, &jwk, self.clock_skew)
    }
}
