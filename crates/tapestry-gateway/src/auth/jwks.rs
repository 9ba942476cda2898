//! JWKS client for fetching and caching public keys from one key source.
//!
//! One `JwksClient` is bound to one URI, so the key-set cache is keyed by
//! source URI. The cache is shared by all in-flight requests.
//!
//! - Keys are cached for a configurable TTL to pick up rotations
//! - Refreshes are serialised per source; concurrent cold-cache callers wait
//!   for the first fetch instead of each hitting the network
//! - An unknown `kid` against a fresh cache triggers one refresh, at most
//!   once per `MIN_REFRESH_INTERVAL`

use crate::errors::KeySourceError;
use crate::observability::metrics;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Default HTTP timeout for a single fetch.
const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// Minimum age of a cached key set before an unknown `kid` forces a refetch.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// JSON Web Key from a JWKS document.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type ("RSA" or "OKP").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Curve name for OKP keys ("Ed25519").
    #[serde(default)]
    pub crv: Option<String>,

    /// OKP public key value (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm the key is meant for.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use ("sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

/// A source of verification keys, addressed by key ID.
///
/// Implemented by [`JwksClient`] for real endpoints and by
/// [`mock::MockJwksProvider`] in tests.
#[async_trait::async_trait]
pub trait JwksProvider: Send + Sync {
    /// URI identifying this source (used in diagnostics).
    fn uri(&self) -> &str;

    /// Look up a key by ID, fetching the key set if needed.
    async fn get_key(&self, kid: &str) -> Result<Jwk, KeySourceError>;
}

/// Cached JWKS data with fetch time.
struct CachedJwks {
    /// Map of key ID to JWK.
    keys: HashMap<String, Jwk>,

    /// When this key set was fetched.
    fetched_at: Instant,
}

/// JWKS client bound to a single key source URI.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Cached JWKS data.
    cache: RwLock<Option<CachedJwks>>,

    /// Serialises refreshes for this source.
    refresh_lock: Mutex<()>,

    /// Cache TTL duration.
    cache_ttl: Duration,
}

impl JwksClient {
    /// Create a new JWKS client with default TTL and fetch timeout.
    pub fn new(jwks_url: String) -> Self {
        Self::with_settings(
            jwks_url,
            Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS),
        )
    }

    /// Create a new JWKS client.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL of the JWKS endpoint
    /// * `cache_ttl` - How long to cache JWKS before refreshing
    /// * `fetch_timeout` - HTTP timeout for one fetch
    pub fn with_settings(jwks_url: String, cache_ttl: Duration, fetch_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "tg.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            cache_ttl,
        }
    }

    async fn fetched_at(&self) -> Option<Instant> {
        self.cache.read().await.as_ref().map(|c| c.fetched_at)
    }

    /// Refresh the cache unless another caller refreshed it while we waited
    /// for the refresh lock. `seen` is the fetch time the caller observed.
    async fn refresh_if_unchanged(&self, seen: Option<Instant>) -> Result<(), KeySourceError> {
        let _guard = self.refresh_lock.lock().await;

        if self.fetched_at().await != seen {
            tracing::debug!(target: "tg.auth.jwks", url = %self.jwks_url, "JWKS refreshed by concurrent caller");
            return Ok(());
        }

        self.refresh_cache().await
    }

    /// Refresh the JWKS cache by fetching from the key source.
    #[instrument(skip_all, fields(url = %self.jwks_url))]
    async fn refresh_cache(&self) -> Result<(), KeySourceError> {
        tracing::debug!(target: "tg.auth.jwks", url = %self.jwks_url, "Fetching JWKS");
        let start = Instant::now();

        let result = self.fetch().await;
        metrics::record_jwks_fetch(
            if result.is_ok() { "success" } else { "error" },
            start.elapsed(),
        );
        let keys = result?;

        tracing::info!(
            target: "tg.auth.jwks",
            url = %self.jwks_url,
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys,
            fetched_at: Instant::now(),
        });

        Ok(())
    }

    async fn fetch(&self) -> Result<HashMap<String, Jwk>, KeySourceError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(target: "tg.auth.jwks", url = %self.jwks_url, error = %e, "Failed to fetch JWKS");
                if e.is_timeout() {
                    KeySourceError::TimedOut
                } else {
                    KeySourceError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                target: "tg.auth.jwks",
                url = %self.jwks_url,
                status = %status,
                "JWKS endpoint returned error"
            );
            return Err(KeySourceError::UnexpectedStatus(status.as_u16()));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::warn!(target: "tg.auth.jwks", url = %self.jwks_url, error = %e, "Failed to parse JWKS response");
            KeySourceError::InvalidDocument(e.to_string())
        })?;

        // Keys without a kid cannot be selected and are skipped
        Ok(jwks
            .keys
            .into_iter()
            .filter_map(|key| key.kid.clone().map(|kid| (kid, key)))
            .collect())
    }

    /// Clear the cache.
    #[cfg(test)]
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}

#[async_trait::async_trait]
impl JwksProvider for JwksClient {
    fn uri(&self) -> &str {
        &self.jwks_url
    }

    #[instrument(skip(self), fields(kid = %kid))]
    async fn get_key(&self, kid: &str) -> Result<Jwk, KeySourceError> {
        let seen = {
            let cache = self.cache.read().await;
            match cache.as_ref() {
                Some(cached) if cached.fetched_at.elapsed() < self.cache_ttl => {
                    if let Some(key) = cached.keys.get(kid) {
                        tracing::debug!(target: "tg.auth.jwks", kid = %kid, "JWKS cache hit");
                        return Ok(key.clone());
                    }
                    // Fresh cache without the key: only refetch if the key set
                    // is old enough that a rotation may have happened since.
                    if cached.fetched_at.elapsed() < MIN_REFRESH_INTERVAL {
                        tracing::debug!(target: "tg.auth.jwks", kid = %kid, "Key not found in recent JWKS cache");
                        return Err(KeySourceError::UnknownKeyId(kid.to_string()));
                    }
                    Some(cached.fetched_at)
                }
                Some(cached) => Some(cached.fetched_at),
                None => None,
            }
        };

        self.refresh_if_unchanged(seen).await?;

        let cache = self.cache.read().await;
        if let Some(key) = cache.as_ref().and_then(|c| c.keys.get(kid)) {
            return Ok(key.clone());
        }

        tracing::debug!(target: "tg.auth.jwks", kid = %kid, url = %self.jwks_url, "Key not found in JWKS after refresh");
        Err(KeySourceError::UnknownKeyId(kid.to_string()))
    }
}

/// Mock JWKS provider module for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Serve(HashMap<String, Jwk>),
        Fail(KeySourceError),
        Hang(Duration),
    }

    /// Mock key source with call counting.
    pub struct MockJwksProvider {
        uri: String,
        behavior: Behavior,
        call_count: AtomicUsize,
    }

    impl MockJwksProvider {
        /// Serve the given keys.
        pub fn serving(uri: &str, keys: Vec<Jwk>) -> Self {
            let keys = keys
                .into_iter()
                .filter_map(|k| k.kid.clone().map(|kid| (kid, k)))
                .collect();
            Self::with_behavior(uri, Behavior::Serve(keys))
        }

        /// Fail every lookup with `error`.
        pub fn failing(uri: &str, error: KeySourceError) -> Self {
            Self::with_behavior(uri, Behavior::Fail(error))
        }

        /// Sleep for `delay` before failing as unavailable.
        pub fn hanging(uri: &str, delay: Duration) -> Self {
            Self::with_behavior(uri, Behavior::Hang(delay))
        }

        fn with_behavior(uri: &str, behavior: Behavior) -> Self {
            Self {
                uri: uri.to_string(),
                behavior,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Get the number of lookups made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl JwksProvider for MockJwksProvider {
        fn uri(&self) -> &str {
            &self.uri
        }

        async fn get_key(&self, kid: &str) -> Result<Jwk, KeySourceError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            match &self.behavior {
                Behavior::Serve(keys) => keys
                    .get(kid)
                    .cloned()
                    .ok_or_else(|| KeySourceError::UnknownKeyId(kid.to_string())),
                Behavior::Fail(error) => Err(error.clone()),
                Behavior::Hang(delay) => {
                    tokio::time::sleep(*delay).await;
                    Err(KeySourceError::Unavailable("mock hang elapsed".to_string()))
                }
            }
        }
    }
}
