//! Mock key source endpoints
//!
//! Wraps a `wiremock` server that plays the identity authority. Paths follow
//! the discovery layout the gateway derives from `IDENTITY_AUTHORITY` and the
//! tenant, so pointing `IDENTITY_AUTHORITY` at [`MockJwksServer::uri`]
//! exercises the real key source resolution.

use crate::crypto_fixtures::{jwks_json, TestKeypair};
use std::collections::HashMap;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock identity authority serving JWKS documents.
pub struct MockJwksServer {
    server: MockServer,
}

impl MockJwksServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URI, usable as `IDENTITY_AUTHORITY`.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Candidate key source paths for `tenant`, in resolution order.
    pub fn discovery_paths(tenant: &str) -> Vec<String> {
        vec![
            format!("/{tenant}/discovery/v2.0/keys"),
            format!("/{tenant}/discovery/keys"),
            "/common/discovery/v2.0/keys".to_string(),
            "/common/discovery/keys".to_string(),
        ]
    }

    /// Primary (first) key source path for `tenant`.
    pub fn tenant_key_path(tenant: &str) -> String {
        format!("/{tenant}/discovery/v2.0/keys")
    }

    /// Serve a JWKS containing `keys` at `at_path`.
    pub async fn mount_keys(&self, at_path: &str, keys: &[&TestKeypair]) {
        Mock::given(method("GET"))
            .and(path(at_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json(keys)))
            .mount(&self.server)
            .await;
    }

    /// Serve a JWKS at `at_path` and require exactly `calls` fetches.
    ///
    /// Verified when the server is dropped.
    pub async fn mount_keys_expecting(&self, at_path: &str, keys: &[&TestKeypair], calls: u64) {
        Mock::given(method("GET"))
            .and(path(at_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json(keys)))
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// Respond with `status` and an empty body at `at_path`.
    pub async fn mount_status(&self, at_path: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(at_path))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Respond 200 with a raw body, for malformed documents.
    pub async fn mount_raw(&self, at_path: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(at_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Require that `at_path` is never fetched.
    pub async fn expect_untouched(&self, at_path: &str) {
        Mock::given(method("GET"))
            .and(path(at_path))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    /// Number of requests received for `at_path` so far.
    pub async fn request_count(&self, at_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == at_path)
            .count()
    }

    /// Minimal gateway configuration resolving key sources against this server.
    pub fn gateway_vars(&self, tenant: &str) -> HashMap<String, String> {
        HashMap::from([
            ("AZURE_AD_TENANT_ID".to_string(), tenant.to_string()),
            ("IDENTITY_AUTHORITY".to_string(), self.uri()),
            ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
        ])
    }
}
