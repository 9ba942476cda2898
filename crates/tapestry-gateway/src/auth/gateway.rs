//! Request authorization gateway.
//!
//! Runs the per-request pipeline, each step a hard short-circuit:
//!
//! ```text
//! Authorization header -> bearer token -> verify (key sources in order)
//!     -> audience check -> role extraction -> route role check -> Principal
//! ```
//!
//! Header, verification and audience failures are unauthenticated (401).
//! Only a verified caller lacking a required role is forbidden (403).

use crate::auth::key_sources::KeySources;
use crate::auth::policy::{AudiencePolicy, Principal, RoutePolicy};
use crate::auth::verifier::TokenVerifier;
use crate::config::Config;
use crate::errors::AuthError;
use crate::observability::metrics;
use axum::http::{header, HeaderMap};
use std::time::Instant;
use tracing::instrument;

/// Literal scheme prefix, case-sensitive with a single space.
const BEARER_PREFIX: &str = "Bearer ";

/// Authentication and authorization gateway shared by all protected routes.
pub struct AuthGateway {
    verifier: TokenVerifier,
    audience: AudiencePolicy,
}

impl AuthGateway {
    pub fn new(verifier: TokenVerifier, audience: AudiencePolicy) -> Self {
        Self { verifier, audience }
    }

    /// Build the gateway from process configuration.
    pub fn from_config(config: &Config) -> Self {
        let key_sources = KeySources::from_config(config);
        tracing::info!(
            target: "tg.auth.gateway",
            key_sources = ?key_sources.uris(),
            "Key sources configured"
        );

        let audience = AudiencePolicy::from_config(config);
        if !audience.is_enforced() {
            tracing::warn!(target: "tg.auth.gateway", "No accepted audience configured, audience checks disabled");
        }

        Self::new(TokenVerifier::from_config(&key_sources, config), audience)
    }

    pub fn key_source_count(&self) -> usize {
        self.verifier.source_count()
    }

    /// Authenticate the request and apply `policy`.
    #[instrument(skip_all, name = "tg.auth.authorize")]
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        policy: &RoutePolicy,
    ) -> Result<Principal, AuthError> {
        let start = Instant::now();
        let result = self.run(headers, policy).await;

        let outcome = match &result {
            Ok(_) => "authorized",
            Err(e) => e.outcome(),
        };
        metrics::record_auth_decision(outcome, start.elapsed());

        result
    }

    async fn run(&self, headers: &HeaderMap, policy: &RoutePolicy) -> Result<Principal, AuthError> {
        let token = extract_bearer_token(headers)?;

        let claims = self.verifier.verify(token).await?;

        if !self.audience.accepts(&claims) {
            tracing::debug!(target: "tg.auth.gateway", "Token audience not accepted");
            return Err(AuthError::AudienceRejected);
        }

        let principal = Principal::from_verified(claims);

        if !policy.permits(&principal.roles) {
            tracing::debug!(
                target: "tg.auth.gateway",
                required = ?policy.required_roles(),
                held = ?principal.roles,
                "Caller lacks required role"
            );
            return Err(AuthError::InsufficientRole);
        }

        Ok(principal)
    }
}

/// Extract the bearer token from the `Authorization` header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "tg.auth.gateway", "Missing Authorization header");
            AuthError::NoCredential("Missing Authorization header".to_string())
        })?;

    auth_header.strip_prefix(BEARER_PREFIX).ok_or_else(|| {
        tracing::debug!(target: "tg.auth.gateway", "Invalid Authorization header format");
        AuthError::NoCredential("Invalid Authorization header format".to_string())
    })
}
