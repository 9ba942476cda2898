//! Candidate JWKS endpoints.
//!
//! The identity provider's tenant layout and discovery API version have
//! changed over time, so several known URI shapes are tried in a fixed order:
//! explicit override, tenant-specific (v2 then v1), multi-tenant "common"
//! (v2 then v1).

use crate::config::Config;

/// Ordered, deduplicated list of JWKS URIs. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySources {
    uris: Vec<String>,
}

impl KeySources {
    /// Build the candidate list.
    ///
    /// An absent or blank override shortens the list. An empty tenant still
    /// yields tenant URIs; they simply fail at verification time.
    pub fn resolve(override_uri: Option<&str>, authority: &str, tenant_id: &str) -> Self {
        let authority = authority.trim_end_matches('/');

        let candidates = [
            override_uri.map(ToString::to_string),
            Some(format!("{authority}/{tenant_id}/discovery/v2.0/keys")),
            Some(format!("{authority}/{tenant_id}/discovery/keys")),
            Some(format!("{authority}/common/discovery/v2.0/keys")),
            Some(format!("{authority}/common/discovery/keys")),
        ];

        let mut uris: Vec<String> = Vec::with_capacity(candidates.len());
        for uri in candidates.into_iter().flatten() {
            let uri = uri.trim().to_string();
            if uri.is_empty() || uris.contains(&uri) {
                continue;
            }
            uris.push(uri);
        }

        tracing::debug!(target: "tg.auth.key_sources", count = uris.len(), "Key sources resolved");

        Self { uris }
    }

    /// Build the candidate list from process configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::resolve(
            config.jwks_uri_override.as_deref(),
            &config.identity_authority,
            &config.tenant_id,
        )
    }

    /// URIs in the order they must be tried.
    pub fn uris(&self) -> &[String] {
        &self.uris
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }
}
