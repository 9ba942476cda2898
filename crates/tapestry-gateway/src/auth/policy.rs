//! Audience and role policies, and the authenticated principal.

use crate::auth::claims::Claims;
use crate::config::Config;
use std::collections::BTreeSet;

/// Accepted token audiences.
///
/// An empty set means audience restriction is not configured and every
/// verified token passes, including tokens without any audience claim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudiencePolicy {
    accepted: BTreeSet<String>,
}

impl AudiencePolicy {
    /// Build from a primary audience URI and an optional client ID.
    pub fn new(primary: Option<&str>, secondary: Option<&str>) -> Self {
        let accepted = [primary, secondary]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|aud| !aud.is_empty())
            .map(ToString::to_string)
            .collect();
        Self { accepted }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_audience.as_deref(),
            config.api_client_id.as_deref(),
        )
    }

    /// Whether any audience restriction is configured.
    pub fn is_enforced(&self) -> bool {
        !self.accepted.is_empty()
    }

    /// Check a verified claim set against the accepted audiences.
    pub fn accepts(&self, claims: &Claims) -> bool {
        if !self.is_enforced() {
            return true;
        }
        claims
            .audiences()
            .iter()
            .any(|aud| self.accepted.contains(*aud))
    }
}

/// Roles a route requires; the caller needs at least one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePolicy {
    required_roles: BTreeSet<String>,
}

impl RoutePolicy {
    /// Any authenticated caller, with or without roles.
    pub fn any_authenticated() -> Self {
        Self::default()
    }

    /// Caller must hold at least one of `roles`.
    pub fn require_any_of<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn required_roles(&self) -> &BTreeSet<String> {
        &self.required_roles
    }

    /// Empty policy permits everyone; otherwise the sets must intersect.
    pub fn permits(&self, roles: &BTreeSet<String>) -> bool {
        self.required_roles.is_empty() || !self.required_roles.is_disjoint(roles)
    }
}

/// Authenticated caller for the lifetime of one request.
///
/// Only constructed after signature, expiry and audience checks pass.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Verified claim set.
    pub claims: Claims,

    /// Roles derived from the `roles` claim.
    pub roles: BTreeSet<String>,
}

impl Principal {
    pub(crate) fn from_verified(claims: Claims) -> Self {
        let roles = claims.role_set();
        Self { claims, roles }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims.sub.as_deref()
    }
}
