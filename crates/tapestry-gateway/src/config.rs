//! Gateway configuration.
//!
//! Configuration is loaded once from environment variables at process start
//! and handed to the gateway by reference. Nothing in the auth path reads the
//! environment directly.

use std::collections::{BTreeSet, HashMap};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default identity provider host used to build discovery URIs.
pub const DEFAULT_IDENTITY_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Default JWT clock skew tolerance (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Default JWKS cache TTL in seconds.
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;

/// Default per-source JWKS fetch timeout in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// Outer per-request timeout applied to every route.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Total time the key source chain may spend on one token.
///
/// Kept below `REQUEST_TIMEOUT` so a slow chain ends in a 401, never in the
/// router's timeout response.
pub const VERIFICATION_BUDGET: Duration = Duration::from_secs(25);

const _: () = assert!(VERIFICATION_BUDGET.as_secs() < REQUEST_TIMEOUT.as_secs());

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Roles granted access to the editor route group when `EDITOR_ROLES` is unset.
pub const DEFAULT_EDITOR_ROLES: &[&str] = &["Admin", "Editor"];

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Identity provider tenant identifier. May be empty.
    pub tenant_id: String,

    /// Explicit JWKS URI tried before any derived discovery URI.
    pub jwks_uri_override: Option<String>,

    /// Identity provider host, without trailing slash.
    pub identity_authority: String,

    /// Primary accepted audience (application ID URI).
    pub api_audience: Option<String>,

    /// Secondary accepted audience (client ID).
    pub api_client_id: Option<String>,

    /// Roles that may use the editor route group.
    pub editor_roles: BTreeSet<String>,

    /// Leeway applied to exp/nbf/iat checks.
    pub jwt_clock_skew: Duration,

    /// How long a fetched key set is trusted before refetching.
    pub jwks_cache_ttl: Duration,

    /// Upper bound on one key source attempt.
    pub jwks_fetch_timeout: Duration,

    /// How long to keep serving in-flight requests after a shutdown signal.
    pub drain_period: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidJwksCacheTtl(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidJwksFetchTimeout(String),

    #[error("Invalid editor roles configuration: {0}")]
    InvalidEditorRoles(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainPeriod(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let tenant_id = vars
            .get("AZURE_AD_TENANT_ID")
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        let identity_authority = non_empty(vars, "IDENTITY_AUTHORITY")
            .unwrap_or_else(|| DEFAULT_IDENTITY_AUTHORITY.to_string())
            .trim_end_matches('/')
            .to_string();

        let editor_roles = match vars.get("EDITOR_ROLES") {
            Some(raw) => {
                let roles: BTreeSet<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(ToString::to_string)
                    .collect();
                if roles.is_empty() {
                    return Err(ConfigError::InvalidEditorRoles(
                        "EDITOR_ROLES must name at least one role".to_string(),
                    ));
                }
                roles
            }
            None => DEFAULT_EDITOR_ROLES
                .iter()
                .map(|r| (*r).to_string())
                .collect(),
        };

        let skew_secs = parse_positive_secs(
            vars,
            "JWT_CLOCK_SKEW_SECONDS",
            DEFAULT_CLOCK_SKEW.as_secs(),
            ConfigError::InvalidJwtClockSkew,
        )?;
        if skew_secs > MAX_CLOCK_SKEW.as_secs() {
            return Err(ConfigError::InvalidJwtClockSkew(format!(
                "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                MAX_CLOCK_SKEW.as_secs(),
                skew_secs
            )));
        }

        let cache_ttl_secs = parse_positive_secs(
            vars,
            "JWKS_CACHE_TTL_SECONDS",
            DEFAULT_JWKS_CACHE_TTL_SECONDS,
            ConfigError::InvalidJwksCacheTtl,
        )?;

        let fetch_timeout_secs = parse_positive_secs(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS,
            ConfigError::InvalidJwksFetchTimeout,
        )?;

        // Zero is allowed and skips the drain
        let drain_secs = match vars.get("GATEWAY_DRAIN_SECONDS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidDrainPeriod(format!(
                    "GATEWAY_DRAIN_SECONDS must be a non-negative integer, got '{}': {}",
                    raw, e
                ))
            })?,
            None => DEFAULT_DRAIN_SECONDS,
        };

        Ok(Config {
            bind_address,
            tenant_id,
            jwks_uri_override: non_empty(vars, "JWKS_URI"),
            identity_authority,
            api_audience: non_empty(vars, "API_AUDIENCE"),
            api_client_id: non_empty(vars, "API_CLIENT_ID"),
            editor_roles,
            jwt_clock_skew: Duration::from_secs(skew_secs),
            jwks_cache_ttl: Duration::from_secs(cache_ttl_secs),
            jwks_fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            drain_period: Duration::from_secs(drain_secs),
        })
    }
}

/// Read a variable, treating blank values as unset.
fn non_empty(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn parse_positive_secs(
    vars: &HashMap<String, String>,
    key: &str,
    default: u64,
    err: fn(String) -> ConfigError,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(key) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        err(format!(
            "{} must be a valid positive integer, got '{}': {}",
            key, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(err(format!("{} must be greater than 0", key)));
    }

    Ok(value)
}
