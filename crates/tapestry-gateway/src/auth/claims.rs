//! JWT claims structure.
//!
//! Holds the verified claim set. `aud` may arrive as a single string or an
//! array depending on the issuer; both shapes deserialize into [`Audience`].
//! Every claim not modelled here is kept in `extra` so handlers see the
//! original claim set. `sub` is redacted in Debug output.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Audience claim in either of its wire shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Audience values; a single string is treated as a one-element list.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Audience::Single(aud) => vec![aud.as_str()],
            Audience::Multiple(auds) => auds.iter().map(String::as_str).collect(),
        }
    }
}

/// Claims of a verified bearer token.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Standard audience claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Non-standard audience claim emitted by some older issuers.
    #[serde(
        default,
        rename = "audience",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_audience: Option<Audience>,

    /// Application roles assigned to the caller.
    ///
    /// `null` or a non-list shape means no roles; a bare string is one role.
    #[serde(
        default,
        deserialize_with = "deserialize_roles",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub roles: Vec<String>,

    /// All other claims, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Lenient `roles` decoding.
///
/// Role shape never fails decoding of an otherwise verified token, since
/// that would surface as a signature failure at every key source. Unusable
/// shapes grant nothing.
fn deserialize_roles<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let roles = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(role)) => vec![role],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(role) => Some(role),
                _ => None,
            })
            .collect(),
        Some(other) => {
            tracing::debug!(target: "tg.auth.claims", shape = %value_kind(&other), "Ignoring roles claim with unsupported shape");
            Vec::new()
        }
        None => Vec::new(),
    };
    Ok(roles)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Custom Debug implementation that redacts `sub` and only lists the keys
/// of pass-through claims (they may hold names or email addresses).
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("exp", &self.exp)
            .field("nbf", &self.nbf)
            .field("iat", &self.iat)
            .field("aud", &self.aud)
            .field("audience", &self.legacy_audience)
            .field("roles", &self.roles)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Claims {
    /// Audience values to check: `aud` when present, else `audience`.
    ///
    /// A present but empty `aud` array does not fall back.
    pub fn audiences(&self) -> Vec<&str> {
        self.aud
            .as_ref()
            .or(self.legacy_audience.as_ref())
            .map(Audience::values)
            .unwrap_or_default()
    }

    /// Role set derived from the `roles` claim. Empty when absent.
    pub fn role_set(&self) -> BTreeSet<String> {
        self.roles.iter().cloned().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Claims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_string_aud_is_singleton() {
        let claims = parse(json!({"exp": 1, "aud": "api://tapestry"}));
        assert_eq!(claims.audiences(), vec!["api://tapestry"]);
    }

    #[test]
    fn test_array_aud() {
        let claims = parse(json!({"exp": 1, "aud": ["a", "b"]}));
        assert_eq!(claims.audiences(), vec!["a", "b"]);
    }

    #[test]
    fn test_legacy_audience_used_only_when_aud_absent() {
        let fallback = parse(json!({"exp": 1, "audience": "legacy"}));
        assert_eq!(fallback.audiences(), vec!["legacy"]);

        let both = parse(json!({"exp": 1, "aud": "std", "audience": "legacy"}));
        assert_eq!(both.audiences(), vec!["std"]);
    }

    #[test]
    fn test_no_audience_claims() {
        let claims = parse(json!({"exp": 1}));
        assert!(claims.audiences().is_empty());
    }

    #[test]
    fn test_empty_aud_array_does_not_fall_back() {
        let claims = parse(json!({"exp": 1, "aud": [], "audience": "legacy"}));
        assert!(claims.audiences().is_empty());
    }

    #[test]
    fn test_roles_absent_yields_empty_set() {
        let claims = parse(json!({"exp": 1}));
        assert!(claims.role_set().is_empty());
    }

    #[test]
    fn test_role_set_deduplicates() {
        let claims = parse(json!({"exp": 1, "roles": ["Editor", "Admin", "Editor"]}));
        assert_eq!(
            claims.role_set(),
            BTreeSet::from(["Admin".to_string(), "Editor".to_string()])
        );
    }

    #[test]
    fn test_unknown_claims_preserved() {
        let claims = parse(json!({
            "exp": 1,
            "tid": "tenant-a",
            "preferred_username": "weaver@example.com"
        }));
        assert_eq!(claims.extra.get("tid").unwrap(), "tenant-a");

        let round_trip = serde_json::to_value(&claims).unwrap();
        assert_eq!(round_trip["preferred_username"], "weaver@example.com");
    }

    #[test]
    fn test_debug_redacts_sub_and_extra_values() {
        let claims = parse(json!({
            "sub": "secret-user-id",
            "exp": 1,
            "email": "weaver@example.com"
        }));

        let debug_str = format!("{:?}", claims);

        assert!(!debug_str.contains("secret-user-id"));
        assert!(!debug_str.contains("weaver@example.com"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("email"));
    }

    #[test]
    fn test_roles_null_or_unsupported_shape_yields_empty_set() {
        for roles in [json!(null), json!(7), json!({"Admin": true})] {
            let claims = parse(json!({"exp": 1, "roles": roles}));
            assert!(claims.role_set().is_empty(), "roles {roles} should grant nothing");
        }
    }

    #[test]
    fn test_roles_single_string_is_one_role() {
        let claims = parse(json!({"exp": 1, "roles": "Editor"}));
        assert_eq!(claims.roles, vec!["Editor".to_string()]);
    }

    #[test]
    fn test_roles_array_skips_non_string_entries() {
        let claims = parse(json!({"exp": 1, "roles": ["Editor", 3, null, "Admin"]}));
        assert_eq!(claims.roles, vec!["Editor".to_string(), "Admin".to_string()]);
    }
}
