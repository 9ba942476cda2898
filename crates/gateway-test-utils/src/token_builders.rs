//! Builder patterns for test data construction
//!
//! Provides a fluent API for creating signed test tokens.

use crate::crypto_fixtures::TestKeypair;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for signed test JWTs
///
/// Defaults: no subject, no roles, no audience, issued now, expiring in one
/// hour.
///
/// # Example
/// ```rust,ignore
/// let keypair = TestKeypair::new(1, "key-01");
/// let token = TestTokenBuilder::new()
///     .subject("alice")
///     .roles(&["Editor"])
///     .audience("api://tapestry")
///     .sign(&keypair);
/// ```
pub struct TestTokenBuilder {
    sub: Option<String>,
    roles: Vec<String>,
    aud: Option<Value>,
    legacy_audience: Option<String>,
    exp: i64,
    iat: i64,
    nbf: Option<i64>,
    kid: Option<String>,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: None,
            roles: Vec::new(),
            aud: None,
            legacy_audience: None,
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            nbf: None,
            kid: None,
            extra: Map::new(),
        }
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.sub = Some(subject.to_string());
        self
    }

    /// Set the `roles` claim. An empty slice leaves the claim out.
    pub fn roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Set `aud` as a single string
    pub fn audience(mut self, aud: &str) -> Self {
        self.aud = Some(json!(aud));
        self
    }

    /// Set `aud` as an array
    pub fn audiences(mut self, auds: &[&str]) -> Self {
        self.aud = Some(json!(auds));
        self
    }

    /// Set the legacy `audience` claim instead of `aud`
    pub fn legacy_audience(mut self, aud: &str) -> Self {
        self.legacy_audience = Some(aud.to_string());
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in_secs(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set not-before in seconds from now
    pub fn not_before_in_secs(mut self, seconds: i64) -> Self {
        self.nbf = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Set issued-at in seconds from now
    pub fn issued_in_secs(mut self, seconds: i64) -> Self {
        self.iat = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Override the header `kid` (defaults to the signing key's kid)
    pub fn kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    /// Add an arbitrary extra claim
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(&self) -> Value {
        let mut claims = self.extra.clone();
        claims.insert("exp".to_string(), json!(self.exp));
        claims.insert("iat".to_string(), json!(self.iat));
        if let Some(sub) = &self.sub {
            claims.insert("sub".to_string(), json!(sub));
        }
        if let Some(nbf) = self.nbf {
            claims.insert("nbf".to_string(), json!(nbf));
        }
        if let Some(aud) = &self.aud {
            claims.insert("aud".to_string(), aud.clone());
        }
        if let Some(aud) = &self.legacy_audience {
            claims.insert("audience".to_string(), json!(aud));
        }
        if !self.roles.is_empty() {
            claims.insert("roles".to_string(), json!(self.roles));
        }
        Value::Object(claims)
    }

    /// Sign with `keypair` using EdDSA
    pub fn sign(self, keypair: &TestKeypair) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.kid.clone().unwrap_or_else(|| keypair.kid().to_string()));

        let encoding_key = EncodingKey::from_ed_der(keypair.private_key_pkcs8());
        encode(&header, &self.build(), &encoding_key).expect("Failed to sign test token")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
