//! Authentication and authorization integration tests.
//!
//! Runs the real router against a mocked identity authority.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use gateway_test_utils::{MockJwksServer, TestGatewayServer, TestKeypair, TestTokenBuilder};
use std::collections::HashMap;

const TENANT: &str = "tenant-a";

struct TestAuthServer {
    // Held so wiremock expectations are verified when the test ends
    jwks: MockJwksServer,
    server: TestGatewayServer,
    keypair: TestKeypair,
    client: reqwest::Client,
}

impl TestAuthServer {
    /// Gateway whose primary key source serves `key-01`.
    async fn spawn() -> Result<Self> {
        Self::spawn_with(HashMap::new()).await
    }

    async fn spawn_with(extra_vars: HashMap<String, String>) -> Result<Self> {
        let jwks = MockJwksServer::start().await;
        let keypair = TestKeypair::new(1, "key-01");
        jwks.mount_keys(&MockJwksServer::tenant_key_path(TENANT), &[&keypair])
            .await;

        let mut vars = jwks.gateway_vars(TENANT);
        vars.extend(extra_vars);
        let server = TestGatewayServer::spawn(vars).await?;

        Ok(Self {
            jwks,
            server,
            keypair,
            client: reqwest::Client::new(),
        })
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Result<reqwest::Response> {
        let mut request = self.client.get(format!("{}{}", self.server.url(), path));
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        Ok(request.send().await?)
    }

    async fn fetch_count(&self) -> usize {
        let mut total = 0;
        for path in MockJwksServer::discovery_paths(TENANT) {
            total += self.jwks.request_count(&path).await;
        }
        total
    }
}

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// =============================================================================
// Public endpoints
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_is_public() -> Result<()> {
    let server = TestAuthServer::spawn().await?;

    let response = server.get("/v1/health", None).await?;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["key_sources"], 4);
    assert_eq!(server.fetch_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<()> {
    let server = TestAuthServer::spawn().await?;

    let response = server.get("/metrics", None).await?;

    assert_eq!(response.status(), 200);
    Ok(())
}

// =============================================================================
// Credential extraction
// =============================================================================

#[tokio::test]
async fn test_missing_header_is_401_with_empty_body() -> Result<()> {
    let server = TestAuthServer::spawn().await?;

    let response = server.get("/v1/me", None).await?;

    assert_eq!(response.status(), 401);
    let www_auth = response
        .headers()
        .get("www-authenticate")
        .expect("Should include WWW-Authenticate header")
        .to_str()?
        .to_string();
    assert!(www_auth.starts_with("Bearer"));
    assert!(response.text().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_wrong_scheme_rejected_without_fetch() -> Result<()> {
    let server = TestAuthServer::spawn().await?;

    for value in ["Token abc123", "Basic abc123", "bearer abc123"] {
        let response = server
            .client
            .get(format!("{}/v1/me", server.server.url()))
            .header("Authorization", value)
            .send()
            .await?;

        assert_eq!(response.status(), 401, "expected 401 for {value:?}");
    }
    assert_eq!(server.fetch_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_malformed_token_rejected_without_fetch() -> Result<()> {
    let server = TestAuthServer::spawn().await?;

    let response = server.get("/v1/me", Some("not-a-jwt")).await?;

    assert_eq!(response.status(), 401);
    assert_eq!(server.fetch_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_oversized_token_rejected_without_fetch() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let oversized = "a".repeat(8193);

    let response = server.get("/v1/me", Some(&oversized)).await?;

    assert_eq!(response.status(), 401);
    assert_eq!(server.fetch_count().await, 0);

    Ok(())
}

// =============================================================================
// Verification
// =============================================================================

#[tokio::test]
async fn test_me_with_valid_token() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let token = TestTokenBuilder::new()
        .subject("user-1")
        .roles(&["Viewer"])
        .audience("api://tapestry")
        .sign(&server.keypair);

    let response = server.get("/v1/me", Some(&token)).await?;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["sub"], "user-1");
    assert_eq!(body["roles"], serde_json::json!(["Viewer"]));
    assert_eq!(body["aud"], serde_json::json!(["api://tapestry"]));

    Ok(())
}

#[tokio::test]
async fn test_expired_token_rejected() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let token = TestTokenBuilder::new()
        .expires_in_secs(-3600)
        .sign(&server.keypair);

    let response = server.get("/v1/me", Some(&token)).await?;

    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn test_expiry_within_clock_skew_accepted() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let token = TestTokenBuilder::new()
        .expires_in_secs(-60)
        .sign(&server.keypair);

    let response = server.get("/v1/me", Some(&token)).await?;

    assert_eq!(response.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_unknown_kid_rejected() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let stranger = TestKeypair::new(9, "key-99");
    let token = TestTokenBuilder::new().sign(&stranger);

    let response = server.get("/v1/me", Some(&token)).await?;

    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn test_rotated_key_with_same_kid_rejected() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let rotated = TestKeypair::new(2, "key-01");
    let token = TestTokenBuilder::new().sign(&rotated);

    let response = server.get("/v1/me", Some(&token)).await?;

    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn test_token_with_alg_none_rejected() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let now = Utc::now().timestamp();
    let header = r#"{"alg":"none","typ":"JWT","kid":"key-01"}"#;
    let claims = format!(r#"{{"sub":"attacker","exp":{},"roles":["Admin"]}}"#, now + 3600);
    let token = format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(claims)
    );

    let response = server.get("/v1/editor/session", Some(&token)).await?;

    assert_eq!(response.status(), 401);
    assert_eq!(server.fetch_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_token_with_alg_hs256_rejected() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let now = Utc::now().timestamp();
    let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256);
    header.kid = Some("key-01".to_string());
    let claims = serde_json::json!({"sub": "attacker", "exp": now + 3600, "roles": ["Admin"]});

    // HMAC keyed with the published public key material
    let public_x = server.keypair.jwk_json()["x"].as_str().unwrap().to_string();
    let token = jsonwebtoken::encode(
        &header,
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(public_x.as_bytes()),
    )?;

    let response = server.get("/v1/editor/session", Some(&token)).await?;

    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_cold_requests_fetch_keys_once() -> Result<()> {
    let jwks = MockJwksServer::start().await;
    let keypair = TestKeypair::new(1, "key-01");
    jwks.mount_keys_expecting(&MockJwksServer::tenant_key_path(TENANT), &[&keypair], 1)
        .await;
    let server = TestGatewayServer::spawn(jwks.gateway_vars(TENANT)).await?;
    let client = reqwest::Client::new();
    let token = TestTokenBuilder::new().sign(&keypair);

    let requests = (0..8).map(|_| {
        client
            .get(format!("{}/v1/me", server.url()))
            .bearer_auth(&token)
            .send()
    });
    for response in futures::future::join_all(requests).await {
        assert_eq!(response?.status(), 200);
    }

    Ok(())
}

// =============================================================================
// Audience
// =============================================================================

#[tokio::test]
async fn test_no_audience_configured_accepts_token_without_aud() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let token = TestTokenBuilder::new()
        .roles(&["Editor"])
        .sign(&server.keypair);

    let response = server.get("/v1/editor/session", Some(&token)).await?;

    assert_eq!(response.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_wrong_audience_rejected_as_unauthenticated() -> Result<()> {
    let server = TestAuthServer::spawn_with(vars(&[("API_AUDIENCE", "expected-aud")])).await?;
    let token = TestTokenBuilder::new()
        .audience("wrong-aud")
        .roles(&["Admin"])
        .sign(&server.keypair);

    let response = server.get("/v1/editor/session", Some(&token)).await?;

    assert_eq!(response.status(), 401);
    assert!(response.text().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_array_audience_matching_client_id_accepted() -> Result<()> {
    let server = TestAuthServer::spawn_with(vars(&[
        ("API_AUDIENCE", "api://tapestry"),
        ("API_CLIENT_ID", "client-123"),
    ]))
    .await?;
    let token = TestTokenBuilder::new()
        .audiences(&["unrelated", "client-123"])
        .sign(&server.keypair);

    let response = server.get("/v1/me", Some(&token)).await?;

    assert_eq!(response.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_legacy_audience_claim_accepted() -> Result<()> {
    let server = TestAuthServer::spawn_with(vars(&[("API_AUDIENCE", "api://tapestry")])).await?;
    let token = TestTokenBuilder::new()
        .legacy_audience("api://tapestry")
        .sign(&server.keypair);

    let response = server.get("/v1/me", Some(&token)).await?;

    assert_eq!(response.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_missing_audience_rejected_when_enforced() -> Result<()> {
    let server = TestAuthServer::spawn_with(vars(&[("API_AUDIENCE", "api://tapestry")])).await?;
    let token = TestTokenBuilder::new().sign(&server.keypair);

    let response = server.get("/v1/me", Some(&token)).await?;

    assert_eq!(response.status(), 401);
    Ok(())
}

// =============================================================================
// Roles
// =============================================================================

#[tokio::test]
async fn test_roleless_caller_open_route_ok_editor_route_forbidden() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let token = TestTokenBuilder::new().sign(&server.keypair);

    let me = server.get("/v1/me", Some(&token)).await?;
    assert_eq!(me.status(), 200);

    let editor = server.get("/v1/editor/session", Some(&token)).await?;
    assert_eq!(editor.status(), 403);
    assert!(editor.headers().get("www-authenticate").is_none());
    assert!(editor.text().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_editor_session_lists_matched_roles() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let token = TestTokenBuilder::new()
        .roles(&["Admin", "Viewer"])
        .sign(&server.keypair);

    let response = server.get("/v1/editor/session", Some(&token)).await?;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["editor_roles"], serde_json::json!(["Admin"]));

    Ok(())
}

#[tokio::test]
async fn test_custom_editor_roles() -> Result<()> {
    let server = TestAuthServer::spawn_with(vars(&[("EDITOR_ROLES", "Curator")])).await?;

    let admin = TestTokenBuilder::new().roles(&["Admin"]).sign(&server.keypair);
    let response = server.get("/v1/editor/session", Some(&admin)).await?;
    assert_eq!(response.status(), 403);

    let curator = TestTokenBuilder::new()
        .roles(&["Curator"])
        .sign(&server.keypair);
    let response = server.get("/v1/editor/session", Some(&curator)).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}
