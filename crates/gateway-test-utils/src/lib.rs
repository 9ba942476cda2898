//! # Gateway Test Utilities
//!
//! Shared test utilities for the Tapestry gateway.
//!
//! This crate provides:
//! - Deterministic Ed25519 signing keys and their JWKs (`TestKeypair`)
//! - Signed test tokens (`TestTokenBuilder`)
//! - Mock key source endpoints (`MockJwksServer`)
//! - Server test harness (`TestGatewayServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let jwks = MockJwksServer::start().await;
//!     let keypair = TestKeypair::new(1, "key-01");
//!     jwks.mount_keys(&MockJwksServer::tenant_key_path("tenant-a"), &[&keypair]).await;
//!
//!     let server = TestGatewayServer::spawn(jwks.gateway_vars("tenant-a")).await?;
//!     let token = TestTokenBuilder::new().roles(&["Editor"]).sign(&keypair);
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/v1/editor/session", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_server;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_server::*;
pub use server_harness::*;
pub use token_builders::*;
