//! Tapestry Gateway Library
//!
//! Bearer-token authentication and role-based authorization in front of the
//! Tapestry editor API.
//!
//! Every protected request passes through one pipeline:
//!
//! - Resolve the ordered list of candidate JWKS endpoints (key sources)
//! - Verify the token against each source in order, first success wins
//! - Check the verified audience against the configured API identity
//! - Check the caller's roles against the route's required roles
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth/gateway.rs -> auth/verifier.rs -> auth/jwks.rs
//!                                                       \-> auth/policy.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Key sources, token verification and policy enforcement
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Per-route authentication middleware
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
