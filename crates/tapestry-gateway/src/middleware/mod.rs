//! HTTP middleware for the gateway.
//!
//! # Components
//!
//! - `auth` - Authentication and role enforcement for protected routes

pub mod auth;

pub use auth::{require_roles, PrincipalExt, RouteGuard};
