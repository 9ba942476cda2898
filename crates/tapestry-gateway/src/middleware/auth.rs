//! Authentication middleware for protected routes.
//!
//! Runs the gateway for the route group's policy and injects the resulting
//! `Principal` into request extensions. Rejections short-circuit with an
//! empty 401 or 403.

use crate::auth::{AuthGateway, Principal, RoutePolicy};
use crate::errors::AuthError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// Middleware state: the shared gateway plus the policy of one route group.
#[derive(Clone)]
pub struct RouteGuard {
    pub gateway: Arc<AuthGateway>,
    pub policy: Arc<RoutePolicy>,
}

impl RouteGuard {
    pub fn new(gateway: Arc<AuthGateway>, policy: RoutePolicy) -> Self {
        Self {
            gateway,
            policy: Arc::new(policy),
        }
    }
}

/// Authentication and authorization middleware.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - 401 Unauthorized if the token is missing, malformed, unverifiable or
///   issued for another audience
/// - 403 Forbidden if the caller holds none of the route's required roles
/// - Otherwise continues with `Principal` in extensions
#[instrument(skip_all, name = "tg.middleware.auth")]
pub async fn require_roles(
    State(guard): State<RouteGuard>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthError> {
    let principal = guard
        .gateway
        .authorize(req.headers(), &guard.policy)
        .await?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Extension trait for reading the principal from a request.
pub trait PrincipalExt {
    /// Returns `None` if the auth middleware did not run for this request.
    fn principal(&self) -> Option<&Principal>;
}

impl<B> PrincipalExt for axum::http::Request<B> {
    fn principal(&self) -> Option<&Principal> {
        self.extensions().get::<Principal>()
    }
}
