//! HTTP routes for the Tapestry gateway.
//!
//! Defines the Axum router and application state.

use crate::auth::{AuthGateway, RoutePolicy};
use crate::config::{Config, REQUEST_TIMEOUT};
use crate::errors::AuthError;
use crate::handlers;
use crate::middleware::{require_roles, RouteGuard};
use axum::response::{IntoResponse, Response};
use axum::{middleware, routing::get, Router};
use std::any::Any;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Authentication gateway shared by every protected route group.
    pub gateway: Arc<AuthGateway>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/health` - Liveness check - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/v1/me` - Current caller - any authenticated caller
/// - `/v1/editor/session` - Editor session - requires an editor role
/// - Panics mapped to an empty 401 (fail closed)
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new()
        .route("/v1/health", get(handlers::health_check))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Authenticated, no role requirement
    let authenticated_routes = Router::new()
        .route("/v1/me", get(handlers::get_me))
        .route_layer(middleware::from_fn_with_state(
            RouteGuard::new(state.gateway.clone(), RoutePolicy::any_authenticated()),
            require_roles,
        ));

    let editor_policy = RoutePolicy::require_any_of(state.config.editor_roles.iter().cloned());
    let editor_routes = Router::new()
        .route("/v1/editor/session", get(handlers::get_editor_session))
        .route_layer(middleware::from_fn_with_state(
            RouteGuard::new(state.gateway.clone(), editor_policy),
            require_roles,
        ))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. CatchPanicLayer - Fail closed on panics (innermost)
    // 2. TimeoutLayer - Timeout the request
    // 3. TraceLayer - Log request details
    public_routes
        .merge(metrics_routes)
        .merge(authenticated_routes)
        .merge(editor_routes)
        .layer(CatchPanicLayer::custom(fail_closed))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
}

/// Panic response: never 5xx, never open.
fn fail_closed(_panic: Box<dyn Any + Send + 'static>) -> Response {
    AuthError::Internal("request handler panicked".to_string()).into_response()
}
