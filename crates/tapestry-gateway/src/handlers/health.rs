//! Health check handler.

use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Response for `/v1/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,

    /// Number of configured key sources.
    pub key_sources: usize,
}

/// Liveness check. Does not contact any key source.
///
/// ```json
/// { "status": "healthy", "key_sources": 4 }
/// ```
#[instrument(skip_all, name = "tg.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        key_sources: state.gateway.key_source_count(),
    })
}
