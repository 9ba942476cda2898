//! Editor session handler.
//!
//! Mounted behind the editor role policy, so every caller reaching it holds
//! at least one configured editor role.

use crate::auth::Principal;
use crate::routes::AppState;
use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Response for `/v1/editor/session`.
#[derive(Debug, Clone, Serialize)]
pub struct EditorSessionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// All roles held by the caller.
    pub roles: Vec<String>,

    /// The caller's roles that granted editor access.
    pub editor_roles: Vec<String>,
}

/// Handler for GET /v1/editor/session
#[instrument(skip_all, name = "tg.handlers.editor_session")]
pub async fn get_editor_session(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Json<EditorSessionResponse> {
    let editor_roles: Vec<String> = principal
        .roles
        .intersection(&state.config.editor_roles)
        .cloned()
        .collect();

    tracing::debug!(
        target: "tg.handlers.editor_session",
        editor_roles = ?editor_roles,
        "Editor session granted"
    );

    Json(EditorSessionResponse {
        sub: principal.subject().map(ToString::to_string),
        roles: principal.roles.iter().cloned().collect(),
        editor_roles,
    })
}
