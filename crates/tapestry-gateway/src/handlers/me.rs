//! Current caller handler.
//!
//! Returns information about the authenticated caller from the verified
//! claim set.

use crate::auth::Principal;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

/// Response for `/v1/me`.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// Subject, if the token carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    pub roles: Vec<String>,

    /// Audience values from `aud` (or the legacy `audience` claim).
    pub aud: Vec<String>,

    /// Token expiration timestamp.
    pub exp: i64,
}

/// Handler for GET /v1/me
///
/// Open to any authenticated caller, including callers without roles.
#[instrument(skip_all, name = "tg.handlers.me")]
pub async fn get_me(Extension(principal): Extension<Principal>) -> Json<MeResponse> {
    tracing::debug!(target: "tg.handlers.me", "Returning caller claims");

    let aud = principal
        .claims
        .audiences()
        .into_iter()
        .map(ToString::to_string)
        .collect();

    Json(MeResponse {
        sub: principal.subject().map(ToString::to_string),
        roles: principal.roles.iter().cloned().collect(),
        aud,
        exp: principal.claims.exp,
    })
}
