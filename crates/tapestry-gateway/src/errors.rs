//! Gateway error types.
//!
//! `AuthError` is the request-level outcome of the gateway and maps onto
//! exactly two client-visible status codes: 401 (unauthenticated) and 403
//! (authenticated but not permitted). Responses carry no body; the detailed
//! diagnostic is logged server-side only.
//!
//! `KeySourceError` describes why a single key source could not verify a
//! token. Only the last one observed survives into `VerificationExhausted`.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// `WWW-Authenticate` challenge sent with every 401.
const BEARER_CHALLENGE: &str = "Bearer realm=\"tapestry-api\", error=\"invalid_token\"";

/// Failure of one key source to verify a token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeySourceError {
    #[error("key source unreachable: {0}")]
    Unavailable(String),

    #[error("key source returned HTTP {0}")]
    UnexpectedStatus(u16),

    #[error("key source returned an invalid key set: {0}")]
    InvalidDocument(String),

    #[error("key id {0} not found in key set")]
    UnknownKeyId(String),

    #[error("unsupported key: {0}")]
    UnsupportedKey(String),

    #[error("token rejected: {0}")]
    InvalidToken(String),

    #[error("key source timed out")]
    TimedOut,
}

/// Gateway error type.
///
/// Maps to HTTP status codes:
/// - NoCredential, VerificationExhausted, AudienceRejected, Internal: 401 Unauthorized
/// - InsufficientRole: 403 Forbidden
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing, malformed or structurally unusable credential.
    #[error("no usable credential: {0}")]
    NoCredential(String),

    /// Every key source failed. Carries the last source tried and its error.
    #[error("verification failed at {source_uri}: {error}")]
    VerificationExhausted {
        source_uri: String,
        error: KeySourceError,
    },

    /// Audience restriction is configured and the token does not match it.
    #[error("token audience not accepted")]
    AudienceRejected,

    /// Valid token without any of the roles the route requires.
    #[error("caller lacks a required role")]
    InsufficientRole,

    /// Unexpected internal condition. Fails closed as 401.
    #[error("internal authentication error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
            AuthError::NoCredential(_)
            | AuthError::VerificationExhausted { .. }
            | AuthError::AudienceRejected
            | AuthError::Internal(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Bounded label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            AuthError::NoCredential(_) => "no_credential",
            AuthError::VerificationExhausted { .. } => "verification_exhausted",
            AuthError::AudienceRejected => "audience_rejected",
            AuthError::InsufficientRole => "insufficient_role",
            AuthError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AuthError::Internal(reason) => {
                tracing::error!(target: "tg.errors", reason = %reason, "Internal authentication error, failing closed");
            }
            other => {
                tracing::debug!(target: "tg.errors", error = %other, status = status.as_u16(), "Request rejected");
            }
        }

        let mut response = status.into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(BEARER_CHALLENGE),
            );
        }

        response
    }
}
