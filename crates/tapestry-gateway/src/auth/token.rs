//! Pre-verification token checks and per-key signature verification.
//!
//! Tokens are size-checked and their header parsed before any key source is
//! contacted. A token that fails here is never sent through the key source
//! chain.

use crate::auth::claims::Claims;
use crate::auth::jwks::Jwk;
use crate::errors::KeySourceError;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::time::Duration;
use thiserror::Error;

/// Maximum allowed JWT size in bytes (8KB).
///
/// Checked before any base64 decoding or signature work.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Reasons a token is rejected before key lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedToken {
    #[error("token exceeds {MAX_JWT_SIZE_BYTES} bytes")]
    TooLarge,

    #[error("token is not a compact JWS")]
    NotCompact,

    #[error("token header is not decodable")]
    BadHeader,

    #[error("token header has no key id")]
    MissingKid,
}

/// Extract the `kid` from a JWT header without verifying the signature.
///
/// The returned value is only used to select a key from a trusted key set.
pub fn extract_kid(token: &str) -> Result<String, MalformedToken> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "tg.auth.token",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(MalformedToken::TooLarge);
    }

    if token.split('.').count() != 3 {
        tracing::debug!(target: "tg.auth.token", "Token rejected: invalid JWT format");
        return Err(MalformedToken::NotCompact);
    }

    let header = decode_header(token).map_err(|e| {
        tracing::debug!(target: "tg.auth.token", error = %e, "Failed to decode JWT header");
        MalformedToken::BadHeader
    })?;

    header
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or(MalformedToken::MissingKid)
}

/// Build a decoding key and the single algorithm it may verify.
///
/// RSA keys accept RS256/RS384/RS512 (RS256 when the JWK has no `alg`).
/// OKP keys accept EdDSA over Ed25519 only.
fn decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), KeySourceError> {
    if let Some(key_use) = &jwk.key_use {
        if key_use != "sig" {
            return Err(KeySourceError::UnsupportedKey(format!(
                "key use {key_use} is not sig"
            )));
        }
    }

    match jwk.kty.as_str() {
        "RSA" => {
            let algorithm = match jwk.alg.as_deref() {
                None | Some("RS256") => Algorithm::RS256,
                Some("RS384") => Algorithm::RS384,
                Some("RS512") => Algorithm::RS512,
                Some(other) => {
                    return Err(KeySourceError::UnsupportedKey(format!(
                        "RSA key with alg {other}"
                    )))
                }
            };
            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                return Err(KeySourceError::UnsupportedKey(
                    "RSA key missing n or e".to_string(),
                ));
            };
            let key = DecodingKey::from_rsa_components(n, e)
                .map_err(|e| KeySourceError::UnsupportedKey(e.to_string()))?;
            Ok((key, algorithm))
        }
        "OKP" => {
            if jwk.crv.as_deref().is_some_and(|crv| crv != "Ed25519") {
                return Err(KeySourceError::UnsupportedKey(
                    "OKP key on unsupported curve".to_string(),
                ));
            }
            if jwk.alg.as_deref().is_some_and(|alg| alg != "EdDSA") {
                return Err(KeySourceError::UnsupportedKey(
                    "OKP key with non-EdDSA alg".to_string(),
                ));
            }
            let x = jwk.x.as_deref().ok_or_else(|| {
                KeySourceError::UnsupportedKey("OKP key missing x".to_string())
            })?;
            let key = DecodingKey::from_ed_components(x)
                .map_err(|e| KeySourceError::UnsupportedKey(e.to_string()))?;
            Ok((key, Algorithm::EdDSA))
        }
        other => Err(KeySourceError::UnsupportedKey(format!("key type {other}"))),
    }
}

/// Verify signature, `exp` and `nbf` against one key and decode the claims.
///
/// The token header's `alg` must equal the algorithm implied by the key.
/// Audience is not checked here.
pub fn verify_with_key(
    token: &str,
    jwk: &Jwk,
    clock_skew: Duration,
) -> Result<Claims, KeySourceError> {
    let (key, algorithm) = decoding_key(jwk)?;

    let mut validation = Validation::new(algorithm);
    validation.leeway = clock_skew.as_secs();
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.validate_aud = false;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        tracing::debug!(target: "tg.auth.token", error = %e, "Token verification failed");
        KeySourceError::InvalidToken(e.to_string())
    })?;

    let claims = token_data.claims;
    if let Some(iat) = claims.iat {
        validate_iat_at(iat, clock_skew, chrono::Utc::now().timestamp())?;
    }

    Ok(claims)
}

/// Reject tokens issued further in the future than the clock skew allows.
fn validate_iat_at(iat: i64, clock_skew: Duration, now: i64) -> Result<(), KeySourceError> {
    let skew_secs = i64::try_from(clock_skew.as_secs()).unwrap_or(i64::MAX);
    let max_iat = now.saturating_add(skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "tg.auth.token",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(KeySourceError::InvalidToken(
            "iat too far in the future".to_string(),
        ));
    }

    Ok(())
}
