//! Bearer-token gate for mutating routes.
//!
//! Tokens are `base64url(payload).base64url(hmac_sha256(payload))` with a
//! payload of `admin:<expiry unix seconds>`. Whoever holds the signing
//! secret can mint them (see the `mint-token` binary).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use lambda_http::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Body, Error, Response,
};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const ADMIN_SUBJECT: &str = "admin";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No token provided")]
    Missing,

    #[error("Invalid token")]
    Malformed,

    #[error("Invalid token")]
    BadSignature,

    #[error("Token expired")]
    Expired,

    #[error("signing key rejected")]
    Key,

    #[error("token lifetime out of range")]
    TtlOutOfRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: String,
    pub expires_at: DateTime<Utc>,
}

fn mac(secret: &str) -> Result<HmacSha256, AuthError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::Key)
}

/// Mint an admin token valid for `ttl` from `now`.
pub fn issue_token(secret: &str, ttl: Duration, now: DateTime<Utc>) -> Result<String, AuthError> {
    let expires_at = now
        .checked_add_signed(ttl)
        .ok_or(AuthError::TtlOutOfRange)?;
    let payload = format!("{}:{}", ADMIN_SUBJECT, expires_at.timestamp());
    let mut mac = mac(secret)?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(payload.as_bytes()),
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Check signature first, then subject and expiry.
pub fn verify_token(secret: &str, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
    let (payload_b64, signature_b64) = token.trim().split_once('.').ok_or(AuthError::Malformed)?;
    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AuthError::Malformed)?;
    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AuthError::Malformed)?;

    let mut mac = mac(secret)?;
    mac.update(&payload);
    mac.verify_slice(&signature)
        .map_err(|_| AuthError::BadSignature)?;

    let payload = String::from_utf8(payload).map_err(|_| AuthError::Malformed)?;
    let (subject, expiry) = payload.split_once(':').ok_or(AuthError::Malformed)?;
    if subject != ADMIN_SUBJECT {
        return Err(AuthError::Malformed);
    }
    let expiry: i64 = expiry.parse().map_err(|_| AuthError::Malformed)?;
    let expires_at = DateTime::<Utc>::from_timestamp(expiry, 0).ok_or(AuthError::Malformed)?;
    if expires_at <= now {
        return Err(AuthError::Expired);
    }

    Ok(Claims {
        subject: subject.to_string(),
        expires_at,
    })
}

/// Validate the `Authorization: Bearer <token>` header.
pub fn authorize(headers: &HeaderMap, secret: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::Missing)?;

    let token = match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => return Err(AuthError::Malformed),
    };
    if token.is_empty() {
        return Err(AuthError::Missing);
    }

    verify_token(secret, token, now)
}

pub fn unauthorized(err: &AuthError) -> Result<Response<Body>, Error> {
    tracing::warn!("🔒 rejected write request: {}", err);
    Ok(Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header("Content-Type", "application/json")
        .header("WWW-Authenticate", "Bearer")
        .body(
            serde_json::json!({
                "success": false,
                "message": format!("Unauthorized: {}", err),
            })
            .to_string()
            .into(),
        )
        .map_err(Box::new)?)
}
