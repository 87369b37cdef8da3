//! API access gate
//!
//! Optional HTTP Basic credential check for protected endpoints. The
//! credential pair is compared through fixed-length SHA-256 digests so the
//! comparison time does not depend on how much of a candidate matches; the
//! username and password verdicts are combined without short-circuiting.
//! An enabled gate with unset credentials fails closed.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use base64::Engine;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Middleware enforcing the access gate when it is enabled in config.
pub async fn access_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.auth.enabled {
        return Ok(next.run(request).await);
    }

    let (Some(expected_user), Some(expected_pass)) = (
        state.config.auth.username.as_deref(),
        state.config.auth.password.as_deref(),
    ) else {
        // Fail closed: an enabled gate without configured credentials
        // rejects everything rather than letting traffic through.
        tracing::warn!("access gate enabled without configured credentials, rejecting request");
        return Err(AppError::Unauthorized);
    };

    let Some((user, pass)) = extract_basic_credentials(&request) else {
        return Err(AppError::Unauthorized);
    };

    if credentials_match(&user, &pass, expected_user, expected_pass) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("rejected request with invalid credentials");
        Err(AppError::Unauthorized)
    }
}

/// Pull the username/password pair out of an `Authorization: Basic` header.
fn extract_basic_credentials(request: &Request) -> Option<(String, String)> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Compare a candidate credential pair against the expected pair.
///
/// Both comparisons always run; the verdicts are combined with a
/// non-short-circuiting `&`.
pub fn credentials_match(user: &str, pass: &str, expected_user: &str, expected_pass: &str) -> bool {
    let user_ok = constant_time_eq(&digest(user), &digest(expected_user));
    let pass_ok = constant_time_eq(&digest(pass), &digest(expected_pass));
    user_ok & pass_ok
}
