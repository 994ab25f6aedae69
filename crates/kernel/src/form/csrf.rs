//! CSRF token generation and verification.
//!
//! Double-submit cookie pattern: a random token is issued once per visitor
//! in a cookie at the middleware boundary (see [`crate::middleware`]), and
//! every mutating form submission must echo the same value in a hidden
//! `_token` field. The guard here only compares; it never issues.

use axum::http::HeaderMap;
use rand::RngCore;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Cookie carrying the CSRF token.
pub const CSRF_COOKIE: &str = "csrf_token";

/// Form field carrying the resubmitted token.
pub const CSRF_FIELD: &str = "_token";

/// Raw token length in bytes (hex-encoded on the wire).
const CSRF_TOKEN_BYTES: usize = 32;

/// CSRF verification failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsrfError {
    #[error("missing CSRF cookie")]
    MissingCookie,

    #[error("missing CSRF form token")]
    MissingField,

    #[error("CSRF token mismatch")]
    Mismatch,
}

/// Generate a fresh CSRF token.
pub fn generate_csrf_token() -> String {
    let mut bytes = [0u8; CSRF_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Verify a submitted form token against the cookie token.
///
/// Comparison is constant-time; absence of either side is a failure.
pub fn verify_csrf_token(
    cookie_token: Option<&str>,
    submitted: Option<&str>,
) -> Result<(), CsrfError> {
    let cookie_token = cookie_token
        .filter(|t| !t.is_empty())
        .ok_or(CsrfError::MissingCookie)?;
    let submitted = submitted
        .filter(|t| !t.is_empty())
        .ok_or(CsrfError::MissingField)?;

    if bool::from(cookie_token.as_bytes().ct_eq(submitted.as_bytes())) {
        Ok(())
    } else {
        Err(CsrfError::Mismatch)
    }
}

/// Extract the CSRF cookie value from request headers.
pub fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;

    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == CSRF_COOKIE).then(|| value.to_string())
    })
}
