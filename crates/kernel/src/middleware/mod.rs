//! HTTP middleware components.
//!
//! Provides CSRF cookie issuance and cache-control headers for the
//! contact flow. Request-scoped values travel through request extensions,
//! never through process globals.

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, PRAGMA, SET_COOKIE};
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tower_sessions::cookie::{Cookie, SameSite};

use crate::form::csrf::{CSRF_COOKIE, cookie_token, generate_csrf_token};

/// CSRF token made available to handlers via request extensions.
///
/// `from_request` tells whether the value arrived in the request cookie
/// (usable for validation) or was freshly issued on this response.
#[derive(Debug, Clone)]
pub struct CsrfToken {
    pub token: String,
    pub from_request: bool,
}

/// Issue the CSRF cookie when the visitor does not carry one yet.
///
/// The guard in [`crate::form::csrf`] only compares; issuance lives here at
/// the boundary. The cookie has no explicit expiry, making it a session
/// cookie.
pub async fn issue_csrf_cookie(mut request: Request<Body>, next: Next) -> Response {
    let existing = cookie_token(request.headers());
    let from_request = existing.is_some();
    let token = existing.unwrap_or_else(generate_csrf_token);

    request.extensions_mut().insert(CsrfToken {
        token: token.clone(),
        from_request,
    });

    let mut response = next.run(request).await;

    if !from_request {
        let cookie = Cookie::build((CSRF_COOKIE, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();

        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to encode CSRF cookie");
            }
        }
    }

    response
}

/// Forbid caching of every flow response.
///
/// Form pages, the confirm view, and the one-shot completion page must
/// never be served from a cache.
pub async fn no_store(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

    response
}
