//! Application error types.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

/// Generic error page shown when a request fails fatally.
///
/// Deliberately static: the failure may be in the template engine itself.
const ERROR_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Error</title></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 100px auto; padding: 2rem;">
<h1>Something went wrong</h1>
<p>We could not process your request. Please try again later.</p>
</body></html>"#;

/// Application errors.
///
/// Only failures that are fatal for the request travel through this type.
/// Recoverable outcomes (validation errors, CSRF mismatch, failed bot
/// verification) are handled in the contact flow with a flash message and a
/// redirect back to the input stage.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("mail dispatch failed")]
    MailDispatch(#[source] anyhow::Error),

    #[error("template rendering failed")]
    Render(#[from] tera::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
            }
            AppError::MailDispatch(e) => {
                tracing::error!(error = %e, "mail dispatch failed");
            }
            AppError::Render(e) => {
                tracing::error!(error = %e, "template rendering failed");
            }
        }

        (StatusCode::INTERNAL_SERVER_ERROR, Html(ERROR_PAGE)).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
