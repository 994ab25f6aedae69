//! Contact form routes: the input → confirm → complete flow.
//!
//! The flow is a small state machine. `confirm` moves a submission from
//! INPUT to CONFIRMED, `execute` from CONFIRMED to SENT, and `complete`
//! shows the final page exactly once. Every failure routes back to the
//! input stage, stashing the raw input in the session so the visitor never
//! re-types the form.

use std::collections::{BTreeMap, HashMap};

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Form, Router};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, warn};

use crate::config::CompletionGuard;
use crate::error::{AppError, AppResult};
use crate::flash::Flash;
use crate::form::csrf::{CSRF_FIELD, cookie_token, verify_csrf_token};
use crate::form::validate::{CONTACT_FIELDS, validate_contact};
use crate::middleware::CsrfToken;
use crate::state::AppState;
use crate::token::DEFAULT_MAX_AGE_SECS;

/// Session key holding the sanitized submission between confirm and execute.
const SESSION_CONTACT_DATA: &str = "contact_data";

/// Session key flagging a completed send (session-flag completion guard).
const SESSION_CONTACT_SENT: &str = "contact_sent";

/// Session key stashing raw input for one-shot repopulation after a redirect.
const SESSION_CONTACT_STASH: &str = "contact_stash";

/// Session key stashing the field error map next to the input stash.
const SESSION_CONTACT_ERRORS: &str = "contact_errors";

/// Flash key for flow-level error messages.
const FLASH_ERROR: &str = "error";

/// Form field carrying the bot verification token.
const BOT_TOKEN_FIELD: &str = "g-recaptcha-response";

/// Message flashed when bot verification does not pass.
const MSG_BOT_REJECTED: &str = "We could not verify that you are human. Please try again.";

/// Message flashed when the verification service itself fails.
const MSG_BOT_UNAVAILABLE: &str =
    "Verification is temporarily unavailable. Please try again in a moment.";

/// Message flashed on a CSRF failure.
const MSG_CSRF_FAILED: &str = "Your form session has expired. Please try again.";

/// Sanitized contact submission held in the session between confirm and
/// execute. Deleted as soon as dispatch succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub email_cmp: String,
    pub category: String,
    pub body: String,
}

impl ContactSubmission {
    /// Build a submission from a complete `clean` map.
    fn from_clean(clean: &BTreeMap<String, String>) -> Self {
        let field = |name: &str| clean.get(name).cloned().unwrap_or_default();
        Self {
            name: field("name"),
            email: field("email"),
            email_cmp: field("email_cmp"),
            category: field("category"),
            body: field("body"),
        }
    }
}

/// Input form.
///
/// GET /contact
///
/// Drains any stashed input and error map from a previous failed attempt
/// (one-shot repopulation) along with pending flash messages.
async fn input_form(
    State(state): State<AppState>,
    Extension(csrf): Extension<CsrfToken>,
    session: Session,
) -> AppResult<Response> {
    let (fields, errors) = take_stash(&session).await?;
    let flash_errors = Flash::new(&session).get(FLASH_ERROR).await?;

    render_input(&state, &csrf.token, &fields, &errors, &flash_errors)
}

/// Input form repopulated from a POST body.
///
/// POST /contact
///
/// The confirm view's Back button posts the reviewed values here so the
/// form comes back filled in.
async fn input_form_post(
    State(state): State<AppState>,
    Extension(csrf): Extension<CsrfToken>,
    session: Session,
    Form(values): Form<HashMap<String, String>>,
) -> AppResult<Response> {
    // Drain the stash either way so stale values cannot resurface later.
    let (stashed, errors) = take_stash(&session).await?;
    let flash_errors = Flash::new(&session).get(FLASH_ERROR).await?;

    let posted = known_fields(&values);
    let fields = if posted.is_empty() { stashed } else { posted };

    render_input(&state, &csrf.token, &fields, &errors, &flash_errors)
}

/// Redirect stray GETs on the confirm endpoint back to the form.
async fn confirm_form() -> Redirect {
    Redirect::to("/contact")
}

/// Confirm stage: INPUT → CONFIRMED.
///
/// POST /contact/confirm
///
/// Check order is deliberate: bot verification runs first so that a
/// missing or invalid token short-circuits before any CSRF state is
/// touched, then the CSRF guard, then field validation. On success the
/// sanitized submission is persisted and the confirm view rendered
/// directly — no redirect, since nothing irreversible happened yet.
async fn confirm(
    State(state): State<AppState>,
    Extension(csrf): Extension<CsrfToken>,
    session: Session,
    headers: HeaderMap,
    Form(values): Form<HashMap<String, String>>,
) -> AppResult<Response> {
    let flash = Flash::new(&session);

    let bot_token = values
        .get(BOT_TOKEN_FIELD)
        .map(String::as_str)
        .unwrap_or_default();

    if bot_token.is_empty() {
        flash.add(FLASH_ERROR, MSG_BOT_REJECTED).await?;
        return recover_to_input(&session, &values).await;
    }

    match state.verifier().verify(bot_token).await {
        Ok(verification) if verification.success => {}
        Ok(verification) => {
            info!(
                score = verification.score,
                upstream_errors = ?verification.errors,
                "bot verification rejected submission"
            );
            flash.add(FLASH_ERROR, MSG_BOT_REJECTED).await?;
            return recover_to_input(&session, &values).await;
        }
        Err(e) => {
            warn!(error = %e, "bot verification unavailable");
            flash.add(FLASH_ERROR, MSG_BOT_UNAVAILABLE).await?;
            return recover_to_input(&session, &values).await;
        }
    }

    if let Err(e) = verify_csrf_token(
        cookie_token(&headers).as_deref(),
        values.get(CSRF_FIELD).map(String::as_str),
    ) {
        info!(error = %e, "CSRF check failed on confirm");
        flash.add(FLASH_ERROR, MSG_CSRF_FAILED).await?;
        return recover_to_input(&session, &values).await;
    }

    let validation = validate_contact(&values);
    if !validation.is_valid() {
        stash_input(&session, &values).await?;
        session
            .insert(SESSION_CONTACT_ERRORS, &validation.errors)
            .await
            .context("failed to stash validation errors")?;
        return Ok(Redirect::to("/contact").into_response());
    }

    let submission = ContactSubmission::from_clean(&validation.clean);
    session
        .insert(SESSION_CONTACT_DATA, &submission)
        .await
        .context("failed to persist contact data")?;

    // A fresh confirmed submission invalidates any stale recovery state.
    clear_stash(&session).await?;

    render_confirm(&state, &submission, &csrf.token)
}

/// Execute stage: CONFIRMED → SENT.
///
/// POST /contact/execute
///
/// CSRF is validated again here: nothing stops a client from posting to
/// this endpoint directly, skipping confirm. A missing submission means
/// exactly that, and sends nothing.
async fn execute(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(values): Form<HashMap<String, String>>,
) -> AppResult<Response> {
    if let Err(e) = verify_csrf_token(
        cookie_token(&headers).as_deref(),
        values.get(CSRF_FIELD).map(String::as_str),
    ) {
        info!(error = %e, "CSRF check failed on execute");
        Flash::new(&session).add(FLASH_ERROR, MSG_CSRF_FAILED).await?;
        return Ok(Redirect::to("/contact").into_response());
    }

    let data: Option<ContactSubmission> = session
        .get(SESSION_CONTACT_DATA)
        .await
        .context("failed to load contact data")?;

    let Some(data) = data else {
        return Ok(Redirect::to("/contact").into_response());
    };

    // A dispatch failure is fatal for the request and must be visible;
    // it propagates to the boundary error handler unretried.
    dispatch_mail(&state, &data).await?;

    session
        .remove::<ContactSubmission>(SESSION_CONTACT_DATA)
        .await
        .context("failed to clear contact data")?;

    match state.config().completion_guard {
        CompletionGuard::SessionFlag => {
            session
                .insert(SESSION_CONTACT_SENT, true)
                .await
                .context("failed to set sent flag")?;
            Ok(Redirect::to("/contact/complete").into_response())
        }
        CompletionGuard::SignedToken => {
            let token = state.completion_token().issue();
            Ok(Redirect::to(&format!("/contact/complete?token={token}")).into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompleteQuery {
    token: Option<String>,
}

/// Completion stage: SENT → COMPLETE.
///
/// GET /contact/complete[?token=...]
///
/// With the session-flag guard the flag is consumed before rendering, so a
/// refresh redirects back to the form — the page shows exactly once. The
/// session id is regenerated across the boundary as a fixation defense.
/// With the signed-token guard the token in the query string must verify
/// within its acceptance window.
async fn complete(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CompleteQuery>,
) -> AppResult<Response> {
    match state.config().completion_guard {
        CompletionGuard::SessionFlag => {
            let sent = session
                .remove::<bool>(SESSION_CONTACT_SENT)
                .await
                .context("failed to read sent flag")?
                .unwrap_or(false);

            if !sent {
                return Ok(Redirect::to("/contact").into_response());
            }

            session
                .cycle_id()
                .await
                .context("failed to regenerate session id")?;
        }
        CompletionGuard::SignedToken => {
            let valid = query
                .token
                .as_deref()
                .is_some_and(|t| state.completion_token().verify(t, DEFAULT_MAX_AGE_SECS));

            if !valid {
                return Ok(Redirect::to("/contact").into_response());
            }
        }
    }

    let html = state
        .theme()
        .tera()
        .render("contact/complete.html", &tera::Context::new())?;
    Ok(Html(html).into_response())
}

/// Render the admin notification and visitor auto-reply, then send both in
/// sequence through the mail collaborator.
async fn dispatch_mail(state: &AppState, data: &ContactSubmission) -> AppResult<()> {
    let config = state.config();

    let mut context = tera::Context::new();
    context.insert("data", data);

    let admin_body = state
        .theme()
        .tera()
        .render("email/admin_notification.txt", &context)?;
    let reply_body = state.theme().tera().render("email/auto_reply.txt", &context)?;

    state
        .mailer()
        .send(&config.mail_admin_email, &config.mail_admin_subject, &admin_body)
        .await
        .map_err(AppError::MailDispatch)?;

    state
        .mailer()
        .send(&data.email, &config.mail_reply_subject, &reply_body)
        .await
        .map_err(AppError::MailDispatch)?;

    info!(category = %data.category, "contact message dispatched");
    Ok(())
}

/// Stash the submitted input and redirect to the input stage.
async fn recover_to_input(
    session: &Session,
    values: &HashMap<String, String>,
) -> AppResult<Response> {
    stash_input(session, values).await?;
    Ok(Redirect::to("/contact").into_response())
}

/// Keep only the declared contact fields from a raw submission.
fn known_fields(values: &HashMap<String, String>) -> HashMap<String, String> {
    CONTACT_FIELDS
        .iter()
        .filter_map(|&field| {
            values
                .get(field)
                .map(|value| (field.to_string(), value.clone()))
        })
        .collect()
}

/// Stash raw input for one-shot repopulation on the next input render.
async fn stash_input(session: &Session, values: &HashMap<String, String>) -> AppResult<()> {
    session
        .insert(SESSION_CONTACT_STASH, known_fields(values))
        .await
        .context("failed to stash form input")?;
    Ok(())
}

/// Read and clear the stashed input and error map.
///
/// Returning to the input stage also resets the machine: a pending
/// confirmed submission is discarded, so a later execute without a fresh
/// confirm sends nothing.
async fn take_stash(
    session: &Session,
) -> AppResult<(HashMap<String, String>, BTreeMap<String, String>)> {
    let fields = session
        .remove::<HashMap<String, String>>(SESSION_CONTACT_STASH)
        .await
        .context("failed to read stashed input")?
        .unwrap_or_default();

    let errors = session
        .remove::<BTreeMap<String, String>>(SESSION_CONTACT_ERRORS)
        .await
        .context("failed to read stashed errors")?
        .unwrap_or_default();

    session
        .remove::<ContactSubmission>(SESSION_CONTACT_DATA)
        .await
        .context("failed to discard pending submission")?;

    Ok((fields, errors))
}

/// Drop any stashed recovery state without reading it.
async fn clear_stash(session: &Session) -> AppResult<()> {
    session
        .remove::<HashMap<String, String>>(SESSION_CONTACT_STASH)
        .await
        .context("failed to clear stashed input")?;
    session
        .remove::<BTreeMap<String, String>>(SESSION_CONTACT_ERRORS)
        .await
        .context("failed to clear stashed errors")?;
    Ok(())
}

fn render_input(
    state: &AppState,
    csrf_token: &str,
    fields: &HashMap<String, String>,
    errors: &BTreeMap<String, String>,
    flash_errors: &[String],
) -> AppResult<Response> {
    let mut context = tera::Context::new();
    context.insert("csrf_token", csrf_token);
    context.insert("site_key", &state.config().bot_verify.site_key);
    context.insert("fields", fields);
    context.insert("errors", errors);
    context.insert("flash_errors", flash_errors);

    let html = state.theme().tera().render("contact/input.html", &context)?;
    Ok(Html(html).into_response())
}

fn render_confirm(
    state: &AppState,
    data: &ContactSubmission,
    csrf_token: &str,
) -> AppResult<Response> {
    let mut context = tera::Context::new();
    context.insert("data", data);
    context.insert("csrf_token", csrf_token);

    let html = state
        .theme()
        .tera()
        .render("contact/confirm.html", &context)?;
    Ok(Html(html).into_response())
}

/// Create the contact flow router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/contact", get(input_form).post(input_form_post))
        .route("/contact/confirm", get(confirm_form).post(confirm))
        .route("/contact/execute", post(execute))
        .route("/contact/complete", get(complete))
}
