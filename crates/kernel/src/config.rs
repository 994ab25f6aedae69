//! Configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// Debug mode. Relaxes the Secure cookie attribute for local development.
    pub debug: bool,

    /// Environment name, e.g. "production" or "development" (default: "production").
    pub environment: String,

    /// Public site URL for constructing absolute links.
    pub site_url: String,

    /// SMTP host for email delivery.
    pub smtp_host: String,

    /// SMTP port (default: 587).
    pub smtp_port: u16,

    /// SMTP username for authentication.
    pub smtp_username: Option<String>,

    /// SMTP password for authentication.
    pub smtp_password: Option<String>,

    /// SMTP encryption mode: "starttls" (default), "tls", or "none".
    pub smtp_encryption: String,

    /// From address for outgoing email.
    pub mail_from_email: String,

    /// Address that receives the admin notification.
    pub mail_admin_email: String,

    /// Subject line for the admin notification.
    pub mail_admin_subject: String,

    /// Subject line for the visitor auto-reply.
    pub mail_reply_subject: String,

    /// Bot verification strategy and credentials.
    pub bot_verify: BotVerifyConfig,

    /// Session persistence backend.
    pub session_backend: SessionBackend,

    /// Key prefix for remote session records (default: "contatto").
    pub session_namespace: String,

    /// Redis connection URL (used when `session_backend` is `Redis`).
    pub redis_url: String,

    /// How the completion page is gated.
    pub completion_guard: CompletionGuard,

    /// HMAC secret for signed completion tokens.
    pub completion_token_secret: String,
}

/// Session persistence backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    /// In-process store. Sessions do not survive a restart.
    Memory,
    /// Remote Redis store with server-side expiry.
    Redis,
}

impl FromStr for SessionBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "memory" => Ok(SessionBackend::Memory),
            "redis" => Ok(SessionBackend::Redis),
            other => bail!("unsupported session backend: {other}"),
        }
    }
}

/// Bot verification strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotVerifyKind {
    /// Score-based verification (v3-style, score in [0, 1]).
    Score,
    /// Binary checkbox challenge (v2-style, no native score).
    Checkbox,
    /// Enterprise risk-assessment API.
    Enterprise,
}

impl FromStr for BotVerifyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "score" => Ok(BotVerifyKind::Score),
            "checkbox" => Ok(BotVerifyKind::Checkbox),
            "enterprise" => Ok(BotVerifyKind::Enterprise),
            other => bail!("unsupported bot verification kind: {other}"),
        }
    }
}

/// Bot verification settings.
#[derive(Debug, Clone)]
pub struct BotVerifyConfig {
    /// Which verification strategy to run.
    pub kind: BotVerifyKind,

    /// Public site key rendered into the form page.
    pub site_key: String,

    /// Secret key (score/checkbox) or API key (enterprise).
    pub secret_key: String,

    /// Minimum acceptable human-confidence score (default: 0.5).
    pub threshold: f32,

    /// Cloud project id, required by the enterprise strategy.
    pub project_id: Option<String>,
}

/// Completion page guard selector.
///
/// The two designs are mutually exclusive per deployment: a session flag
/// consumed on first view, or a short-lived signed token carried in the
/// redirect query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionGuard {
    SessionFlag,
    SignedToken,
}

impl FromStr for CompletionGuard {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "session" => Ok(CompletionGuard::SessionFlag),
            "token" => Ok(CompletionGuard::SignedToken),
            other => bail!("unsupported completion guard: {other}"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let debug = env::var("DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "production".to_string());

        let site_url = env::var("SITE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

        let smtp_host =
            env::var("SMTP_HOST").context("SMTP_HOST environment variable is required")?;

        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()
            .context("SMTP_PORT must be a valid u16")?;

        let smtp_username = env::var("SMTP_USERNAME").ok();
        let smtp_password = env::var("SMTP_PASSWORD").ok();

        let smtp_encryption = env::var("SMTP_ENCRYPTION")
            .unwrap_or_else(|_| "starttls".to_string())
            .to_lowercase();

        let mail_from_email =
            env::var("MAIL_FROM_EMAIL").unwrap_or_else(|_| "noreply@localhost".to_string());

        let mail_admin_email = env::var("MAIL_ADMIN_EMAIL")
            .context("MAIL_ADMIN_EMAIL environment variable is required")?;

        let mail_admin_subject = env::var("MAIL_ADMIN_SUBJECT")
            .unwrap_or_else(|_| "New contact form submission".to_string());

        let mail_reply_subject = env::var("MAIL_REPLY_SUBJECT")
            .unwrap_or_else(|_| "Thank you for contacting us".to_string());

        let bot_verify = BotVerifyConfig::from_env()?;

        let session_backend: SessionBackend = env::var("SESSION_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .parse()?;

        let session_namespace =
            env::var("SESSION_NAMESPACE").unwrap_or_else(|_| "contatto".to_string());

        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let completion_guard: CompletionGuard = env::var("COMPLETION_GUARD")
            .unwrap_or_else(|_| "session".to_string())
            .to_lowercase()
            .parse()?;

        let completion_token_secret = match completion_guard {
            CompletionGuard::SignedToken => env::var("COMPLETION_TOKEN_SECRET")
                .context("COMPLETION_TOKEN_SECRET is required when COMPLETION_GUARD=token")?,
            // A random per-process secret suffices here: no issued token is
            // expected to outlive the process when the guard is session-based.
            CompletionGuard::SessionFlag => {
                env::var("COMPLETION_TOKEN_SECRET").unwrap_or_else(|_| random_secret())
            }
        };

        Ok(Self {
            port,
            debug,
            environment,
            site_url,
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            smtp_encryption,
            mail_from_email,
            mail_admin_email,
            mail_admin_subject,
            mail_reply_subject,
            bot_verify,
            session_backend,
            session_namespace,
            redis_url,
            completion_guard,
            completion_token_secret,
        })
    }
}

impl BotVerifyConfig {
    fn from_env() -> Result<Self> {
        let kind: BotVerifyKind = env::var("BOT_VERIFY_KIND")
            .unwrap_or_else(|_| "score".to_string())
            .to_lowercase()
            .parse()?;

        let site_key = env::var("BOT_VERIFY_SITE_KEY")
            .context("BOT_VERIFY_SITE_KEY environment variable is required")?;

        let secret_key = env::var("BOT_VERIFY_SECRET_KEY")
            .context("BOT_VERIFY_SECRET_KEY environment variable is required")?;

        let threshold = env::var("BOT_VERIFY_THRESHOLD")
            .unwrap_or_else(|_| "0.5".to_string())
            .parse()
            .context("BOT_VERIFY_THRESHOLD must be a float")?;

        let project_id = env::var("BOT_VERIFY_PROJECT_ID").ok();

        if kind == BotVerifyKind::Enterprise && project_id.is_none() {
            bail!("BOT_VERIFY_PROJECT_ID is required when BOT_VERIFY_KIND=enterprise");
        }

        Ok(Self {
            kind,
            site_key,
            secret_key,
            threshold,
            project_id,
        })
    }
}

fn random_secret() -> String {
    use rand::RngCore;

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
