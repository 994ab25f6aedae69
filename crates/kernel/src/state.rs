//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::services::Mailer;
use crate::theme::ThemeEngine;
use crate::token::CompletionToken;
use crate::verify::{self, BotVerifier};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    theme: ThemeEngine,
    mailer: Mailer,
    verifier: Arc<dyn BotVerifier>,
    completion_token: CompletionToken,
}

impl AppState {
    /// Initialize application state from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let verifier = verify::create_verifier(&config.bot_verify);
        Self::with_verifier(config, verifier)
    }

    /// Initialize state with an explicit verifier.
    ///
    /// Lets tests substitute the outbound verification call; production
    /// code goes through [`AppState::new`].
    pub fn with_verifier(config: &Config, verifier: Arc<dyn BotVerifier>) -> Result<Self> {
        let theme = ThemeEngine::new().context("failed to initialize theme engine")?;

        let mailer = Mailer::new(
            &config.smtp_host,
            config.smtp_port,
            config.smtp_username.as_deref(),
            config.smtp_password.as_deref(),
            &config.smtp_encryption,
            config.mail_from_email.clone(),
        )
        .context("failed to initialize mailer")?;

        let completion_token = CompletionToken::new(&config.completion_token_secret)
            .context("failed to initialize completion token signer")?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config: config.clone(),
                theme,
                mailer,
                verifier,
                completion_token,
            }),
        })
    }

    /// Application configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Theme engine for page and email rendering.
    pub fn theme(&self) -> &ThemeEngine {
        &self.inner.theme
    }

    /// Outbound mail collaborator.
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }

    /// Configured bot verifier.
    pub fn verifier(&self) -> &Arc<dyn BotVerifier> {
        &self.inner.verifier
    }

    /// Completion token signer.
    pub fn completion_token(&self) -> &CompletionToken {
        &self.inner.completion_token
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish()
    }
}
