//! Pluggable bot verification.
//!
//! Every strategy answers the same question — "did a human submit this
//! token?" — through one contract. A negative [`Verification`] is a normal
//! outcome; [`BotVerifyError`] is reserved for transport and protocol
//! failures talking to the upstream service.

pub mod checkbox;
pub mod enterprise;
pub mod score;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{BotVerifyConfig, BotVerifyKind};

pub use checkbox::CheckboxVerifier;
pub use enterprise::EnterpriseVerifier;
pub use score::ScoreVerifier;

/// Upstream request timeout.
const VERIFY_TIMEOUT_SECS: u64 = 10;

/// Outcome of a bot verification.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    /// Confidence-of-human estimate in [0, 1].
    pub score: f32,

    /// Policy decision gating the flow.
    pub success: bool,

    /// Upstream error codes or risk reasons, for logging.
    pub errors: Vec<String>,
}

/// Transport or protocol failure talking to the verification service.
///
/// Distinct from a failed verification, which is a regular [`Verification`]
/// with `success: false`.
#[derive(Debug, Error)]
pub enum BotVerifyError {
    #[error("bot verification request failed")]
    Transport(#[from] reqwest::Error),

    #[error("bot verification response was malformed: {0}")]
    Protocol(String),
}

/// Contract shared by all verification strategies.
#[async_trait]
pub trait BotVerifier: Send + Sync {
    /// Verify a client-supplied token.
    async fn verify(&self, token: &str) -> Result<Verification, BotVerifyError>;
}

/// Build the verifier selected by configuration.
///
/// The selector was already parsed into a closed enum at startup, so there
/// is no invalid-selector branch left here.
pub fn create_verifier(config: &BotVerifyConfig) -> Arc<dyn BotVerifier> {
    let client = http_client();

    match config.kind {
        BotVerifyKind::Score => Arc::new(ScoreVerifier::new(
            client,
            config.secret_key.clone(),
            config.threshold,
        )),
        BotVerifyKind::Checkbox => {
            Arc::new(CheckboxVerifier::new(client, config.secret_key.clone()))
        }
        BotVerifyKind::Enterprise => Arc::new(EnterpriseVerifier::new(
            client,
            config.site_key.clone(),
            config.secret_key.clone(),
            config.project_id.clone().unwrap_or_default(),
            config.threshold,
        )),
    }
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(VERIFY_TIMEOUT_SECS))
        .build()
        .unwrap_or_default()
}
