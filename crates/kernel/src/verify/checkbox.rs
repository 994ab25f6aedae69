//! Binary checkbox verification (reCAPTCHA v2 style).

use async_trait::async_trait;

use super::score::SiteverifyResponse;
use super::{BotVerifier, BotVerifyError, Verification};

/// Token verification endpoint (shared with the score strategy).
const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Verifier for the checkbox challenge. The upstream `success` boolean is
/// authoritative; a score of 1.0 or 0.0 is synthesized for interface
/// uniformity since the challenge has no native score.
pub struct CheckboxVerifier {
    client: reqwest::Client,
    secret_key: String,
    endpoint: String,
}

impl CheckboxVerifier {
    /// Create a checkbox verifier.
    pub fn new(client: reqwest::Client, secret_key: String) -> Self {
        Self {
            client,
            secret_key,
            endpoint: SITEVERIFY_URL.to_string(),
        }
    }

    fn decide(response: SiteverifyResponse) -> Verification {
        Verification {
            score: if response.success { 1.0 } else { 0.0 },
            success: response.success,
            errors: response.error_codes,
        }
    }
}

#[async_trait]
impl BotVerifier for CheckboxVerifier {
    async fn verify(&self, token: &str) -> Result<Verification, BotVerifyError> {
        let params = [("secret", self.secret_key.as_str()), ("response", token)];

        let body = self
            .client
            .post(&self.endpoint)
            .form(&params)
            .send()
            .await?
            .text()
            .await?;

        let response: SiteverifyResponse = serde_json::from_str(&body)
            .map_err(|e| BotVerifyError::Protocol(e.to_string()))?;

        Ok(Self::decide(response))
    }
}
