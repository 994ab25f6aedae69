//! Score-based verification (reCAPTCHA v3 style).

use async_trait::async_trait;
use serde::Deserialize;

use super::{BotVerifier, BotVerifyError, Verification};

/// Token verification endpoint.
const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Verifier that posts the token to a scoring endpoint and applies a
/// score threshold on top of the upstream success flag.
pub struct ScoreVerifier {
    client: reqwest::Client,
    secret_key: String,
    threshold: f32,
    endpoint: String,
}

/// Upstream siteverify response body.
#[derive(Debug, Deserialize)]
pub(crate) struct SiteverifyResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub score: Option<f32>,

    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

impl ScoreVerifier {
    /// Create a score-based verifier.
    pub fn new(client: reqwest::Client, secret_key: String, threshold: f32) -> Self {
        Self {
            client,
            secret_key,
            threshold,
            endpoint: SITEVERIFY_URL.to_string(),
        }
    }

    /// Apply the verification policy to an upstream response.
    ///
    /// Upstream `success: false` fails outright. A successful response with
    /// a score below the threshold also fails: the upstream only attests
    /// that the token was valid, not that a human produced it.
    fn decide(&self, response: SiteverifyResponse) -> Verification {
        let score = response.score.unwrap_or(0.0);

        if !response.success {
            return Verification {
                score,
                success: false,
                errors: response.error_codes,
            };
        }

        Verification {
            score,
            success: score >= self.threshold,
            errors: response.error_codes,
        }
    }
}

#[async_trait]
impl BotVerifier for ScoreVerifier {
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

        Ok(self.decide(response))
    }
}
