//! Enterprise risk-assessment verification.
//!
//! Creates a structured assessment against the risk API, extracts the
//! numeric risk score and reason codes, and applies the same threshold
//! comparison as the score strategy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{BotVerifier, BotVerifyError, Verification};

/// Assessment endpoint root.
const ASSESSMENT_URL: &str = "https://recaptchaenterprise.googleapis.com/v1";

/// Action name bound into assessments for this form.
const EXPECTED_ACTION: &str = "contact";

/// Verifier backed by the enterprise assessment API.
pub struct EnterpriseVerifier {
    client: reqwest::Client,
    site_key: String,
    api_key: String,
    project_id: String,
    threshold: f32,
}

/// Assessment response, reduced to the fields the decision needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssessmentResponse {
    #[serde(default)]
    pub token_properties: TokenProperties,

    #[serde(default)]
    pub risk_analysis: RiskAnalysis,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenProperties {
    #[serde(default)]
    pub valid: bool,

    #[serde(default)]
    pub invalid_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RiskAnalysis {
    #[serde(default)]
    pub score: f32,

    #[serde(default)]
    pub reasons: Vec<String>,
}

/// Assessment request event payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssessmentEvent<'a> {
    token: &'a str,
    site_key: &'a str,
    expected_action: &'a str,
}

impl EnterpriseVerifier {
    /// Create an enterprise verifier.
    pub fn new(
        client: reqwest::Client,
        site_key: String,
        api_key: String,
        project_id: String,
        threshold: f32,
    ) -> Self {
        Self {
            client,
            site_key,
            api_key,
            project_id,
            threshold,
        }
    }

    fn assessment_url(&self) -> String {
        format!(
            "{ASSESSMENT_URL}/projects/{}/assessments?key={}",
            self.project_id, self.api_key
        )
    }

    /// Apply the verification policy to an assessment.
    ///
    /// An invalid token fails with the upstream reason; a valid token fails
    /// when its risk score is below the threshold, carrying the risk
    /// reasons for logging.
    fn decide(&self, response: AssessmentResponse) -> Verification {
        let score = response.risk_analysis.score;

        if !response.token_properties.valid {
            let mut errors = Vec::new();
            if let Some(reason) = response.token_properties.invalid_reason {
                errors.push(reason);
            }
            return Verification {
                score,
                success: false,
                errors,
            };
        }

        Verification {
            score,
            success: score >= self.threshold,
            errors: response.risk_analysis.reasons,
        }
    }
}

#[async_trait]
impl BotVerifier for EnterpriseVerifier {
    async fn verify(&self, token: &str) -> Result<Verification, BotVerifyError> {
        let request = json!({
            "event": AssessmentEvent {
                token,
                site_key: &self.site_key,
                expected_action: EXPECTED_ACTION,
            },
        });

        let body = self
            .client
            .post(self.assessment_url())
            .json(&request)
            .send()
            .await?
            .text()
            .await?;

        let response: AssessmentResponse = serde_json::from_str(&body)
            .map_err(|e| BotVerifyError::Protocol(e.to_string()))?;

        Ok(self.decide(response))
    }
}
