//! Short-lived signed tokens gating the completion page.
//!
//! A token is `"<timestamp_millis>.<hex hmac-sha256(timestamp_millis)>"`.
//! It proves the bearer just passed through the send step, without needing
//! any session state on the completion page.

use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Default acceptance window in seconds.
pub const DEFAULT_MAX_AGE_SECS: i64 = 10;

/// Issues and verifies completion tokens.
#[derive(Clone)]
pub struct CompletionToken {
    mac: HmacSha256,
}

impl CompletionToken {
    /// Create a signer from the shared secret.
    pub fn new(secret: &str) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes()).context("invalid secret key")?;
        Ok(Self { mac })
    }

    /// Issue a token bound to the current time.
    pub fn issue(&self) -> String {
        let timestamp = chrono::Utc::now().timestamp_millis();
        format!("{timestamp}.{}", self.sign(timestamp))
    }

    /// Verify a token against the acceptance window.
    ///
    /// Rejects malformed structure, non-numeric timestamps, signature
    /// mismatch, expired tokens, and tokens from the future (clock-skew
    /// abuse would otherwise let an attacker mint long-lived tokens).
    pub fn verify(&self, token: &str, max_age_secs: i64) -> bool {
        let Some((timestamp_str, signature)) = token.split_once('.') else {
            return false;
        };

        let Ok(timestamp) = timestamp_str.parse::<i64>() else {
            return false;
        };

        let expected = self.sign(timestamp);
        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            return false;
        }

        let age = chrono::Utc::now().timestamp_millis() - timestamp;
        (0..=max_age_secs.saturating_mul(1000)).contains(&age)
    }

    fn sign(&self, timestamp: i64) -> String {
        let mut mac = self.mac.clone();
        mac.update(timestamp.to_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionToken").finish()
    }
}
