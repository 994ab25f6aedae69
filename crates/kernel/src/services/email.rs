//! Email delivery service using lettre/SMTP.

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Email delivery service.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
}

impl Mailer {
    /// Create a new mailer.
    ///
    /// `encryption` controls the SMTP transport mode:
    /// - `"starttls"` (default): Opportunistic STARTTLS on port 587
    /// - `"tls"`: Implicit TLS (SMTPS) on port 465
    /// - `"none"`: Unencrypted (for local dev only)
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        smtp_username: Option<&str>,
        smtp_password: Option<&str>,
        encryption: &str,
        from_email: String,
    ) -> Result<Self> {
        let mut builder = match encryption {
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)
                .context("failed to create SMTP relay transport")?
                .port(smtp_port),
            "none" => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host).port(smtp_port)
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
                .context("failed to create SMTP STARTTLS transport")?
                .port(smtp_port),
        };

        if let (Some(user), Some(pass)) = (smtp_username, smtp_password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        let transport = builder.build();

        Ok(Self {
            transport,
            from_email,
        })
    }

    /// Send a plain-text email.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .context("invalid from email address")?,
            )
            .to(to.parse().context("invalid recipient email address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("failed to build email message")?;

        self.transport
            .send(email)
            .await
            .context("failed to send email")?;

        Ok(())
    }
}
