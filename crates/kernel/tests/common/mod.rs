#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! [`TestApp`] assembles the REAL router, middleware stack, and state —
//! only the outbound bot verification call is substituted, and SMTP goes
//! to a local [`SmtpStub`] speaking just enough of the protocol for
//! lettre to deliver.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use http_body_util::BodyExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower::ServiceExt;

use async_trait::async_trait;
use contatto_kernel::config::{
    BotVerifyConfig, BotVerifyKind, CompletionGuard, Config, SessionBackend,
};
use contatto_kernel::verify::{BotVerifier, BotVerifyError, Verification};
use contatto_kernel::{AppState, middleware, routes, session};

/// Bot verifier returning a canned outcome, or a protocol error when
/// given no verification at all.
pub struct StubVerifier {
    outcome: Option<Verification>,
}

impl StubVerifier {
    /// Verifier that accepts every token.
    pub fn passing() -> Arc<Self> {
        Arc::new(Self {
            outcome: Some(Verification {
                score: 0.9,
                success: true,
                errors: vec![],
            }),
        })
    }

    /// Verifier that rejects every token with the given score.
    pub fn rejecting(score: f32) -> Arc<Self> {
        Arc::new(Self {
            outcome: Some(Verification {
                score,
                success: false,
                errors: vec!["score below threshold".to_string()],
            }),
        })
    }

    /// Verifier whose upstream is unreachable.
    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self { outcome: None })
    }
}

#[async_trait]
impl BotVerifier for StubVerifier {
    async fn verify(&self, _token: &str) -> Result<Verification, BotVerifyError> {
        match &self.outcome {
            Some(verification) => Ok(verification.clone()),
            None => Err(BotVerifyError::Protocol("stub outage".to_string())),
        }
    }
}

/// Minimal SMTP listener accepting every message.
///
/// Handles one command pipeline per connection: greeting, EHLO, MAIL,
/// RCPT, DATA, QUIT. Enough for lettre's unencrypted transport; anything
/// fancier belongs in a real integration environment.
pub struct SmtpStub {
    pub port: u16,
    messages: Arc<AtomicUsize>,
    recipients: Arc<Mutex<Vec<String>>>,
}

impl SmtpStub {
    /// Bind on an ephemeral port and serve connections in the background.
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let messages = Arc::new(AtomicUsize::new(0));
        let recipients = Arc::new(Mutex::new(Vec::new()));

        let counter = messages.clone();
        let rcpt_log = recipients.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let counter = counter.clone();
                let rcpt_log = rcpt_log.clone();
                tokio::spawn(async move {
                    let _ = serve_smtp(stream, counter, rcpt_log).await;
                });
            }
        });

        Self {
            port,
            messages,
            recipients,
        }
    }

    /// Number of messages accepted so far.
    pub fn message_count(&self) -> usize {
        self.messages.load(Ordering::SeqCst)
    }

    /// Recipient addresses in acceptance order.
    pub async fn recipients(&self) -> Vec<String> {
        self.recipients.lock().await.clone()
    }
}

async fn serve_smtp(
    stream: tokio::net::TcpStream,
    messages: Arc<AtomicUsize>,
    recipients: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    write_half.write_all(b"220 stub ESMTP\r\n").await?;

    let mut line = String::new();
    let mut in_data = false;

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let trimmed = line.trim_end();

        if in_data {
            if trimmed == "." {
                in_data = false;
                messages.fetch_add(1, Ordering::SeqCst);
                write_half.write_all(b"250 OK queued\r\n").await?;
            }
            continue;
        }

        let command = trimmed.to_ascii_uppercase();
        if command.starts_with("EHLO") || command.starts_with("HELO") {
            write_half.write_all(b"250-stub\r\n250 OK\r\n").await?;
        } else if command.starts_with("MAIL") {
            write_half.write_all(b"250 OK\r\n").await?;
        } else if command.starts_with("RCPT") {
            if let Some(address) = trimmed
                .split_once('<')
                .and_then(|(_, rest)| rest.split_once('>'))
                .map(|(address, _)| address.to_string())
            {
                recipients.lock().await.push(address);
            }
            write_half.write_all(b"250 OK\r\n").await?;
        } else if command.starts_with("DATA") {
            in_data = true;
            write_half
                .write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n")
                .await?;
        } else if command.starts_with("QUIT") {
            write_half.write_all(b"221 Bye\r\n").await?;
            return Ok(());
        } else {
            write_half.write_all(b"250 OK\r\n").await?;
        }
    }
}

/// Test configuration pointing mail at the given local SMTP port.
pub fn test_config(completion_guard: CompletionGuard, smtp_port: u16) -> Config {
    Config {
        port: 0,
        debug: true,
        environment: "test".to_string(),
        site_url: "http://localhost:3000".to_string(),
        smtp_host: "127.0.0.1".to_string(),
        smtp_port,
        smtp_username: None,
        smtp_password: None,
        smtp_encryption: "none".to_string(),
        mail_from_email: "noreply@example.com".to_string(),
        mail_admin_email: "admin@example.com".to_string(),
        mail_admin_subject: "New contact form submission".to_string(),
        mail_reply_subject: "Thank you for contacting us".to_string(),
        bot_verify: BotVerifyConfig {
            kind: BotVerifyKind::Score,
            site_key: "test-site-key".to_string(),
            secret_key: "test-secret-key".to_string(),
            threshold: 0.5,
            project_id: None,
        },
        session_backend: SessionBackend::Memory,
        session_namespace: "contatto_test".to_string(),
        redis_url: "redis://127.0.0.1:6379".to_string(),
        completion_guard,
        completion_token_secret: "test-completion-secret".to_string(),
    }
}

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub smtp: SmtpStub,
}

impl TestApp {
    /// Build an app with a passing verifier and the session-flag guard.
    pub async fn new() -> Self {
        Self::with_parts(CompletionGuard::SessionFlag, StubVerifier::passing()).await
    }

    /// Build an app with an explicit guard and verifier.
    pub async fn with_parts(
        completion_guard: CompletionGuard,
        verifier: Arc<dyn BotVerifier>,
    ) -> Self {
        let smtp = SmtpStub::spawn().await;
        let config = test_config(completion_guard, smtp.port);

        let state = AppState::with_verifier(&config, verifier).expect("failed to build AppState");

        let session_layer = session::create_session_layer(&config)
            .await
            .expect("failed to create session layer");

        // Must match the layer stack in main.rs.
        let router = Router::new()
            .merge(routes::contact::router())
            .merge(routes::health::router())
            .layer(axum::middleware::from_fn(middleware::no_store))
            .layer(axum::middleware::from_fn(middleware::issue_csrf_cookie))
            .layer(session_layer)
            .with_state(state.clone());

        Self {
            router,
            state,
            smtp,
        }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("failed to send request")
    }
}

/// Cookie jar accumulating Set-Cookie values across responses.
#[derive(Default)]
pub struct CookieJar {
    cookies: HashMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record cookies set on a response.
    pub fn update(&mut self, response: &Response) {
        for value in response.headers().get_all(header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let Some(pair) = raw.split(';').next() else {
                continue;
            };
            if let Some((name, value)) = pair.split_once('=') {
                self.cookies
                    .insert(name.trim().to_string(), value.trim().to_string());
            }
        }
    }

    /// Pre-seed a cookie, e.g. a known CSRF token.
    pub fn set(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    /// Render the Cookie header value.
    pub fn header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Collect a response body as a string.
pub async fn body_string(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("body is not UTF-8")
}

/// Build a urlencoded form body from field pairs.
pub fn form_body(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{}={}", urlencode(name), urlencode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}
