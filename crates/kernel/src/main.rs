//! Contatto Kernel
//!
//! HTTP server for the three-step contact form flow.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use contatto_kernel::config::Config;
use contatto_kernel::state::AppState;
use contatto_kernel::{middleware, routes, session};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    info!("Starting Contatto kernel");

    // Load configuration from environment. Unknown backend or verifier
    // selectors fail here, before the server binds.
    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        port = config.port,
        environment = %config.environment,
        "Configuration loaded"
    );

    let state = AppState::new(&config).context("failed to initialize application state")?;

    // Create session layer for the configured backend
    let session_layer = session::create_session_layer(&config)
        .await
        .context("failed to create session layer")?;

    // Build the router.
    // Middleware layers (last added = first executed in request flow):
    // TraceLayer → session → csrf cookie → no-store headers → routes
    let app = Router::new()
        .merge(routes::contact::router())
        .merge(routes::health::router())
        .layer(axum::middleware::from_fn(middleware::no_store))
        .layer(axum::middleware::from_fn(middleware::issue_csrf_cookie))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
