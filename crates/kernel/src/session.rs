//! Session management with selectable persistence backends.
//!
//! Two backends satisfy identical external behavior and differ only in the
//! persistence medium: an in-process memory store and a remote Redis store
//! whose records carry a server-side expiry. The backend is chosen once at
//! startup from configuration; an unknown selector already failed in
//! [`crate::config::Config::from_env`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use fred::prelude::*;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore};
use tower_sessions_redis_store::RedisStore;

use crate::config::{Config, SessionBackend};

/// Session expiry on inactivity (2 hours).
pub const SESSION_EXPIRY_HOURS: i64 = 2;

/// Session store backend, selected once at startup.
#[derive(Debug, Clone)]
pub enum BackendStore {
    Memory(MemoryStore),
    Redis(RedisStore<Pool>),
}

#[async_trait]
impl SessionStore for BackendStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        match self {
            BackendStore::Memory(store) => store.create(record).await,
            BackendStore::Redis(store) => store.create(record).await,
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        match self {
            BackendStore::Memory(store) => store.save(record).await,
            BackendStore::Redis(store) => store.save(record).await,
        }
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        match self {
            BackendStore::Memory(store) => store.load(session_id).await,
            BackendStore::Redis(store) => store.load(session_id).await,
        }
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        match self {
            BackendStore::Memory(store) => store.delete(session_id).await,
            BackendStore::Redis(store) => store.delete(session_id).await,
        }
    }
}

/// Create the session layer for the configured backend.
pub async fn create_session_layer(config: &Config) -> Result<SessionManagerLayer<BackendStore>> {
    let store = match config.session_backend {
        SessionBackend::Memory => BackendStore::Memory(MemoryStore::default()),
        SessionBackend::Redis => {
            let redis_config = fred::prelude::Config::from_url(&config.redis_url)
                .context("failed to parse Redis URL")?;

            let pool = Builder::from_config(redis_config)
                .build_pool(1)
                .context("failed to create Redis pool")?;

            pool.init()
                .await
                .context("failed to connect to Redis for sessions")?;

            BackendStore::Redis(RedisStore::new(pool))
        }
    };

    let session_layer = SessionManagerLayer::new(store)
        .with_name(format!("{}_session", config.session_namespace))
        .with_secure(!config.debug) // Cookie only sent over HTTPS outside debug
        .with_http_only(true) // Cookie not accessible via JavaScript
        .with_same_site(SameSite::Lax) // Top-level navigations still carry the cookie
        .with_expiry(Expiry::OnInactivity(Duration::hours(SESSION_EXPIRY_HOURS)));

    Ok(session_layer)
}
