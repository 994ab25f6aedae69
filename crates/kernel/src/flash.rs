//! One-shot flash messages stored inside the session.
//!
//! Flash state lives under a single session key, never in its own store.
//! The handle borrows the owning [`Session`] and writes every mutation back
//! through it, so nothing is lost between a read and the layer's save at the
//! end of the request. Reads are destructive: a key fetched with [`Flash::get`]
//! is gone on the next request.

use std::collections::HashMap;

use anyhow::{Context, Result};
use tower_sessions::Session;

/// Session key holding the flash namespace.
const FLASH_SESSION_KEY: &str = "_flash";

/// Handle over the session's flash namespace.
pub struct Flash<'a> {
    session: &'a Session,
}

impl<'a> Flash<'a> {
    /// Create a flash handle for the given session.
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Append a message to the list stored under `key`.
    pub async fn add(&self, key: &str, message: impl Into<String>) -> Result<()> {
        let mut messages = self.read().await?;
        messages.entry(key.to_string()).or_default().push(message.into());
        self.write(messages).await
    }

    /// Return and clear the messages stored under `key`.
    ///
    /// A second call without an intervening `add` returns an empty list.
    pub async fn get(&self, key: &str) -> Result<Vec<String>> {
        let mut messages = self.read().await?;
        match messages.remove(key) {
            Some(taken) => {
                self.write(messages).await?;
                Ok(taken)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Whether any messages are stored under `key`. Does not clear.
    pub async fn has(&self, key: &str) -> Result<bool> {
        let messages = self.read().await?;
        Ok(messages.get(key).is_some_and(|list| !list.is_empty()))
    }

    /// Return and clear the entire flash namespace.
    pub async fn all(&self) -> Result<HashMap<String, Vec<String>>> {
        let messages = self.read().await?;
        if !messages.is_empty() {
            self.write(HashMap::new()).await?;
        }
        Ok(messages)
    }

    /// Replace the list stored under `key`.
    pub async fn set_all(&self, key: &str, list: Vec<String>) -> Result<()> {
        let mut messages = self.read().await?;
        messages.insert(key.to_string(), list);
        self.write(messages).await
    }

    async fn read(&self) -> Result<HashMap<String, Vec<String>>> {
        Ok(self
            .session
            .get(FLASH_SESSION_KEY)
            .await
            .context("failed to load flash messages")?
            .unwrap_or_default())
    }

    async fn write(&self, messages: HashMap<String, Vec<String>>) -> Result<()> {
        self.session
            .insert(FLASH_SESSION_KEY, messages)
            .await
            .context("failed to store flash messages")
    }
}
