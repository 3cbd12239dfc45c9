// src/services/ephemeral_store.rs
//! Short-lived key/value storage for one-time login state and exchange codes
//!
//! Every value carries a TTL and is consumed with [`EphemeralStore::take`],
//! which reads and deletes in one atomic step so that a key can be redeemed
//! at most once even under concurrent requests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ephemeral store unavailable: {0}")]
    Unavailable(String),

    #[error("ephemeral store command failed: {0}")]
    Command(String),
}

#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value, for `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically returns and deletes the value under `key`.
    ///
    /// Returns `None` when the key is unknown, expired or already taken.
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Round-trips to the backing service.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Releases connections held by the store.
    async fn shutdown(&self);

    fn backend(&self) -> &'static str;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process store used when no Redis URL is configured and in tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Number of live (unexpired) entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    /// Whether `key` holds an unexpired value, without consuming it
    pub async fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(key)
            .map_or(false, |entry| !entry.is_expired(now))
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        // Lazy cleanup keeps abandoned login attempts from piling up
        entries.retain(|_, entry| !entry.is_expired(now));

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let removed = self.entries.write().await.remove(key);

        match removed {
            Some(entry) if !entry.is_expired(now) => Ok(Some(entry.value)),
            Some(_) => {
                debug!("Ephemeral entry already expired");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn shutdown(&self) {
        let mut entries = self.entries.write().await;
        info!(dropped = entries.len(), "Memory ephemeral store cleared");
        entries.clear();
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
