// src/services/redis_store.rs
//! Redis-backed ephemeral store
//!
//! Uses a single multiplexed connection shared by all requests. Single-use
//! reads rely on `GETDEL`, so no two callers can observe the same value.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError};
use std::time::Duration;
use tracing::{debug, info};

use super::ephemeral_store::{EphemeralStore, StoreError};

impl From<RedisError> for StoreError {
    fn from(e: RedisError) -> Self {
        if e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout() {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::Command(e.to_string())
        }
    }
}

#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    /// Opens the connection and verifies it with a `PING`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client =
            Client::open(url).map_err(|e| StoreError::Unavailable(format!("invalid url: {}", e)))?;
        let connection = client.get_multiplexed_async_connection().await?;

        let store = Self { connection };
        store.ping().await?;

        info!("Redis ephemeral store connected");
        Ok(store)
    }
}

/// Redis expiry is whole seconds; never round a short TTL down to "no expiry"
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl EphemeralStore for RedisStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds(ttl)).await?;
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = redis::cmd("GETDEL")
            .arg(key)
            .query_async(&mut conn)
            .await?;

        debug!(found = value.is_some(), "GETDEL");
        Ok(value)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;

        if pong == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Command(format!("unexpected PING reply: {}", pong)))
        }
    }

    async fn shutdown(&self) {
        // The multiplexed connection closes once the last clone is dropped
        info!("Redis ephemeral store shut down");
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
