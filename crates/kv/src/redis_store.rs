// Path: crates/kv/src/redis_store.rs

//! Networked KV backend over Redis with per-key TTL.

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use weave_api::KvBuffer;
use weave_types::error::KvError;

/// A KV buffer backed by a Redis instance.
///
/// Every `set` carries `EX ttl_seconds`, so the server owns expiry; the
/// connection manager reconnects transparently between commands.
pub struct RedisKvStore {
    conn: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisKvStore {
    /// Connects to `url` and wraps the connection in a reconnecting manager.
    pub async fn connect(url: &str, ttl_seconds: u64) -> Result<Self, KvError> {
        let client = redis::Client::open(url).map_err(|e| KvError::Backend(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?;
        Ok(Self { conn, ttl_seconds })
    }
}

#[async_trait]
impl KvBuffer for RedisKvStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>, KvError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &[u8], value: Bytes) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value.as_ref())
            .arg("EX")
            .arg(self.ttl_seconds)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))
    }

    async fn has(&self, key: &[u8]) -> Result<bool, KvError> {
        let mut conn = self.conn.clone();
        conn.exists(key)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))
    }

    async fn del(&self, key: &[u8]) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))
    }

    async fn close(&self) -> Result<(), KvError> {
        Ok(())
    }
}
