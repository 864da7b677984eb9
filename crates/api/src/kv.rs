// Path: crates/api/src/kv.rs

//! The uniform KV-buffer contract shared by every backend.

use async_trait::async_trait;
use bytes::Bytes;
use weave_types::error::KvError;

/// A binary-safe key/value buffer.
///
/// Backends differ in durability and TTL support (filesystem, embedded
/// log-structured DB, in-process LRU, networked store); the interface is
/// uniform so logical stores can share one backend through key prefixes.
#[async_trait]
pub trait KvBuffer: Send + Sync {
    /// Reads the value at `key`, if present.
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>, KvError>;

    /// Writes `value` at `key`, replacing any existing value.
    async fn set(&self, key: &[u8], value: Bytes) -> Result<(), KvError>;

    /// True when `key` is present.
    async fn has(&self, key: &[u8]) -> Result<bool, KvError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Removes `key`, if present.
    async fn del(&self, key: &[u8]) -> Result<(), KvError>;

    /// Flushes pending writes and releases backend resources.
    async fn close(&self) -> Result<(), KvError>;
}
