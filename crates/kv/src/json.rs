// Path: crates/kv/src/json.rs

//! A typed JSON layer over any KV buffer.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use weave_api::KvBuffer;
use weave_types::error::KvError;

/// Serializes `T` as UTF-8 JSON under a fixed key prefix.
///
/// The prefix namespaces logical stores sharing one backend. With
/// `allow_overwrite = false` the store is write-once: a `set` against an
/// existing key keeps the first value.
pub struct KvJsonStore<T> {
    kv: Arc<dyn KvBuffer>,
    prefix: &'static str,
    allow_overwrite: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> KvJsonStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    /// Builds a logical store with the given key `prefix`.
    pub fn new(kv: Arc<dyn KvBuffer>, prefix: &'static str, allow_overwrite: bool) -> Self {
        Self {
            kv,
            prefix,
            allow_overwrite,
            _marker: PhantomData,
        }
    }

    fn full_key(&self, key: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.prefix.len() + key.len());
        out.extend_from_slice(self.prefix.as_bytes());
        out.extend_from_slice(key.as_bytes());
        out
    }

    /// Reads and deserializes the value at `key`, if present.
    pub async fn get(&self, key: &str) -> Result<Option<T>, KvError> {
        match self.kv.get(&self.full_key(key)).await? {
            Some(bytes) => {
                let value =
                    serde_json::from_slice(&bytes).map_err(|e| KvError::Decode(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Serializes and writes `value` at `key`.
    ///
    /// A write-once store keeps the existing value and returns `Ok`.
    pub async fn set(&self, key: &str, value: &T) -> Result<(), KvError> {
        let full_key = self.full_key(key);
        if !self.allow_overwrite && self.kv.has(&full_key).await? {
            return Ok(());
        }
        let bytes = serde_json::to_vec(value).map_err(|e| KvError::Encode(e.to_string()))?;
        self.kv.set(&full_key, Bytes::from(bytes)).await
    }

    /// True when `key` is present.
    pub async fn has(&self, key: &str) -> Result<bool, KvError> {
        self.kv.has(&self.full_key(key)).await
    }

    /// Removes `key`, if present.
    pub async fn del(&self, key: &str) -> Result<(), KvError> {
        self.kv.del(&self.full_key(key)).await
    }
}
