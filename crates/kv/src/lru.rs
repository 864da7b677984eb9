// Path: crates/kv/src/lru.rs

//! In-process bounded LRU backend with per-entry TTL. Not durable.

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use weave_api::KvBuffer;
use weave_types::error::KvError;

/// A volatile KV buffer bounded by `max_keys` with lazy TTL expiry.
///
/// Entries older than `ttl` are dropped on read; the LRU bound evicts the
/// coldest entries on write.
pub struct LruKvStore {
    cache: Mutex<LruCache<Vec<u8>, (Bytes, Instant)>>,
    ttl: Duration,
}

impl LruKvStore {
    /// Builds a store holding at most `max_keys` entries for `ttl_seconds`.
    pub fn new(max_keys: usize, ttl_seconds: u64) -> Result<Self, KvError> {
        let capacity = NonZeroUsize::new(max_keys)
            .ok_or_else(|| KvError::Backend("max_keys must be at least 1".to_string()))?;
        Ok(Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::from_secs(ttl_seconds),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<Vec<u8>, (Bytes, Instant)>>, KvError> {
        self.cache
            .lock()
            .map_err(|_| KvError::Backend("lru cache poisoned".to_string()))
    }
}

#[async_trait]
impl KvBuffer for LruKvStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>, KvError> {
        let mut cache = self.lock()?;
        let hit = cache
            .get(key)
            .map(|(value, stored)| (value.clone(), *stored));
        match hit {
            Some((_, stored)) if stored.elapsed() >= self.ttl => {
                cache.pop(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &[u8], value: Bytes) -> Result<(), KvError> {
        self.lock()?.put(key.to_vec(), (value, Instant::now()));
        Ok(())
    }

    async fn del(&self, key: &[u8]) -> Result<(), KvError> {
        self.lock()?.pop(key);
        Ok(())
    }

    async fn close(&self) -> Result<(), KvError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bounded_by_max_keys() {
        let store = LruKvStore::new(2, 3600).unwrap();
        store.set(b"a", Bytes::from_static(b"1")).await.unwrap();
        store.set(b"b", Bytes::from_static(b"2")).await.unwrap();
        store.set(b"c", Bytes::from_static(b"3")).await.unwrap();
        // "a" was coldest and is gone.
        assert_eq!(store.get(b"a").await.unwrap(), None);
        assert!(store.get(b"b").await.unwrap().is_some());
        assert!(store.get(b"c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn zero_ttl_expires_immediately() {
        let store = LruKvStore::new(8, 0).unwrap();
        store.set(b"k", Bytes::from_static(b"v")).await.unwrap();
        assert_eq!(store.get(b"k").await.unwrap(), None);
    }

    #[test]
    fn rejects_zero_capacity() {
        assert!(LruKvStore::new(0, 60).is_err());
    }
}
