// Path: crates/chain/src/resolver.rs

//! The caching name resolver.
//!
//! A read-through TTL cache over the upstream resolver role. Each record
//! carries its own TTL from the registry, so cache residency is judged
//! per entry rather than store-wide.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use weave_api::{NameResolution, NameResolver};
use weave_kv::KvJsonStore;
use weave_telemetry::cache_metrics;
use weave_types::error::DataSourceError;

/// The KV prefix of the name resolution cache.
pub const NAME_CACHE_PREFIX: &str = "arns|";

/// A cached resolution plus the moment it was cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResolution {
    /// The upstream resolution, including its TTL.
    pub resolution: NameResolution,
    /// Unix seconds when the record was cached.
    pub cached_at_unix: u64,
}

/// A read-through cache over a name resolver.
pub struct CachingNameResolver {
    upstream: Arc<dyn NameResolver>,
    cache: KvJsonStore<CachedResolution>,
}

impl CachingNameResolver {
    /// Wraps `upstream` with a cache on the shared KV backend.
    pub fn new(upstream: Arc<dyn NameResolver>, cache: KvJsonStore<CachedResolution>) -> Self {
        Self { upstream, cache }
    }

    /// Builds the cache store for this resolver on a KV backend.
    pub fn cache_on(kv: Arc<dyn weave_api::KvBuffer>) -> KvJsonStore<CachedResolution> {
        KvJsonStore::new(kv, NAME_CACHE_PREFIX, true)
    }

    fn now_unix() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

#[async_trait]
impl NameResolver for CachingNameResolver {
    async fn resolve_name(&self, name: &str) -> Result<Option<NameResolution>, DataSourceError> {
        match self.cache.get(name).await {
            Ok(Some(cached)) => {
                let age = Self::now_unix().saturating_sub(cached.cached_at_unix);
                if age < cached.resolution.ttl_seconds {
                    cache_metrics().inc_cache_hit("arns");
                    return Ok(Some(cached.resolution));
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(target: "chain", name, error = %e, "name cache read failed");
            }
        }
        cache_metrics().inc_cache_miss("arns");

        let resolved = self.upstream.resolve_name(name).await?;
        if let Some(resolution) = &resolved {
            let record = CachedResolution {
                resolution: resolution.clone(),
                cached_at_unix: Self::now_unix(),
            };
            if let Err(e) = self.cache.set(name, &record).await {
                cache_metrics().inc_cache_write_error("arns");
                tracing::warn!(target: "chain", name, error = %e, "name cache write failed");
            }
        }
        Ok(resolved)
    }
}
