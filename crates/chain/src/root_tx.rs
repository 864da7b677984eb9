// Path: crates/chain/src/root_tx.rs

//! Data item to root transaction resolution.
//!
//! A bundled data item carries no chunks of its own: its bytes live
//! inside the root (layer-one) transaction that carried the bundle.
//! Resolving an item id to `(root_tx_id, offset, size)` lets the chunk
//! reassembly pipeline serve items by windowing the root's stream.

use std::sync::Arc;
use weave_api::{ContiguousDataIndex, KvBuffer};
use weave_kv::KvJsonStore;
use weave_telemetry::cache_metrics;
use weave_types::data::DataItemAttributes;
use weave_types::error::KvError;
use weave_types::id::TxId;

/// The KV prefix of the root-tx link cache.
pub const ROOT_TX_PREFIX: &str = "#|";

/// A read-through cache of data item placements, keyed by item id.
pub struct CachedRootTxResolver {
    index: Arc<dyn ContiguousDataIndex>,
    cache: KvJsonStore<DataItemAttributes>,
}

impl CachedRootTxResolver {
    /// Wraps the index with a cache on the shared KV backend.
    pub fn new(index: Arc<dyn ContiguousDataIndex>, kv: Arc<dyn KvBuffer>) -> Self {
        Self {
            index,
            // Placements are immutable once indexed; write-once.
            cache: KvJsonStore::new(kv, ROOT_TX_PREFIX, false),
        }
    }

    /// Resolves the root placement of `id`, or `None` when `id` is not a
    /// known data item (callers then treat `id` as a layer-one tx).
    pub async fn resolve(&self, id: &TxId) -> Result<Option<DataItemAttributes>, KvError> {
        let key = id.to_b64url();
        match self.cache.get(&key).await {
            Ok(Some(placement)) => {
                cache_metrics().inc_cache_hit("root-tx");
                return Ok(Some(placement));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(target: "chain", id = %id, error = %e, "root-tx cache read failed");
            }
        }
        cache_metrics().inc_cache_miss("root-tx");

        let placement = self.index.get_data_item_attributes(id).await?;
        if let Some(placement) = &placement {
            if let Err(e) = self.cache.set(&key, placement).await {
                cache_metrics().inc_cache_write_error("root-tx");
                tracing::warn!(target: "chain", id = %id, error = %e, "root-tx cache write failed");
            }
        }
        Ok(placement)
    }
}
