// Path: crates/chain/src/tx_offset.rs

//! Transaction offset sources.
//!
//! Three composable variants: the local persistent index (cheap), the
//! chain node (authoritative, errors swallowed to all-unset so callers
//! can fall through), and the composite that prefers a valid primary
//! result and otherwise consults the fallback.

use async_trait::async_trait;
use std::sync::Arc;
use weave_api::{ChainClient, TxOffsetSource};
use weave_kv::KvJsonStore;
use weave_types::error::ChainError;
use weave_types::id::TxId;
use weave_types::offset::TxDataOffset;

/// The KV prefix of the persisted tx-offset index.
pub const TX_OFFSET_PREFIX: &str = "H|";

/// Looks placements up in the local persistent index.
///
/// Inherits the index's error semantics: a backend failure propagates.
pub struct DatabaseTxOffsetSource {
    store: Arc<KvJsonStore<TxDataOffset>>,
}

impl DatabaseTxOffsetSource {
    /// Wraps the offset index store.
    pub fn new(store: Arc<KvJsonStore<TxDataOffset>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TxOffsetSource for DatabaseTxOffsetSource {
    async fn get_tx_offset(&self, id: &TxId) -> Result<TxDataOffset, ChainError> {
        match self.store.get(&id.to_b64url()).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Ok(TxDataOffset::unset()),
            Err(e) => Err(ChainError::Transport(e.to_string())),
        }
    }
}

/// Resolves placements against the chain node.
///
/// Every upstream failure is converted into the all-unset record: this
/// source never errors, it only misses.
pub struct ChainTxOffsetSource {
    chain: Arc<dyn ChainClient>,
}

impl ChainTxOffsetSource {
    /// Wraps the chain client.
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl TxOffsetSource for ChainTxOffsetSource {
    async fn get_tx_offset(&self, id: &TxId) -> Result<TxDataOffset, ChainError> {
        let placement = match self.chain.get_tx_offset(id).await {
            Ok(placement) => placement,
            Err(e) => {
                tracing::debug!(target: "chain", id = %id, error = %e, "tx offset lookup failed");
                return Ok(TxDataOffset::unset());
            }
        };
        let tx = match self.chain.get_tx(id).await {
            Ok(tx) => tx,
            Err(e) => {
                tracing::debug!(target: "chain", id = %id, error = %e, "tx header lookup failed");
                return Ok(TxDataOffset::unset());
            }
        };
        let Some(data_root) = tx.data_root else {
            return Ok(TxDataOffset::unset());
        };
        Ok(TxDataOffset {
            id: Some(*id),
            data_root: Some(data_root),
            data_size: Some(placement.size),
            offset: Some(placement.offset),
        })
    }
}

/// Prefers a valid primary result, then the fallback's result (valid or
/// not) when fallback is enabled and present.
///
/// Primary and fallback *errors* both propagate; only result validity is
/// judged here.
pub struct CompositeTxOffsetSource {
    primary: Arc<dyn TxOffsetSource>,
    fallback: Option<Arc<dyn TxOffsetSource>>,
    fallback_enabled: bool,
}

impl CompositeTxOffsetSource {
    /// Combines the primary with an optional fallback.
    pub fn new(
        primary: Arc<dyn TxOffsetSource>,
        fallback: Option<Arc<dyn TxOffsetSource>>,
        fallback_enabled: bool,
    ) -> Self {
        Self {
            primary,
            fallback,
            fallback_enabled,
        }
    }
}

#[async_trait]
impl TxOffsetSource for CompositeTxOffsetSource {
    async fn get_tx_offset(&self, id: &TxId) -> Result<TxDataOffset, ChainError> {
        let primary = self.primary.get_tx_offset(id).await?;
        if primary.is_valid() {
            return Ok(primary);
        }
        if self.fallback_enabled {
            if let Some(fallback) = &self.fallback {
                // Returned regardless of validity; callers must cope
                // with all-unset records.
                return fallback.get_tx_offset(id).await;
            }
        }
        Ok(primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_kv::LruKvStore;
    use weave_types::id::DataRoot;

    struct Fixed(TxDataOffset);

    #[async_trait]
    impl TxOffsetSource for Fixed {
        async fn get_tx_offset(&self, _id: &TxId) -> Result<TxDataOffset, ChainError> {
            Ok(self.0)
        }
    }

    struct Erroring;

    #[async_trait]
    impl TxOffsetSource for Erroring {
        async fn get_tx_offset(&self, _id: &TxId) -> Result<TxDataOffset, ChainError> {
            Err(ChainError::Transient("index down".into()))
        }
    }

    fn valid() -> TxDataOffset {
        TxDataOffset {
            id: Some(TxId([1u8; 32])),
            data_root: Some(DataRoot([2u8; 32])),
            data_size: Some(100),
            offset: Some(999),
        }
    }

    #[tokio::test]
    async fn composite_prefers_a_valid_primary() {
        let composite = CompositeTxOffsetSource::new(
            Arc::new(Fixed(valid())),
            Some(Arc::new(Fixed(TxDataOffset::unset()))),
            true,
        );
        let id = TxId([0u8; 32]);
        assert!(composite.get_tx_offset(&id).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn composite_falls_back_on_invalid_primary() {
        let composite = CompositeTxOffsetSource::new(
            Arc::new(Fixed(TxDataOffset::unset())),
            Some(Arc::new(Fixed(valid()))),
            true,
        );
        let id = TxId([0u8; 32]);
        assert!(composite.get_tx_offset(&id).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn composite_returns_invalid_fallback_results_verbatim() {
        let composite = CompositeTxOffsetSource::new(
            Arc::new(Fixed(TxDataOffset::unset())),
            Some(Arc::new(Fixed(TxDataOffset::unset()))),
            true,
        );
        let id = TxId([0u8; 32]);
        assert!(!composite.get_tx_offset(&id).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn composite_without_fallback_returns_the_primary_result() {
        let composite =
            CompositeTxOffsetSource::new(Arc::new(Fixed(TxDataOffset::unset())), None, true);
        let id = TxId([0u8; 32]);
        assert!(!composite.get_tx_offset(&id).await.unwrap().is_valid());

        let disabled = CompositeTxOffsetSource::new(
            Arc::new(Fixed(TxDataOffset::unset())),
            Some(Arc::new(Fixed(valid()))),
            false,
        );
        assert!(!disabled.get_tx_offset(&id).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn composite_propagates_errors() {
        let id = TxId([0u8; 32]);
        let primary_err =
            CompositeTxOffsetSource::new(Arc::new(Erroring), Some(Arc::new(Fixed(valid()))), true);
        assert!(primary_err.get_tx_offset(&id).await.is_err());

        let fallback_err = CompositeTxOffsetSource::new(
            Arc::new(Fixed(TxDataOffset::unset())),
            Some(Arc::new(Erroring)),
            true,
        );
        assert!(fallback_err.get_tx_offset(&id).await.is_err());
    }

    #[tokio::test]
    async fn database_source_reads_imported_records() {
        let kv = Arc::new(LruKvStore::new(16, 3600).unwrap());
        let store = Arc::new(KvJsonStore::new(kv, TX_OFFSET_PREFIX, true));
        let record = valid();
        let id = record.id.unwrap();
        store.set(&id.to_b64url(), &record).await.unwrap();

        let source = DatabaseTxOffsetSource::new(store);
        assert_eq!(source.get_tx_offset(&id).await.unwrap(), record);
        // Misses are all-unset, not errors.
        let missing = TxId([7u8; 32]);
        assert!(!source.get_tx_offset(&missing).await.unwrap().is_valid());
    }
}
