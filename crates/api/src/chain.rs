// Path: crates/api/src/chain.rs

//! The chain client role consumed by the retrieval core.

use async_trait::async_trait;
use weave_types::chain::{ChainBlock, ChainChunkEnvelope, ChainTx, ChainTxOffset};
use weave_types::error::ChainError;
use weave_types::id::TxId;

/// Access to a chain node.
///
/// This is a role, not a library type: the production implementation talks
/// HTTP to a chain gateway; tests substitute in-memory fakes.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetches a transaction header.
    async fn get_tx(&self, id: &TxId) -> Result<ChainTx, ChainError>;

    /// Fetches a transaction's weave placement (size + end offset).
    async fn get_tx_offset(&self, id: &TxId) -> Result<ChainTxOffset, ChainError>;

    /// Fetches a single field of a transaction header.
    async fn get_tx_field(&self, id: &TxId, field: &str) -> Result<serde_json::Value, ChainError>;

    /// Locates the transaction owning the given weave-absolute offset.
    ///
    /// Returns `(tx_id, tx_end_offset)` or `None` when no transaction
    /// owns the offset.
    async fn find_tx_by_offset(&self, offset: u64) -> Result<Option<(TxId, u64)>, ChainError>;

    /// Fetches the block at `height`.
    async fn get_block_by_height(&self, height: u64) -> Result<ChainBlock, ChainError>;

    /// Fetches the ids of pending (unconfirmed) transactions.
    async fn get_pending_tx_ids(&self) -> Result<Vec<TxId>, ChainError>;

    /// Fetches the current chain height.
    async fn get_height(&self) -> Result<u64, ChainError>;

    /// Fetches the chunk whose first byte sits at the weave-absolute offset.
    async fn get_chunk(&self, absolute_offset: u64) -> Result<ChainChunkEnvelope, ChainError>;
}
