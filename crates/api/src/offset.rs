// Path: crates/api/src/offset.rs

//! The transaction offset source contract.

use async_trait::async_trait;
use weave_types::error::ChainError;
use weave_types::id::TxId;
use weave_types::offset::TxDataOffset;

/// Resolves a transaction's weave placement `(data_root, size, offset)`.
///
/// Implementations differ in trust and cost: the local index is cheapest,
/// the chain node is authoritative. Sources that swallow upstream errors
/// return [`TxDataOffset::unset`] so callers can fall through.
#[async_trait]
pub trait TxOffsetSource: Send + Sync {
    /// Resolves the placement of `id`, or an all-unset record on a miss.
    async fn get_tx_offset(&self, id: &TxId) -> Result<TxDataOffset, ChainError>;
}
