// Path: crates/chain/src/search.rs

//! Tx-by-offset search over block headers.
//!
//! Blocks are ordered by height and `weave_size` is monotonic, so the
//! block owning a weave offset is found by binary search; the winning
//! block's transactions are then walked by their cumulative sub-ranges.

use crate::mapping::OffsetBlockMapping;
use weave_api::ChainClient;
use weave_types::chain::ChainBlock;
use weave_types::error::ChainError;
use weave_types::id::TxId;
use weave_types::offset::TxBoundary;

/// Locates the transaction owning `offset`, bracketing the block search
/// with `mapping` when one is available.
pub async fn find_tx_by_offset(
    chain: &dyn ChainClient,
    mapping: Option<&OffsetBlockMapping>,
    offset: u64,
) -> Result<Option<(TxId, u64)>, ChainError> {
    let current_height = chain.get_height().await?;
    let (mut lo, mut hi) = match mapping {
        Some(mapping) => mapping.get_search_bounds(offset, current_height),
        None => (0, current_height),
    };

    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let block = chain.get_block_by_height(mid).await?;
        if offset < block.weave_start() {
            if mid == 0 {
                break;
            }
            hi = mid - 1;
        } else if offset >= block.weave_size {
            lo = mid + 1;
        } else {
            return find_tx_in_block(chain, &block, offset).await;
        }
    }
    Ok(None)
}

/// Walks the block's transactions for the one whose weave sub-range
/// contains `offset`.
async fn find_tx_in_block(
    chain: &dyn ChainClient,
    block: &ChainBlock,
    offset: u64,
) -> Result<Option<(TxId, u64)>, ChainError> {
    for tx_id in &block.txs {
        let placement = match chain.get_tx_offset(tx_id).await {
            Ok(placement) => placement,
            // Dataless transactions have no offset entry.
            Err(ChainError::NotFound) => continue,
            Err(e) => return Err(e),
        };
        if placement.size == 0 {
            continue;
        }
        let boundary = TxBoundary {
            start: placement.offset - placement.size + 1,
            end: placement.offset,
        };
        if boundary.contains(offset) {
            return Ok(Some((*tx_id, placement.offset)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use weave_types::chain::{ChainChunkEnvelope, ChainTx, ChainTxOffset};

    /// A synthetic chain: block `h` spans 1000 bytes of weave and holds
    /// two 500-byte transactions.
    struct FakeChain {
        height: u64,
        block_fetches: AtomicUsize,
    }

    // The first 8 id bytes encode (height, slot) as height * 2 + slot.
    fn tx_id(n: u64) -> TxId {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&n.to_be_bytes());
        TxId(bytes)
    }

    fn tx_seq(id: &TxId) -> u64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&id.0[..8]);
        u64::from_be_bytes(head)
    }

    #[async_trait]
    impl ChainClient for FakeChain {
        async fn get_tx(&self, _id: &TxId) -> Result<ChainTx, ChainError> {
            Err(ChainError::NotFound)
        }

        async fn get_tx_offset(&self, id: &TxId) -> Result<ChainTxOffset, ChainError> {
            let n = tx_seq(id);
            let height = n / 2;
            let slot = n % 2;
            Ok(ChainTxOffset {
                size: 500,
                offset: height * 1000 + slot * 500 + 499,
            })
        }

        async fn get_tx_field(
            &self,
            _id: &TxId,
            _field: &str,
        ) -> Result<serde_json::Value, ChainError> {
            Err(ChainError::NotFound)
        }

        async fn find_tx_by_offset(&self, _offset: u64) -> Result<Option<(TxId, u64)>, ChainError> {
            unreachable!("the search under test never recurses")
        }

        async fn get_block_by_height(&self, height: u64) -> Result<ChainBlock, ChainError> {
            self.block_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(ChainBlock {
                indep_hash: format!("block-{}", height),
                height,
                weave_size: (height + 1) * 1000,
                block_size: 1000,
                txs: vec![tx_id(height * 2), tx_id(height * 2 + 1)],
            })
        }

        async fn get_pending_tx_ids(&self) -> Result<Vec<TxId>, ChainError> {
            Ok(vec![])
        }

        async fn get_height(&self) -> Result<u64, ChainError> {
            Ok(self.height)
        }

        async fn get_chunk(&self, _absolute_offset: u64) -> Result<ChainChunkEnvelope, ChainError> {
            Err(ChainError::NotFound)
        }
    }

    #[tokio::test]
    async fn locates_the_owning_transaction() {
        let chain = FakeChain {
            height: 99,
            block_fetches: AtomicUsize::new(0),
        };
        // Offset 42_700 lives in block 42, second transaction.
        let found = find_tx_by_offset(&chain, None, 42_700).await.unwrap();
        assert_eq!(found, Some((tx_id(85), 42_999)));
        // First transaction of the same block.
        let found = find_tx_by_offset(&chain, None, 42_100).await.unwrap();
        assert_eq!(found, Some((tx_id(84), 42_499)));
    }

    #[tokio::test]
    async fn offsets_past_the_weave_miss() {
        let chain = FakeChain {
            height: 9,
            block_fetches: AtomicUsize::new(0),
        };
        assert_eq!(find_tx_by_offset(&chain, None, 50_000).await.unwrap(), None);
    }

    #[tokio::test]
    async fn mapping_bracket_reduces_block_fetches() {
        use crate::mapping::OffsetInterval;

        let chain = FakeChain {
            height: 99_999,
            block_fetches: AtomicUsize::new(0),
        };
        let mapping = OffsetBlockMapping {
            version: 1,
            generated_at: String::new(),
            current_height: 99_999,
            current_weave_size: 100_000_000,
            interval_bytes: 10_000_000,
            intervals: vec![
                OffsetInterval { offset: 0, block_height: 0 },
                OffsetInterval { offset: 50_000_000, block_height: 50_000 },
                OffsetInterval { offset: 50_010_000, block_height: 50_010 },
            ],
        };

        let found = find_tx_by_offset(&chain, Some(&mapping), 50_005_500)
            .await
            .unwrap();
        assert_eq!(found, Some((tx_id(50_005 * 2 + 1), 50_005_999)));
        // log2(10 blocks) fetches instead of log2(100k).
        assert!(chain.block_fetches.load(Ordering::SeqCst) <= 5);
    }
}
