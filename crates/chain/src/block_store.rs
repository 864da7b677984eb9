// Path: crates/chain/src/block_store.rs

//! Filesystem store for partial block headers.
//!
//! Headers are MessagePack records under
//! `headers/partial-blocks/hash/<h[0:2]>/<h[2:4]>/<hash>.msgpack`, with a
//! by-height alias at `headers/partial-blocks/height/<h%1000>/<h>.msgpack`
//! pointing at the hash file.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use weave_api::ChainClient;
use weave_telemetry::cache_metrics;
use weave_types::chain::{ChainBlock, ChainChunkEnvelope, ChainTx, ChainTxOffset};
use weave_types::error::{ChainError, KvError};
use weave_types::id::TxId;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// The partial block header cache.
pub struct FsBlockStore {
    base: PathBuf,
}

impl FsBlockStore {
    /// Opens (and creates, if needed) the store rooted at `base`.
    pub fn open<P: AsRef<Path>>(base: P) -> Result<Self, KvError> {
        let base = base.as_ref().to_path_buf();
        for dir in [
            "headers/partial-blocks/hash",
            "headers/partial-blocks/height",
            "headers/partial-blocks/tmp",
        ] {
            std::fs::create_dir_all(base.join(dir))
                .map_err(|e| KvError::Backend(e.to_string()))?;
        }
        Ok(Self { base })
    }

    fn hash_path(&self, hash: &str) -> PathBuf {
        let prefix_a = hash.get(0..2).unwrap_or("00");
        let prefix_b = hash.get(2..4).unwrap_or("00");
        self.base
            .join("headers/partial-blocks/hash")
            .join(prefix_a)
            .join(prefix_b)
            .join(format!("{}.msgpack", hash))
    }

    fn height_path(&self, height: u64) -> PathBuf {
        self.base
            .join("headers/partial-blocks/height")
            .join((height % 1000).to_string())
            .join(format!("{}.msgpack", height))
    }

    async fn read(path: PathBuf) -> Result<Option<ChainBlock>, KvError> {
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(KvError::Backend(e.to_string())),
        };
        let block = rmp_serde::from_slice(&bytes).map_err(|e| KvError::Decode(e.to_string()))?;
        Ok(Some(block))
    }

    /// Reads a header by block hash.
    pub async fn get_by_hash(&self, hash: &str) -> Result<Option<ChainBlock>, KvError> {
        Self::read(self.hash_path(hash)).await
    }

    /// Reads a header by height.
    pub async fn get_by_height(&self, height: u64) -> Result<Option<ChainBlock>, KvError> {
        Self::read(self.height_path(height)).await
    }

    /// Persists a header under its hash and aliases it by height.
    pub async fn put(&self, block: &ChainBlock) -> Result<(), KvError> {
        let bytes =
            rmp_serde::to_vec_named(block).map_err(|e| KvError::Encode(e.to_string()))?;

        let hash_path = self.hash_path(&block.indep_hash);
        let dir = hash_path
            .parent()
            .ok_or_else(|| KvError::Backend("hash path has no parent".to_string()))?;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?;

        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .base
            .join("headers/partial-blocks/tmp")
            .join(format!("block-{}-{}", std::process::id(), seq));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &hash_path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(KvError::Backend(e.to_string()));
        }

        let height_path = self.height_path(block.height);
        if let Some(dir) = height_path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| KvError::Backend(e.to_string()))?;
        }
        match tokio::fs::remove_file(&height_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(KvError::Backend(e.to_string())),
        }
        #[cfg(unix)]
        let aliased = tokio::fs::symlink(&hash_path, &height_path).await;
        #[cfg(not(unix))]
        let aliased = tokio::fs::copy(&hash_path, &height_path).await.map(|_| ());
        aliased.map_err(|e| KvError::Backend(e.to_string()))
    }
}

/// A chain client with a read-through block header cache.
///
/// The tx-by-offset binary search re-reads the same headers across
/// requests; serving them from disk spares the chain node. The search
/// itself runs here (with the offset mapping bracket) so its block reads
/// hit the cache; every other call delegates. Cache writes never fail
/// the lookup.
pub struct CachingChainClient {
    upstream: Arc<dyn ChainClient>,
    blocks: Arc<FsBlockStore>,
    mapping: Option<crate::mapping::OffsetBlockMapping>,
}

impl CachingChainClient {
    /// Wraps `upstream` with the block header store.
    pub fn new(
        upstream: Arc<dyn ChainClient>,
        blocks: Arc<FsBlockStore>,
        mapping: Option<crate::mapping::OffsetBlockMapping>,
    ) -> Self {
        Self {
            upstream,
            blocks,
            mapping,
        }
    }
}

#[async_trait]
impl ChainClient for CachingChainClient {
    async fn get_tx(&self, id: &TxId) -> Result<ChainTx, ChainError> {
        self.upstream.get_tx(id).await
    }

    async fn get_tx_offset(&self, id: &TxId) -> Result<ChainTxOffset, ChainError> {
        self.upstream.get_tx_offset(id).await
    }

    async fn get_tx_field(&self, id: &TxId, field: &str) -> Result<serde_json::Value, ChainError> {
        self.upstream.get_tx_field(id, field).await
    }

    async fn find_tx_by_offset(&self, offset: u64) -> Result<Option<(TxId, u64)>, ChainError> {
        crate::search::find_tx_by_offset(self, self.mapping.as_ref(), offset).await
    }

    async fn get_block_by_height(&self, height: u64) -> Result<ChainBlock, ChainError> {
        match self.blocks.get_by_height(height).await {
            Ok(Some(block)) => {
                cache_metrics().inc_cache_hit("blocks");
                return Ok(block);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(target: "chain", height, error = %e, "block cache read failed");
            }
        }
        cache_metrics().inc_cache_miss("blocks");

        let block = self.upstream.get_block_by_height(height).await?;
        if let Err(e) = self.blocks.put(&block).await {
            cache_metrics().inc_cache_write_error("blocks");
            tracing::warn!(target: "chain", height, error = %e, "block cache write failed");
        }
        Ok(block)
    }

    async fn get_pending_tx_ids(&self) -> Result<Vec<TxId>, ChainError> {
        self.upstream.get_pending_tx_ids().await
    }

    async fn get_height(&self) -> Result<u64, ChainError> {
        self.upstream.get_height().await
    }

    async fn get_chunk(&self, absolute_offset: u64) -> Result<ChainChunkEnvelope, ChainError> {
        self.upstream.get_chunk(absolute_offset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(height: u64) -> ChainBlock {
        ChainBlock {
            indep_hash: format!("hash-of-{}", height),
            height,
            weave_size: height * 1000 + 1000,
            block_size: 1000,
            txs: vec![TxId([height as u8; 32])],
        }
    }

    #[tokio::test]
    async fn round_trips_by_hash_and_height() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlockStore::open(dir.path()).unwrap();
        let b = block(123_456);

        assert!(store.get_by_height(123_456).await.unwrap().is_none());
        store.put(&b).await.unwrap();

        let by_hash = store.get_by_hash(&b.indep_hash).await.unwrap().unwrap();
        assert_eq!(by_hash.height, b.height);
        let by_height = store.get_by_height(123_456).await.unwrap().unwrap();
        assert_eq!(by_height.indep_hash, b.indep_hash);
        assert_eq!(by_height.txs, b.txs);
    }

    #[tokio::test]
    async fn caching_client_reads_through_the_store() {
        use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

        struct CountingUpstream {
            fetches: AtomicUsize,
        }

        #[async_trait]
        impl ChainClient for CountingUpstream {
            async fn get_tx(&self, _id: &TxId) -> Result<ChainTx, ChainError> {
                Err(ChainError::NotFound)
            }
            async fn get_tx_offset(&self, _id: &TxId) -> Result<ChainTxOffset, ChainError> {
                Err(ChainError::NotFound)
            }
            async fn get_tx_field(
                &self,
                _id: &TxId,
                _field: &str,
            ) -> Result<serde_json::Value, ChainError> {
                Err(ChainError::NotFound)
            }
            async fn find_tx_by_offset(
                &self,
                _offset: u64,
            ) -> Result<Option<(TxId, u64)>, ChainError> {
                Ok(None)
            }
            async fn get_block_by_height(&self, height: u64) -> Result<ChainBlock, ChainError> {
                self.fetches.fetch_add(1, AtomicOrdering::SeqCst);
                Ok(block(height))
            }
            async fn get_pending_tx_ids(&self) -> Result<Vec<TxId>, ChainError> {
                Ok(vec![])
            }
            async fn get_height(&self) -> Result<u64, ChainError> {
                Ok(0)
            }
            async fn get_chunk(
                &self,
                _absolute_offset: u64,
            ) -> Result<ChainChunkEnvelope, ChainError> {
                Err(ChainError::NotFound)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsBlockStore::open(dir.path()).unwrap());
        let upstream = Arc::new(CountingUpstream {
            fetches: AtomicUsize::new(0),
        });
        let client = CachingChainClient::new(
            Arc::clone(&upstream) as Arc<dyn ChainClient>,
            store,
            None,
        );

        let first = client.get_block_by_height(7).await.unwrap();
        let second = client.get_block_by_height(7).await.unwrap();
        assert_eq!(first.indep_hash, second.indep_hash);
        // The second read came from disk.
        assert_eq!(upstream.fetches.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn heights_fan_out_modulo_1000() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlockStore::open(dir.path()).unwrap();
        store.put(&block(1)).await.unwrap();
        store.put(&block(1001)).await.unwrap();
        assert!(dir
            .path()
            .join("headers/partial-blocks/height/1/1.msgpack")
            .exists());
        assert!(dir
            .path()
            .join("headers/partial-blocks/height/1/1001.msgpack")
            .exists());
    }
}
