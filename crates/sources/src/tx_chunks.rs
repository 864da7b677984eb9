// Path: crates/sources/src/tx_chunks.rs

//! The on-chain chunk reassembly source.
//!
//! The last link of the retrieval chain: resolves the transaction's
//! weave boundary, drives the chunk reassembly producer, and windows the
//! result for regions. Bundled data items resolve to their root
//! transaction first and are served as a window over the root's stream.

use crate::range::{clamp_region, ByteRangeStream};
use async_trait::async_trait;
use futures::stream;
use std::sync::Arc;
use weave_api::{ChunkSource, ContiguousDataSource, GetDataParams, TxOffsetSource};
use weave_chain::CachedRootTxResolver;
use weave_chunks::ChunkReassemblyStream;
use weave_types::data::{ContiguousData, Region};
use weave_types::error::DataSourceError;
use weave_types::id::TxId;

/// Chunk reassembly as a data source.
pub struct TxChunksDataSource {
    offsets: Arc<dyn TxOffsetSource>,
    chunks: Arc<dyn ChunkSource>,
    root_tx: Option<Arc<CachedRootTxResolver>>,
}

impl TxChunksDataSource {
    /// Builds the source over an offset source and a chunk source.
    pub fn new(offsets: Arc<dyn TxOffsetSource>, chunks: Arc<dyn ChunkSource>) -> Self {
        Self {
            offsets,
            chunks,
            root_tx: None,
        }
    }

    /// Enables data item resolution through the root-tx cache.
    pub fn with_root_tx_resolver(mut self, resolver: Arc<CachedRootTxResolver>) -> Self {
        self.root_tx = Some(resolver);
        self
    }

    /// Resolves the id to fetch and the window to apply when `id` is a
    /// bundled data item rather than a layer-one transaction.
    async fn resolve_target(&self, id: &TxId) -> (TxId, Option<Region>) {
        if let Some(resolver) = &self.root_tx {
            match resolver.resolve(id).await {
                Ok(Some(item)) => {
                    return (
                        item.root_tx_id,
                        Some(Region {
                            offset: item.offset,
                            size: item.size,
                        }),
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(target: "sources", id = %id, error = %e, "root-tx resolution failed");
                }
            }
        }
        (*id, None)
    }
}

#[async_trait]
impl ContiguousDataSource for TxChunksDataSource {
    async fn get_data(&self, params: GetDataParams) -> Result<ContiguousData, DataSourceError> {
        if params.cancel.is_cancelled() {
            return Err(DataSourceError::Cancelled);
        }

        let (target_id, item_window) = self.resolve_target(&params.id).await;
        let placement = self.offsets.get_tx_offset(&target_id).await?;
        if !placement.is_valid() {
            return Err(DataSourceError::NotFound);
        }
        if placement.data_size == Some(0) {
            return Ok(empty_data());
        }
        // Valid placements carry every field.
        let (Some(data_root), Some(tx_size), Some(start)) = (
            placement.data_root,
            placement.data_size,
            placement.start_offset(),
        ) else {
            return Err(DataSourceError::NotFound);
        };

        let mut stream = ChunkReassemblyStream::new(
            Arc::clone(&self.chunks),
            data_root,
            tx_size,
            start,
            params.cancel.clone(),
        )
        .into_data_stream();

        // First window to the data item, then the caller's region within it.
        let mut logical_size = tx_size;
        if let Some(window) = item_window {
            let clamped = clamp_region(window, logical_size);
            logical_size = clamped.size;
            stream = ByteRangeStream::new(stream, clamped).into_data_stream();
        }
        if let Some(region) = params.region {
            let clamped = clamp_region(region, logical_size);
            logical_size = clamped.size;
            stream = ByteRangeStream::new(stream, clamped).into_data_stream();
        }

        Ok(ContiguousData {
            stream,
            size: logical_size,
            source_content_type: None,
            verified: true,
            trusted: true,
            cached: false,
        })
    }

    fn label(&self) -> &'static str {
        "tx-chunks"
    }
}

/// A source returning a zero-byte object; dataless transactions resolve
/// here rather than through the chunk pipeline.
pub(crate) fn empty_data() -> ContiguousData {
    ContiguousData {
        stream: Box::pin(stream::empty()),
        size: 0,
        source_content_type: None,
        verified: true,
        trusted: true,
        cached: false,
    }
}
