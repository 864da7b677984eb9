// Path: crates/chunks/src/store_metadata.rs

//! KV-backed store for chunk proof material.
//!
//! Records are bincode-serialized [`ChunkMetadata`] keyed by
//! `CM|<data_root>|<relative_offset>`, so any KV backend can host the
//! metadata cache alongside other logical stores.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use weave_api::{ChunkMetadataSource, ChunkMetadataStore, KvBuffer};
use weave_types::chunk::{ChunkMetadata, ChunkSpec};
use weave_types::error::{DataSourceError, KvError};
use weave_types::id::DataRoot;

const PREFIX: &str = "CM|";

/// The chunk-metadata cache over any KV buffer.
pub struct KvChunkMetadataStore {
    kv: Arc<dyn KvBuffer>,
}

impl KvChunkMetadataStore {
    /// Wraps the shared KV backend.
    pub fn new(kv: Arc<dyn KvBuffer>) -> Self {
        Self { kv }
    }

    fn key(data_root: &DataRoot, relative_offset: u64) -> Vec<u8> {
        format!("{}{}|{}", PREFIX, data_root.to_b64url(), relative_offset).into_bytes()
    }
}

#[async_trait]
impl ChunkMetadataStore for KvChunkMetadataStore {
    async fn get_chunk_metadata(
        &self,
        data_root: &DataRoot,
        relative_offset: u64,
    ) -> Result<Option<ChunkMetadata>, KvError> {
        match self.kv.get(&Self::key(data_root, relative_offset)).await? {
            Some(bytes) => {
                let metadata =
                    bincode::deserialize(&bytes).map_err(|e| KvError::Decode(e.to_string()))?;
                Ok(Some(metadata))
            }
            None => Ok(None),
        }
    }

    async fn set_chunk_metadata(&self, metadata: &ChunkMetadata) -> Result<(), KvError> {
        let bytes = bincode::serialize(metadata).map_err(|e| KvError::Encode(e.to_string()))?;
        self.kv
            .set(
                &Self::key(&metadata.data_root, metadata.offset),
                Bytes::from(bytes),
            )
            .await
    }
}

/// Serves cached metadata through the source contract, so composed chunk
/// sources can pair object-store bytes with locally-known proofs.
#[async_trait]
impl ChunkMetadataSource for KvChunkMetadataStore {
    async fn get_chunk_metadata(&self, spec: ChunkSpec) -> Result<ChunkMetadata, DataSourceError> {
        let found =
            ChunkMetadataStore::get_chunk_metadata(self, &spec.data_root, spec.relative_offset)
                .await
                .map_err(|e| DataSourceError::Fatal(e.to_string()))?;
        found.ok_or(DataSourceError::NotFound)
    }
}
