// Path: crates/api/src/chunk.rs

//! Chunk retrieval and chunk cache contracts.
//!
//! Retrieval is keyed by [`ChunkSpec`] (weave-absolute plus
//! transaction-relative coordinates); caches are keyed by
//! `(data_root, relative_offset)`.

use async_trait::async_trait;
use weave_types::chunk::{Chunk, ChunkData, ChunkMetadata, ChunkSpec};
use weave_types::error::{DataSourceError, KvError};
use weave_types::id::DataRoot;

/// Produces chunk bytes for a chunk coordinate.
#[async_trait]
pub trait ChunkDataSource: Send + Sync {
    /// Fetches the chunk bytes addressed by `spec`.
    async fn get_chunk_data(&self, spec: ChunkSpec) -> Result<ChunkData, DataSourceError>;

    /// A short stable label for logs and metrics.
    fn label(&self) -> &'static str;
}

/// Produces chunk proof material for a chunk coordinate.
#[async_trait]
pub trait ChunkMetadataSource: Send + Sync {
    /// Fetches the chunk metadata addressed by `spec`.
    async fn get_chunk_metadata(&self, spec: ChunkSpec) -> Result<ChunkMetadata, DataSourceError>;
}

/// Produces a full, validated chunk (bytes + proof) for a chunk coordinate.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Fetches and validates the chunk addressed by `spec`.
    async fn get_chunk(&self, spec: ChunkSpec) -> Result<Chunk, DataSourceError>;
}

/// The chunk-bytes half of the read-through chunk cache.
#[async_trait]
pub trait ChunkDataStore: Send + Sync {
    /// True when the cache holds bytes for `(data_root, relative_offset)`.
    async fn has_chunk_data(&self, data_root: &DataRoot, relative_offset: u64) -> bool;

    /// Reads cached chunk bytes, if present.
    async fn get_chunk_data(
        &self,
        data_root: &DataRoot,
        relative_offset: u64,
    ) -> Result<Option<ChunkData>, KvError>;

    /// Writes chunk bytes. Failures are the caller's to log, never to
    /// surface to the retrieval path.
    async fn set_chunk_data(
        &self,
        data_root: &DataRoot,
        relative_offset: u64,
        data: &ChunkData,
    ) -> Result<(), KvError>;
}

/// The proof-material half of the read-through chunk cache.
#[async_trait]
pub trait ChunkMetadataStore: Send + Sync {
    /// Reads cached chunk metadata, if present.
    async fn get_chunk_metadata(
        &self,
        data_root: &DataRoot,
        relative_offset: u64,
    ) -> Result<Option<ChunkMetadata>, KvError>;

    /// Writes chunk metadata.
    async fn set_chunk_metadata(&self, metadata: &ChunkMetadata) -> Result<(), KvError>;
}
