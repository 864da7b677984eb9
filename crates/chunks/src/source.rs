// Path: crates/chunks/src/source.rs

//! Chunk sources: chain, object store, composition, and read-through caching.
//!
//! Every source validates before emission: chunk bytes must hash to the
//! declared digest, the digest must match the proof's leaf record, and
//! the proof must anchor to the transaction's data root over the claimed
//! byte range.

use crate::merkle::{path_chunk_hash, sha256, validate_path, ValidatedPath};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use weave_api::{
    ChainClient, ChunkDataSource, ChunkDataStore, ChunkMetadataSource, ChunkMetadataStore,
    ChunkSource, ObjectStore,
};
use weave_telemetry::cache_metrics;
use weave_types::chunk::{Chunk, ChunkData, ChunkMetadata, ChunkSpec};
use weave_types::error::DataSourceError;
use weave_types::id::ChunkHash;

/// Validates a chunk's bytes and proof against its spec.
///
/// Returns the validated placement so callers can derive metadata fields
/// from the proof rather than trusting the upstream's claims.
pub fn validate_chunk(
    spec: &ChunkSpec,
    metadata: &ChunkMetadata,
    data: &ChunkData,
) -> Result<ValidatedPath, DataSourceError> {
    let digest = ChunkHash(sha256(&data.chunk));
    if digest != data.hash {
        return Err(DataSourceError::DataCorrupt(format!(
            "chunk bytes hash to {} but declare {}",
            digest, data.hash
        )));
    }
    if digest != metadata.hash {
        return Err(DataSourceError::DataCorrupt(format!(
            "chunk digest {} does not match metadata digest {}",
            digest, metadata.hash
        )));
    }
    let leaf_hash = path_chunk_hash(&metadata.data_path)
        .map_err(|e| DataSourceError::DataCorrupt(e.to_string()))?;
    if leaf_hash != digest {
        return Err(DataSourceError::DataCorrupt(
            "proof leaf does not commit to the chunk digest".to_string(),
        ));
    }
    let validated = validate_path(
        &spec.data_root,
        spec.relative_offset,
        0,
        spec.tx_size,
        &metadata.data_path,
    )
    .map_err(|e| DataSourceError::DataCorrupt(e.to_string()))?;
    if data.chunk.len() as u64 != validated.chunk_size {
        return Err(DataSourceError::DataCorrupt(format!(
            "chunk is {} bytes but the proof covers {}",
            data.chunk.len(),
            validated.chunk_size
        )));
    }
    Ok(validated)
}

// --- Chain source ---

/// Fetches chunks from the chain node by weave-absolute offset.
pub struct ChainChunkSource {
    chain: Arc<dyn ChainClient>,
}

impl ChainChunkSource {
    /// Wraps the chain client.
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl ChunkSource for ChainChunkSource {
    async fn get_chunk(&self, spec: ChunkSpec) -> Result<Chunk, DataSourceError> {
        let envelope = self.chain.get_chunk(spec.absolute_offset).await?;
        let chunk_bytes = envelope
            .decode_chunk()
            .map_err(DataSourceError::DataCorrupt)?;
        let data_path = envelope
            .decode_data_path()
            .map_err(DataSourceError::DataCorrupt)?;

        let data = ChunkData {
            hash: ChunkHash(sha256(&chunk_bytes)),
            chunk: Bytes::from(chunk_bytes),
            source: Some("chain".to_string()),
        };
        let mut metadata = ChunkMetadata {
            data_root: spec.data_root,
            data_size: spec.tx_size,
            data_path,
            chunk_size: data.chunk.len() as u64,
            offset: spec.relative_offset,
            hash: data.hash,
        };
        let validated = validate_chunk(&spec, &metadata, &data)?;
        metadata.offset = validated.left_bound;
        metadata.chunk_size = validated.chunk_size;
        Ok(Chunk { metadata, data })
    }
}

// --- Object store source ---

/// Fetches chunk bytes from an S3-shaped object store.
///
/// Objects live at `[prefix/]<data_root>/<relative_offset>`.
pub struct ObjectStoreChunkSource {
    store: Arc<dyn ObjectStore>,
    prefix: Option<String>,
}

impl ObjectStoreChunkSource {
    /// Wraps the object store with an optional key prefix.
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Option<String>) -> Self {
        Self { store, prefix }
    }

    fn key(&self, spec: &ChunkSpec) -> String {
        match &self.prefix {
            Some(prefix) => format!(
                "{}/{}/{}",
                prefix.trim_end_matches('/'),
                spec.data_root,
                spec.relative_offset
            ),
            None => format!("{}/{}", spec.data_root, spec.relative_offset),
        }
    }
}

#[async_trait]
impl ChunkDataSource for ObjectStoreChunkSource {
    async fn get_chunk_data(&self, spec: ChunkSpec) -> Result<ChunkData, DataSourceError> {
        let bytes = self.store.get_object(&self.key(&spec)).await?;
        Ok(ChunkData {
            hash: ChunkHash(sha256(&bytes)),
            chunk: bytes,
            source: Some("object-store".to_string()),
        })
    }

    fn label(&self) -> &'static str {
        "object-store"
    }
}

// --- Composition ---

/// Pairs a bytes-only source with a metadata source into a full,
/// validated chunk source.
pub struct ComposedChunkSource {
    data: Arc<dyn ChunkDataSource>,
    metadata: Arc<dyn ChunkMetadataSource>,
}

impl ComposedChunkSource {
    /// Combines the two halves.
    pub fn new(data: Arc<dyn ChunkDataSource>, metadata: Arc<dyn ChunkMetadataSource>) -> Self {
        Self { data, metadata }
    }
}

#[async_trait]
impl ChunkSource for ComposedChunkSource {
    async fn get_chunk(&self, spec: ChunkSpec) -> Result<Chunk, DataSourceError> {
        let metadata = self.metadata.get_chunk_metadata(spec).await?;
        let data = self.data.get_chunk_data(spec).await?;
        validate_chunk(&spec, &metadata, &data)?;
        Ok(Chunk { metadata, data })
    }
}

/// Tries an ordered list of chunk sources, returning the first success.
///
/// Order expresses precedence exactly as the contiguous-data chain does;
/// the last failure is surfaced when every source misses.
pub struct SequentialChunkSource {
    sources: Vec<Arc<dyn ChunkSource>>,
}

impl SequentialChunkSource {
    /// Builds the ordered fallback list.
    pub fn new(sources: Vec<Arc<dyn ChunkSource>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl ChunkSource for SequentialChunkSource {
    async fn get_chunk(&self, spec: ChunkSpec) -> Result<Chunk, DataSourceError> {
        for source in &self.sources {
            match source.get_chunk(spec).await {
                Ok(chunk) => return Ok(chunk),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::debug!(
                        target: "chunks",
                        data_root = %spec.data_root,
                        relative_offset = spec.relative_offset,
                        error = %e,
                        "chunk source failed, trying next"
                    );
                }
            }
        }
        Err(DataSourceError::NoSourceAvailable)
    }
}

// --- Read-through cache ---

/// The read-through chunk cache: bytes and proofs are looked up locally,
/// fetched upstream on a miss, validated, and written back.
///
/// Cache-write failures are logged and counted but never surfaced; a
/// damaged cache entry (failing validation) is treated as a miss and
/// repaired from upstream.
pub struct ReadThroughChunkSource {
    data_store: Arc<dyn ChunkDataStore>,
    metadata_store: Arc<dyn ChunkMetadataStore>,
    upstream: Arc<dyn ChunkSource>,
}

impl ReadThroughChunkSource {
    /// Assembles the cache over its two stores and the upstream source.
    pub fn new(
        data_store: Arc<dyn ChunkDataStore>,
        metadata_store: Arc<dyn ChunkMetadataStore>,
        upstream: Arc<dyn ChunkSource>,
    ) -> Self {
        Self {
            data_store,
            metadata_store,
            upstream,
        }
    }

    async fn cached(&self, spec: &ChunkSpec) -> Option<Chunk> {
        let metadata = self
            .metadata_store
            .get_chunk_metadata(&spec.data_root, spec.relative_offset)
            .await
            .ok()??;
        let data = self
            .data_store
            .get_chunk_data(&spec.data_root, spec.relative_offset)
            .await
            .ok()??;
        match validate_chunk(spec, &metadata, &data) {
            Ok(_) => Some(Chunk { metadata, data }),
            Err(e) => {
                tracing::warn!(
                    target: "chunks",
                    data_root = %spec.data_root,
                    relative_offset = spec.relative_offset,
                    error = %e,
                    "cached chunk failed validation, refetching"
                );
                None
            }
        }
    }

    async fn fill(&self, chunk: &Chunk) {
        if let Err(e) = self
            .data_store
            .set_chunk_data(&chunk.metadata.data_root, chunk.metadata.offset, &chunk.data)
            .await
        {
            cache_metrics().inc_cache_write_error("chunk-data");
            tracing::warn!(target: "chunks", error = %e, "chunk data cache write failed");
        }
        if let Err(e) = self.metadata_store.set_chunk_metadata(&chunk.metadata).await {
            cache_metrics().inc_cache_write_error("chunk-metadata");
            tracing::warn!(target: "chunks", error = %e, "chunk metadata cache write failed");
        }
    }
}

#[async_trait]
impl ChunkSource for ReadThroughChunkSource {
    async fn get_chunk(&self, spec: ChunkSpec) -> Result<Chunk, DataSourceError> {
        if let Some(chunk) = self.cached(&spec).await {
            cache_metrics().inc_cache_hit("chunk");
            return Ok(chunk);
        }
        cache_metrics().inc_cache_miss("chunk");
        let chunk = self.upstream.get_chunk(spec).await?;
        self.fill(&chunk).await;
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store_fs::FsChunkDataStore;
    use crate::store_metadata::KvChunkMetadataStore;
    use crate::testing::{fixture_tx, FixtureChunkSource, FixtureTx};
    use std::sync::atomic::Ordering;
    use weave_kv::LruKvStore;

    fn spec_for(tx: &FixtureTx, relative_offset: u64) -> ChunkSpec {
        ChunkSpec {
            tx_size: tx.data.len() as u64,
            absolute_offset: relative_offset,
            data_root: tx.data_root,
            relative_offset,
        }
    }

    #[test]
    fn validation_accepts_fixture_chunks() {
        let tx = fixture_tx(weave_types::MAX_CHUNK_SIZE + 100_000);
        for chunk in &tx.chunks {
            let spec = spec_for(&tx, chunk.metadata.offset);
            let validated = validate_chunk(&spec, &chunk.metadata, &chunk.data).unwrap();
            assert_eq!(validated.left_bound, chunk.metadata.offset);
        }
    }

    #[test]
    fn validation_rejects_tampered_bytes() {
        let tx = fixture_tx(4096);
        let mut chunk = tx.chunks[0].clone();
        let mut bytes = chunk.data.chunk.to_vec();
        bytes[0] ^= 0xff;
        chunk.data.chunk = Bytes::from(bytes);
        let spec = spec_for(&tx, 0);
        assert!(matches!(
            validate_chunk(&spec, &chunk.metadata, &chunk.data),
            Err(DataSourceError::DataCorrupt(_))
        ));
    }

    #[tokio::test]
    async fn sequential_falls_through_to_the_second_source() {
        struct Failing;
        #[async_trait]
        impl ChunkSource for Failing {
            async fn get_chunk(&self, _spec: ChunkSpec) -> Result<Chunk, DataSourceError> {
                Err(DataSourceError::Transient("boom".into()))
            }
        }

        let tx = fixture_tx(1000);
        let spec = spec_for(&tx, 0);
        let fixture = FixtureChunkSource::new(tx);
        let seq = SequentialChunkSource::new(vec![
            Arc::new(Failing) as Arc<dyn ChunkSource>,
            Arc::new(fixture),
        ]);
        let chunk = seq.get_chunk(spec).await.unwrap();
        assert_eq!(chunk.metadata.offset, 0);
    }

    #[tokio::test]
    async fn read_through_hits_skip_the_upstream() {
        let dir = tempfile::tempdir().unwrap();
        let tx = fixture_tx(2048);
        let spec = spec_for(&tx, 0);
        let upstream = Arc::new(FixtureChunkSource::new(tx));
        let cache = ReadThroughChunkSource::new(
            Arc::new(FsChunkDataStore::open(dir.path()).unwrap()),
            Arc::new(KvChunkMetadataStore::new(Arc::new(
                LruKvStore::new(64, 3600).unwrap(),
            ))),
            Arc::clone(&upstream) as Arc<dyn ChunkSource>,
        );

        cache.get_chunk(spec).await.unwrap();
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
        cache.get_chunk(spec).await.unwrap();
        // Second read was served from the cache.
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }
}
