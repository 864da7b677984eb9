// Path: crates/chunks/src/testing.rs

//! Shared fixtures for chunk tests: a synthetic transaction with a real
//! merkle tree and an in-memory chunk source serving its chunks.

use crate::merkle::{build_leaf, build_tree, chunk_boundaries, generate_proofs, sha256};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use weave_api::ChunkSource;
use weave_types::chunk::{Chunk, ChunkData, ChunkMetadata, ChunkSpec};
use weave_types::error::DataSourceError;
use weave_types::id::{ChunkHash, DataRoot};

/// A synthetic transaction: data, its real root, and per-leaf chunks.
pub(crate) struct FixtureTx {
    pub data: Vec<u8>,
    pub data_root: DataRoot,
    pub chunks: Vec<Chunk>,
}

/// Builds a patterned transaction of `len` bytes with valid proofs.
pub(crate) fn fixture_tx(len: usize) -> FixtureTx {
    let data: Vec<u8> = (0..len).map(|i| (i % 241) as u8).collect();
    let boundaries = chunk_boundaries(len as u64);
    let leaves: Vec<_> = boundaries
        .iter()
        .map(|(s, e)| build_leaf(sha256(&data[*s as usize..*e as usize]), *s, *e))
        .collect();
    let root = build_tree(leaves).expect("fixture tree");
    let data_root = DataRoot(root.id());
    let proofs = generate_proofs(&root);
    let chunks = boundaries
        .iter()
        .zip(proofs)
        .map(|((s, e), proof)| {
            let bytes = Bytes::copy_from_slice(&data[*s as usize..*e as usize]);
            let hash = ChunkHash(sha256(&bytes));
            Chunk {
                metadata: ChunkMetadata {
                    data_root,
                    data_size: len as u64,
                    data_path: proof.proof,
                    chunk_size: e - s,
                    offset: *s,
                    hash,
                },
                data: ChunkData {
                    hash,
                    chunk: bytes,
                    source: None,
                },
            }
        })
        .collect();
    FixtureTx {
        data,
        data_root,
        chunks,
    }
}

/// Serves a fixture transaction's chunks by relative offset.
pub(crate) struct FixtureChunkSource {
    pub tx: FixtureTx,
    pub calls: AtomicUsize,
}

impl FixtureChunkSource {
    pub fn new(tx: FixtureTx) -> Self {
        Self {
            tx,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChunkSource for FixtureChunkSource {
    async fn get_chunk(&self, spec: ChunkSpec) -> Result<Chunk, DataSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tx
            .chunks
            .iter()
            .find(|c| c.metadata.offset == spec.relative_offset)
            .cloned()
            .ok_or(DataSourceError::NotFound)
    }
}
