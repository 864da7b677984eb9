// Path: crates/types/src/chunk.rs

//! Chunk payloads, chunk metadata, and chunk addressing.

use crate::id::{ChunkHash, DataRoot};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A chunk's bytes together with its content digest.
///
/// Invariant: `SHA-256(chunk) == hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkData {
    /// SHA-256 digest of `chunk`.
    pub hash: ChunkHash,
    /// The chunk bytes.
    pub chunk: Bytes,
    /// Provenance tag of the backend that produced the chunk.
    pub source: Option<String>,
}

/// The proof material authenticating a chunk against its data root.
///
/// Invariants: the `data_path` leaf digest (bytes `len-64 .. len-32`)
/// equals `hash`, and walking the path from `data_root` over
/// `[offset, data_size)` succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Merkle root of the owning transaction.
    pub data_root: DataRoot,
    /// Total data size of the owning transaction.
    pub data_size: u64,
    /// The merkle proof for this chunk.
    pub data_path: Vec<u8>,
    /// Size of the chunk in bytes.
    pub chunk_size: u64,
    /// Offset of the chunk's first byte relative to the transaction.
    pub offset: u64,
    /// SHA-256 digest of the chunk bytes.
    pub hash: ChunkHash,
}

/// A chunk with its validated metadata, as emitted by chunk sources.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Proof material and placement.
    pub metadata: ChunkMetadata,
    /// Payload bytes.
    pub data: ChunkData,
}

/// Coordinates identifying one chunk of one transaction.
///
/// `absolute_offset` addresses the chunk on the weave; `relative_offset`
/// addresses it within the transaction. Chunk caches key on
/// `(data_root, relative_offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpec {
    /// Total data size of the owning transaction.
    pub tx_size: u64,
    /// Weave-absolute offset of the chunk's first byte.
    pub absolute_offset: u64,
    /// Merkle root of the owning transaction.
    pub data_root: DataRoot,
    /// Offset of the chunk's first byte relative to the transaction.
    pub relative_offset: u64,
}
