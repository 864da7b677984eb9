// Path: crates/chunks/src/lib.rs
#![forbid(unsafe_code)]

//! # Weave Gateway Chunks
//!
//! Everything between raw chunk bytes and a verified contiguous stream:
//! merkle path validation and data-root computation, the read-through
//! chunk caches (bytes on a content-addressed filesystem tree, proof
//! material in a KV store), the chunk sources that feed them, and the
//! pull-driven reassembly stream that turns a transaction's chunks back
//! into exactly `data_size` contiguous bytes.

/// Streaming data-root computation over a byte stream.
pub mod data_root;
/// Merkle tree construction, proof generation, and path validation.
pub mod merkle;
/// The chunk reassembly producer.
pub mod reassembly;
/// Chunk sources: chain, object store, composition, read-through caching.
pub mod source;
/// The content-addressed filesystem store for chunk bytes.
pub mod store_fs;
/// The KV-backed store for chunk proof material.
pub mod store_metadata;

#[cfg(test)]
pub(crate) mod testing;

pub use data_root::{compute_data_root, DataRootComputer};
pub use reassembly::ChunkReassemblyStream;
pub use source::{
    ChainChunkSource, ComposedChunkSource, ObjectStoreChunkSource, ReadThroughChunkSource,
    SequentialChunkSource,
};
pub use store_fs::FsChunkDataStore;
pub use store_metadata::KvChunkMetadataStore;
