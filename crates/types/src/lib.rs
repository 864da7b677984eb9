// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # Weave Gateway Types
//!
//! This crate is the foundational library for the weave gateway, containing
//! the core data structures, error types, and configuration objects shared
//! by every other crate in the workspace.
//!
//! ## Architectural Role
//!
//! As the base crate, `weave-types` has minimal dependencies and is itself a
//! dependency for almost every other crate in the workspace. This structure
//! prevents circular dependencies and provides a stable, canonical
//! definition for shared types like [`TxId`](crate::id::TxId),
//! [`ContiguousData`](crate::data::ContiguousData), and the retrieval error
//! taxonomy.

/// The maximum size in bytes of a single data chunk on the weave.
pub const MAX_CHUNK_SIZE: usize = 256 * 1024; // 256 KiB
/// The minimum size in bytes of a chunk produced by the tail-balancing rule.
pub const MIN_CHUNK_SIZE: usize = 32 * 1024; // 32 KiB

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::DataSourceError> = std::result::Result<T, E>;

/// Wire-format types returned by chain gateway nodes.
pub mod chain;
/// Chunk payloads, chunk metadata, and chunk addressing.
pub mod chunk;
/// Base64url encoding helpers used for identifiers and digests.
pub mod codec;
/// Shared configuration structures for gateway components.
pub mod config;
/// Retrieval results, byte regions, and request attributes.
pub mod data;
/// Core error types for the weave gateway.
pub mod error;
/// Content-addressed identifiers and digests.
pub mod id;
/// Transaction placement on the weave: boundaries and offset records.
pub mod offset;
