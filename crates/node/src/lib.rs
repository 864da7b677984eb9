// Path: crates/node/src/lib.rs
#![forbid(unsafe_code)]

//! # Weave Gateway Node
//!
//! The composition root: loads configuration, builds the KV backend,
//! stores, sources, and workers in leaf-first order, and wires the
//! retrieval chain the gateway binary serves from.

/// Leaf-first construction of the retrieval system.
pub mod assembly;
/// Configuration loading.
pub mod config;
/// The KV-backed contiguous data index.
pub mod index;

pub use assembly::{Collaborators, System};
pub use config::load_config;
pub use index::KvDataIndex;
