// Path: crates/api/src/lib.rs
#![forbid(unsafe_code)]

//! # Weave Gateway API
//!
//! Capability trait surfaces for the retrieval core. Every seam between
//! components is an explicit trait defined here: data sources, chunk
//! sources, offset sources, KV buffers, and the external collaborators
//! (chain client, index, object store, name resolver).
//!
//! ## Architectural Role
//!
//! Decorators and composites hold exactly one (or an ordered list of)
//! `Arc<dyn Trait>` inner value of the same interface, so the composition
//! root can assemble chains without concrete-type coupling, and workers can
//! hold back-references to sources through an interface rather than the
//! concrete type.

pub mod chain;
pub mod chunk;
pub mod index;
pub mod ingest;
pub mod kv;
pub mod object_store;
pub mod offset;
pub mod resolver;
pub mod source;

pub use chain::ChainClient;
pub use chunk::{ChunkDataSource, ChunkDataStore, ChunkMetadataSource, ChunkMetadataStore, ChunkSource};
pub use index::ContiguousDataIndex;
pub use ingest::{AttributeImportSink, VerificationSink};
pub use kv::KvBuffer;
pub use object_store::ObjectStore;
pub use offset::TxOffsetSource;
pub use resolver::{NameResolution, NameResolver};
pub use source::{ContiguousDataSource, GetDataParams};
