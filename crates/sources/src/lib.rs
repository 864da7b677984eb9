// Path: crates/sources/src/lib.rs
#![forbid(unsafe_code)]

//! # Weave Gateway Sources
//!
//! The source-chaining engine and its decorators. A retrieval request
//! enters the chain and each link either streams the object's bytes or
//! yields to the next link; policy decorators (filtering, sampling,
//! chaos) refuse before delegating, and the read-through cache tees
//! full-object misses into the content-addressed store.

/// The read-through contiguous data cache.
pub mod cache;
/// The chaos-injection decorator.
pub mod chaos;
/// The content-addressed store for full contiguous objects.
pub mod data_store;
/// The origin / client-IP filtering decorator.
pub mod filtered;
/// The trusted-gateway fall-through source.
pub mod gateway;
/// The byte-range windowing stream.
pub mod range;
/// The sampling decorator.
pub mod sampling;
/// The chain engine: strictly ordered fall-through.
pub mod sequential;
/// Stream adapters shared by sources.
pub mod stream_util;
/// The on-chain chunk reassembly source.
pub mod tx_chunks;

pub use cache::ReadThroughDataCache;
pub use chaos::ChaosDataSource;
pub use data_store::FsContiguousDataStore;
pub use filtered::FilteredDataSource;
pub use gateway::GatewayDataSource;
pub use range::ByteRangeStream;
pub use sampling::SamplingDataSource;
pub use sequential::SequentialDataSource;
pub use tx_chunks::TxChunksDataSource;
