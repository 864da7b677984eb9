// Path: crates/chain/src/lib.rs
#![forbid(unsafe_code)]

//! # Weave Gateway Chain
//!
//! Everything that talks to (or reasons about) the chain: the HTTP chain
//! client with transient-failure retries, the offset-block mapping that
//! brackets tx-by-offset searches, the tx-offset source family, the
//! partial block header store, and the caching name and root-tx
//! resolvers.

/// Filesystem store for partial block headers (MessagePack).
pub mod block_store;
/// The reqwest-backed chain client.
pub mod client;
/// The offset-to-block mapping and search bounds.
pub mod mapping;
/// The caching name resolver.
pub mod resolver;
/// Data item to root transaction resolution.
pub mod root_tx;
/// Tx-by-offset search over block headers.
pub mod search;
/// Transaction offset sources: database, chain, composite.
pub mod tx_offset;

pub use block_store::{CachingChainClient, FsBlockStore};
pub use client::HttpChainClient;
pub use mapping::OffsetBlockMapping;
pub use resolver::CachingNameResolver;
pub use root_tx::CachedRootTxResolver;
pub use tx_offset::{ChainTxOffsetSource, CompositeTxOffsetSource, DatabaseTxOffsetSource};
