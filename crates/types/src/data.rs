// Path: crates/types/src/data.rs

//! Retrieval results, byte regions, and request attributes.

use crate::error::DataSourceError;
use crate::id::{DataHash, DataRoot, TxId};
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;

/// A finite, single-consumption sequence of byte buffers.
///
/// Streams are created per request and are not restartable; consumers must
/// observe either normal end, an error item, or cancellation.
pub type DataStream = Pin<Box<dyn Stream<Item = Result<Bytes, DataSourceError>> + Send>>;

/// A requested byte window relative to the logical object, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// First byte of the window.
    pub offset: u64,
    /// Number of bytes in the window.
    pub size: u64,
}

impl Region {
    /// The exclusive end offset of the window.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

/// Opaque client-supplied request metadata.
///
/// Consumed by the filtering and sampling decorators only; every other
/// source passes it through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestAttributes {
    /// The requesting gateway or client origin, if forwarded.
    pub origin: Option<String>,
    /// The client IP address as reported by the edge.
    pub client_ip: Option<String>,
    /// Number of gateway hops this request has already traversed.
    pub hops: Option<u32>,
}

/// A successful retrieval: a byte stream plus its provenance.
///
/// Invariant: the sum of bytes emitted by `stream` equals `size` on
/// successful consumption, and `verified == true` implies the merkle root
/// of the emitted bytes matches an authoritative data root.
pub struct ContiguousData {
    /// The object's bytes, emitted in order.
    pub stream: DataStream,
    /// Total number of bytes `stream` will emit.
    pub size: u64,
    /// Upstream-reported content type, if any.
    pub source_content_type: Option<String>,
    /// Whether the bytes are covered by a validated merkle proof.
    pub verified: bool,
    /// Whether the bytes came from a source the operator trusts.
    pub trusted: bool,
    /// Whether the bytes were served from the local cache.
    pub cached: bool,
}

impl fmt::Debug for ContiguousData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContiguousData")
            .field("size", &self.size)
            .field("source_content_type", &self.source_content_type)
            .field("verified", &self.verified)
            .field("trusted", &self.trusted)
            .field("cached", &self.cached)
            .finish_non_exhaustive()
    }
}

/// Persisted attributes of a contiguous object, keyed by its id.
///
/// Written once by the attribute importer on first retrieval and consulted
/// by the read-through data cache on every subsequent request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContiguousDataAttributes {
    /// SHA-256 of the full object, the content address in the data store.
    pub hash: Option<DataHash>,
    /// The object's merkle data root, when known.
    pub data_root: Option<DataRoot>,
    /// Total object size in bytes.
    pub size: u64,
    /// Upstream-reported content type.
    pub content_type: Option<String>,
    /// Whether the object's root has been verified against the chain.
    pub verified: bool,
}

/// Placement of a bundled data item inside its root transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItemAttributes {
    /// The root (layer-one) transaction carrying the item.
    pub root_tx_id: TxId,
    /// Byte offset of the item's payload within the root transaction.
    pub offset: u64,
    /// Payload size of the item in bytes.
    pub size: u64,
}
