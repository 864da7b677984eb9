// Path: crates/types/src/chain.rs

//! Wire-format types returned by chain gateway nodes.
//!
//! Chain nodes serialize large integers as JSON strings and all binary
//! material as unpadded base64url, so the numeric fields here accept
//! either representation.

use crate::codec::b64url_decode;
use crate::id::{DataRoot, TxId};
use serde::{Deserialize, Deserializer, Serialize};

/// Accepts a u64 encoded either as a JSON number or a decimal string.
pub fn stringy_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Accepts a data root that may be absent or the empty string (dataless
/// transactions serialize an empty `data_root`).
fn optional_data_root<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DataRoot>, D::Error> {
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// A transaction header as served by `GET /tx/{id}`.
///
/// Only the fields the retrieval core consumes are modeled; the rest of
/// the header passes through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTx {
    /// The transaction id.
    pub id: TxId,
    /// Merkle root over the transaction's chunks; absent for dataless txs.
    #[serde(default, deserialize_with = "optional_data_root")]
    pub data_root: Option<DataRoot>,
    /// Total data size in bytes.
    #[serde(deserialize_with = "stringy_u64", default)]
    pub data_size: u64,
}

/// The response of `GET /tx/{id}/offset`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChainTxOffset {
    /// Total data size in bytes.
    #[serde(deserialize_with = "stringy_u64")]
    pub size: u64,
    /// Weave-absolute end offset of the transaction's data.
    #[serde(deserialize_with = "stringy_u64")]
    pub offset: u64,
}

/// A block header restricted to the fields the offset search consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainBlock {
    /// The block's independent hash, base64url.
    pub indep_hash: String,
    /// Block height.
    pub height: u64,
    /// Weave size after this block: the end offset of its last byte.
    #[serde(deserialize_with = "stringy_u64")]
    pub weave_size: u64,
    /// Bytes this block added to the weave.
    #[serde(deserialize_with = "stringy_u64")]
    pub block_size: u64,
    /// Ids of the transactions in this block, in weave order.
    #[serde(default)]
    pub txs: Vec<TxId>,
}

impl ChainBlock {
    /// Weave-absolute offset of this block's first byte.
    pub fn weave_start(&self) -> u64 {
        self.weave_size.saturating_sub(self.block_size)
    }

    /// True when `offset` falls inside `[weave_start, weave_size)`.
    ///
    /// A block with `block_size == 0` owns no offsets.
    pub fn contains_offset(&self, offset: u64) -> bool {
        self.weave_start() <= offset && offset < self.weave_size
    }
}

/// A chunk envelope as served by `GET /chunk/{absolute_offset}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainChunkEnvelope {
    /// Base64url chunk bytes.
    pub chunk: String,
    /// Base64url merkle proof for the chunk.
    pub data_path: String,
    /// Base64url proof of the transaction within the block, unused here.
    #[serde(default)]
    pub tx_path: Option<String>,
}

impl ChainChunkEnvelope {
    /// Decodes the chunk bytes out of the envelope.
    pub fn decode_chunk(&self) -> Result<Vec<u8>, String> {
        b64url_decode(&self.chunk)
    }

    /// Decodes the merkle proof out of the envelope.
    pub fn decode_data_path(&self) -> Result<Vec<u8>, String> {
        b64url_decode(&self.data_path)
    }
}
