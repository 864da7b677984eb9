// Path: crates/chunks/src/merkle.rs

//! Merkle tree construction, proof generation, and path validation.
//!
//! The tree commits to a transaction's chunks. Every leaf hashes the
//! chunk's SHA-256 together with a 32-byte big-endian note carrying the
//! chunk's end offset; every interior node hashes its children together
//! with the split offset. A proof (`data_path`) is the root-to-leaf walk:
//! repeated `[left ‖ right ‖ note]` interior records terminated by a
//! `[data_hash ‖ note]` leaf record, so the final 64..32 bytes of any
//! valid proof are the chunk's own digest.

use sha2::{Digest, Sha256};
use thiserror::Error;
use weave_types::id::{ChunkHash, DataRoot};
use weave_types::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};

/// Size in bytes of a node digest.
pub const HASH_SIZE: usize = 32;
/// Size in bytes of an offset note.
pub const NOTE_SIZE: usize = 32;

/// Errors raised while validating a merkle path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// The proof bytes do not re-derive the expected root.
    #[error("merkle path does not anchor to the data root")]
    InvalidProof,
    /// The proof length is not a whole number of records.
    #[error("malformed merkle path of {0} bytes")]
    MalformedPath(usize),
    /// The claimed data size leaves nothing to prove.
    #[error("empty byte range")]
    EmptyRange,
}

/// A successfully validated chunk placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedPath {
    /// Offset of the chunk's last byte, relative to the transaction.
    pub offset: u64,
    /// Offset of the chunk's first byte.
    pub left_bound: u64,
    /// Exclusive end offset of the chunk.
    pub right_bound: u64,
    /// Chunk size implied by the bounds.
    pub chunk_size: u64,
}

pub(crate) fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn hash_pair(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(sha256(part));
    }
    hasher.finalize().into()
}

/// Encodes an offset as a 32-byte big-endian note.
pub fn offset_note(value: u64) -> [u8; NOTE_SIZE] {
    let mut note = [0u8; NOTE_SIZE];
    note[NOTE_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
    note
}

fn note_value(note: &[u8]) -> u64 {
    // Values beyond u64 cannot occur on a well-formed weave; the leading
    // bytes of an oversized note simply fail the containment checks later.
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&note[NOTE_SIZE - 8..]);
    u64::from_be_bytes(tail)
}

// --- Tree construction ---

/// A leaf committing to one chunk.
#[derive(Debug, Clone)]
pub struct LeafNode {
    /// The leaf digest.
    pub id: [u8; 32],
    /// SHA-256 of the chunk bytes.
    pub data_hash: [u8; 32],
    /// Offset of the chunk's first byte.
    pub min_byte_range: u64,
    /// Exclusive end offset of the chunk.
    pub max_byte_range: u64,
}

/// An interior node committing to two subtrees split at `byte_range`.
#[derive(Debug, Clone)]
pub struct BranchNode {
    /// The node digest.
    pub id: [u8; 32],
    /// The split offset: every byte below it lives in the left subtree.
    pub byte_range: u64,
    /// Exclusive end offset of the subtree.
    pub max_byte_range: u64,
    /// Left child.
    pub left: Box<MerkleNode>,
    /// Right child.
    pub right: Box<MerkleNode>,
}

/// A node of the chunk tree.
#[derive(Debug, Clone)]
pub enum MerkleNode {
    /// A chunk leaf.
    Leaf(LeafNode),
    /// An interior node.
    Branch(BranchNode),
}

impl MerkleNode {
    /// The node digest.
    pub fn id(&self) -> [u8; 32] {
        match self {
            MerkleNode::Leaf(leaf) => leaf.id,
            MerkleNode::Branch(branch) => branch.id,
        }
    }

    fn max_byte_range(&self) -> u64 {
        match self {
            MerkleNode::Leaf(leaf) => leaf.max_byte_range,
            MerkleNode::Branch(branch) => branch.max_byte_range,
        }
    }
}

/// The half-open byte ranges produced by the chunking rule.
///
/// Chunks are cut at `MAX_CHUNK_SIZE`; when the remainder after a cut
/// would land in `(0, MIN_CHUNK_SIZE)`, the cut is rebalanced to
/// `ceil(remaining / 2)` so no tail chunk is ever smaller than
/// `MIN_CHUNK_SIZE`. Zero-length data yields one empty chunk.
pub fn chunk_boundaries(len: u64) -> Vec<(u64, u64)> {
    let max = MAX_CHUNK_SIZE as u64;
    let min = MIN_CHUNK_SIZE as u64;
    let mut boundaries = Vec::new();
    let mut cursor = 0u64;
    let mut rest = len;
    while rest >= max {
        let mut cut = max;
        let next = rest - max;
        if next > 0 && next < min {
            cut = rest.div_ceil(2);
        }
        boundaries.push((cursor, cursor + cut));
        cursor += cut;
        rest -= cut;
    }
    if rest > 0 || boundaries.is_empty() {
        boundaries.push((cursor, cursor + rest));
    }
    boundaries
}

/// Builds the leaf for a chunk's digest and byte range.
pub fn build_leaf(data_hash: [u8; 32], min_byte_range: u64, max_byte_range: u64) -> LeafNode {
    let id = hash_pair(&[&data_hash, &offset_note(max_byte_range)]);
    LeafNode {
        id,
        data_hash,
        min_byte_range,
        max_byte_range,
    }
}

fn build_branch(left: MerkleNode, right: MerkleNode) -> BranchNode {
    let byte_range = left.max_byte_range();
    let max_byte_range = right.max_byte_range();
    let id = hash_pair(&[&left.id(), &right.id(), &offset_note(byte_range)]);
    BranchNode {
        id,
        byte_range,
        max_byte_range,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Folds a layer of leaves into the tree root node.
pub fn build_tree(leaves: Vec<LeafNode>) -> Option<MerkleNode> {
    let mut layer: Vec<MerkleNode> = leaves.into_iter().map(MerkleNode::Leaf).collect();
    if layer.is_empty() {
        return None;
    }
    while layer.len() > 1 {
        let mut next = Vec::with_capacity(layer.len().div_ceil(2));
        let mut nodes = layer.into_iter();
        while let Some(left) = nodes.next() {
            match nodes.next() {
                Some(right) => next.push(MerkleNode::Branch(build_branch(left, right))),
                // An odd node is promoted unchanged.
                None => next.push(left),
            }
        }
        layer = next;
    }
    layer.pop()
}

/// Computes the data root of fully-buffered bytes.
pub fn buffered_data_root(data: &[u8]) -> DataRoot {
    let leaves = chunk_boundaries(data.len() as u64)
        .into_iter()
        .map(|(start, end)| {
            let hash = sha256(&data[start as usize..end as usize]);
            build_leaf(hash, start, end)
        })
        .collect();
    match build_tree(leaves) {
        Some(root) => DataRoot(root.id()),
        None => DataRoot([0u8; 32]),
    }
}

/// A generated proof for one leaf.
#[derive(Debug, Clone)]
pub struct Proof {
    /// Offset of the chunk's last byte.
    pub offset: u64,
    /// The proof bytes (`data_path`).
    pub proof: Vec<u8>,
}

/// Generates the proof for every leaf, in leaf order.
pub fn generate_proofs(root: &MerkleNode) -> Vec<Proof> {
    fn walk(node: &MerkleNode, prefix: &[u8], out: &mut Vec<Proof>) {
        match node {
            MerkleNode::Leaf(leaf) => {
                let mut proof = Vec::with_capacity(prefix.len() + HASH_SIZE + NOTE_SIZE);
                proof.extend_from_slice(prefix);
                proof.extend_from_slice(&leaf.data_hash);
                proof.extend_from_slice(&offset_note(leaf.max_byte_range));
                out.push(Proof {
                    offset: leaf.max_byte_range.saturating_sub(1),
                    proof,
                });
            }
            MerkleNode::Branch(branch) => {
                let mut partial =
                    Vec::with_capacity(prefix.len() + 2 * HASH_SIZE + NOTE_SIZE);
                partial.extend_from_slice(prefix);
                partial.extend_from_slice(&branch.left.id());
                partial.extend_from_slice(&branch.right.id());
                partial.extend_from_slice(&offset_note(branch.byte_range));
                walk(&branch.left, &partial, out);
                walk(&branch.right, &partial, out);
            }
        }
    }
    let mut proofs = Vec::new();
    walk(root, &[], &mut proofs);
    proofs
}

/// Validates a `data_path` against a data root.
///
/// Walks the proof from the root, descending left or right of each split
/// until the terminal leaf record, and re-derives every digest on the
/// way. `dest` is the byte offset being located (clamped into
/// `[0, right_bound)`), and the returned bounds describe the chunk that
/// owns it.
pub fn validate_path(
    id: &DataRoot,
    dest: u64,
    left_bound: u64,
    right_bound: u64,
    path: &[u8],
) -> Result<ValidatedPath, MerkleError> {
    if right_bound == 0 {
        return Err(MerkleError::EmptyRange);
    }
    let dest = dest.min(right_bound - 1);

    let mut expected: [u8; 32] = id.0;
    let mut dest = dest;
    let mut left_bound = left_bound;
    let mut right_bound = right_bound;
    let mut rest = path;

    loop {
        if rest.len() == HASH_SIZE + NOTE_SIZE {
            let data_hash = &rest[..HASH_SIZE];
            let note = &rest[HASH_SIZE..];
            let leaf_id = hash_pair(&[data_hash, note]);
            if leaf_id != expected {
                return Err(MerkleError::InvalidProof);
            }
            return Ok(ValidatedPath {
                offset: right_bound - 1,
                left_bound,
                right_bound,
                chunk_size: right_bound - left_bound,
            });
        }
        if rest.len() < 2 * HASH_SIZE + NOTE_SIZE {
            return Err(MerkleError::MalformedPath(path.len()));
        }

        let left = &rest[..HASH_SIZE];
        let right = &rest[HASH_SIZE..2 * HASH_SIZE];
        let note = &rest[2 * HASH_SIZE..2 * HASH_SIZE + NOTE_SIZE];
        let branch_id = hash_pair(&[left, right, note]);
        if branch_id != expected {
            return Err(MerkleError::InvalidProof);
        }

        let split = note_value(note);
        if dest < split {
            expected.copy_from_slice(left);
            right_bound = right_bound.min(split);
        } else {
            expected.copy_from_slice(right);
            left_bound = left_bound.max(split);
        }
        dest = dest.min(right_bound.saturating_sub(1));
        rest = &rest[2 * HASH_SIZE + NOTE_SIZE..];
    }
}

/// Extracts the chunk digest committed by a proof's leaf record.
pub fn path_chunk_hash(path: &[u8]) -> Result<ChunkHash, MerkleError> {
    if path.len() < HASH_SIZE + NOTE_SIZE {
        return Err(MerkleError::MalformedPath(path.len()));
    }
    let start = path.len() - HASH_SIZE - NOTE_SIZE;
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&path[start..start + HASH_SIZE]);
    Ok(ChunkHash(hash))
}
