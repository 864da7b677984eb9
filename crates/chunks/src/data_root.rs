// Path: crates/chunks/src/data_root.rs

//! Streaming data-root computation.
//!
//! Recomputes a transaction's merkle root without materialising the
//! object: bytes are folded into chunk leaves as they arrive, and only a
//! bounded leftover buffer (at most `MAX_CHUNK_SIZE + MIN_CHUNK_SIZE`
//! bytes) is held back, because the tail-balancing rule can reshape the
//! final two cuts once the true end of the stream is known.

use crate::merkle::{build_leaf, build_tree, sha256, LeafNode};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use weave_types::data::DataStream;
use weave_types::error::DataSourceError;
use weave_types::id::DataRoot;
use weave_types::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};

/// Incremental data-root computation with tail-balanced chunking.
#[derive(Default)]
pub struct DataRootComputer {
    leftover: BytesMut,
    leaves: Vec<LeafNode>,
    cursor: u64,
}

impl DataRootComputer {
    /// Starts a fresh computation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds the next bytes of the stream into the computation.
    pub fn update(&mut self, buf: &[u8]) {
        self.leftover.extend_from_slice(buf);
        // A full cut is only safe while at least MIN_CHUNK_SIZE would
        // remain buffered afterwards; shorter leftovers may still need
        // the rebalanced tail cut once EOF is known.
        while self.leftover.len() >= MAX_CHUNK_SIZE + MIN_CHUNK_SIZE {
            let chunk = self.leftover.split_to(MAX_CHUNK_SIZE);
            self.push_leaf(&chunk);
        }
    }

    fn push_leaf(&mut self, chunk: &[u8]) {
        let start = self.cursor;
        let end = start + chunk.len() as u64;
        self.leaves.push(build_leaf(sha256(chunk), start, end));
        self.cursor = end;
    }

    /// Flushes the leftover, builds the tree, and returns the root.
    pub fn finalize(mut self) -> DataRoot {
        let mut rest = self.leftover.split();
        while rest.len() >= MAX_CHUNK_SIZE {
            let mut cut = MAX_CHUNK_SIZE;
            let next = rest.len() - MAX_CHUNK_SIZE;
            if next > 0 && next < MIN_CHUNK_SIZE {
                cut = rest.len().div_ceil(2);
            }
            let chunk = rest.split_to(cut);
            self.push_leaf(&chunk);
        }
        if !rest.is_empty() || self.leaves.is_empty() {
            let chunk = rest.split();
            self.push_leaf(&chunk);
        }
        match build_tree(self.leaves) {
            Some(root) => DataRoot(root.id()),
            None => DataRoot([0u8; 32]),
        }
    }

    /// Total bytes folded in so far, including the buffered leftover.
    pub fn bytes_seen(&self) -> u64 {
        self.cursor + self.leftover.len() as u64
    }
}

/// Consumes a data stream and computes its root.
///
/// Fails with the stream's own error if it errors mid-flight.
pub async fn compute_data_root(mut stream: DataStream) -> Result<(DataRoot, u64), DataSourceError> {
    let mut computer = DataRootComputer::new();
    while let Some(item) = stream.next().await {
        let buf: Bytes = item?;
        computer.update(&buf);
    }
    let total = computer.bytes_seen();
    Ok((computer.finalize(), total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::buffered_data_root;
    use futures::stream;
    use proptest::prelude::*;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 249) as u8).collect()
    }

    fn streaming_root(data: &[u8], piece: usize) -> DataRoot {
        let mut computer = DataRootComputer::new();
        for chunk in data.chunks(piece.max(1)) {
            computer.update(chunk);
        }
        computer.finalize()
    }

    #[test]
    fn matches_buffered_root_at_boundary_sizes() {
        for len in [
            0usize,
            1,
            MIN_CHUNK_SIZE,
            MAX_CHUNK_SIZE - 1,
            MAX_CHUNK_SIZE,
            MAX_CHUNK_SIZE + 1,
            MAX_CHUNK_SIZE + MIN_CHUNK_SIZE - 1,
            MAX_CHUNK_SIZE + MIN_CHUNK_SIZE,
            MAX_CHUNK_SIZE + MIN_CHUNK_SIZE + 1,
            3 * MAX_CHUNK_SIZE + 17,
        ] {
            let data = patterned(len);
            let expected = buffered_data_root(&data);
            for piece in [1usize << 10, 64 << 10, 1 << 20] {
                assert_eq!(
                    streaming_root(&data, piece),
                    expected,
                    "len={} piece={}",
                    len,
                    piece
                );
            }
        }
    }

    #[tokio::test]
    async fn async_computation_reports_length() {
        let data = patterned(MAX_CHUNK_SIZE + 5);
        let expected = buffered_data_root(&data);
        let pieces: Vec<Result<Bytes, DataSourceError>> = data
            .chunks(10_000)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let stream: DataStream = Box::pin(stream::iter(pieces));
        let (root, len) = compute_data_root(stream).await.unwrap();
        assert_eq!(root, expected);
        assert_eq!(len, data.len() as u64);
    }

    #[tokio::test]
    async fn async_computation_propagates_stream_errors() {
        let items: Vec<Result<Bytes, DataSourceError>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Err(DataSourceError::Transient("upstream reset".into())),
        ];
        let stream: DataStream = Box::pin(stream::iter(items));
        assert!(compute_data_root(stream).await.is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn streaming_equals_buffered(
            len in 0usize..(MAX_CHUNK_SIZE * 3),
            piece in 1usize..(MAX_CHUNK_SIZE * 2),
        ) {
            let data = patterned(len);
            prop_assert_eq!(streaming_root(&data, piece), buffered_data_root(&data));
        }
    }
}
