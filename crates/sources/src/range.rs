// Path: crates/sources/src/range.rs

//! The byte-range windowing stream.
//!
//! Emits only the slice of its upstream falling inside
//! `[skip_offset, skip_offset + keep_size)`, ends once `keep_size` bytes
//! have been emitted, and emits nothing when the skip reaches past the
//! upstream's end. Order-preserving; at most one inbound buffer is held
//! at a time.

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use weave_types::data::{DataStream, Region};
use weave_types::error::DataSourceError;

/// A `(skip_offset, keep_size)` window over a data stream.
pub struct ByteRangeStream {
    inner: DataStream,
    skip_remaining: u64,
    keep_remaining: u64,
    done: bool,
}

impl ByteRangeStream {
    /// Windows `inner` to `region`.
    pub fn new(inner: DataStream, region: Region) -> Self {
        Self {
            inner,
            skip_remaining: region.offset,
            keep_remaining: region.size,
            done: false,
        }
    }

    /// Boxes the window into the uniform stream type.
    pub fn into_data_stream(self) -> DataStream {
        Box::pin(self)
    }
}

impl Stream for ByteRangeStream {
    type Item = Result<bytes::Bytes, DataSourceError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if this.keep_remaining == 0 {
            this.done = true;
            return Poll::Ready(None);
        }

        loop {
            let buf = match this.inner.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    // A short upstream simply ends the window.
                    this.done = true;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(Some(Ok(buf))) => buf,
            };

            let len = buf.len() as u64;
            if this.skip_remaining >= len {
                this.skip_remaining -= len;
                continue;
            }

            let start = this.skip_remaining as usize;
            this.skip_remaining = 0;
            let available = len as usize - start;
            let take = (this.keep_remaining as usize).min(available);
            this.keep_remaining -= take as u64;
            if this.keep_remaining == 0 {
                this.done = true;
            }
            return Poll::Ready(Some(Ok(buf.slice(start..start + take))));
        }
    }
}

/// Clamps a requested region to an object of `total` bytes, so the
/// reported size always equals the bytes the window will emit.
pub fn clamp_region(region: Region, total: u64) -> Region {
    if region.offset >= total {
        return Region {
            offset: region.offset,
            size: 0,
        };
    }
    Region {
        offset: region.offset,
        size: region.size.min(total - region.offset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_util::testing::collect;
    use bytes::Bytes;
    use futures::stream;

    fn upstream(pieces: &[&'static [u8]]) -> DataStream {
        let items: Vec<Result<Bytes, DataSourceError>> = pieces
            .iter()
            .map(|piece| Ok(Bytes::from_static(piece)))
            .collect();
        Box::pin(stream::iter(items))
    }

    async fn window(pieces: &[&'static [u8]], offset: u64, size: u64) -> Vec<u8> {
        let ranged = ByteRangeStream::new(upstream(pieces), Region { offset, size });
        collect(ranged.into_data_stream()).await.unwrap()
    }

    #[tokio::test]
    async fn windows_within_one_buffer() {
        assert_eq!(window(&[b"abcdefgh"], 2, 3).await, b"cde");
        assert_eq!(window(&[b"abcdefgh"], 0, 8).await, b"abcdefgh");
        assert_eq!(window(&[b"abcdefgh"], 7, 1).await, b"h");
    }

    #[tokio::test]
    async fn windows_across_buffers() {
        let pieces: &[&'static [u8]] = &[b"abc", b"def", b"ghi"];
        assert_eq!(window(pieces, 2, 5).await, b"cdefg");
        assert_eq!(window(pieces, 3, 3).await, b"def");
        assert_eq!(window(pieces, 0, 9).await, b"abcdefghi");
    }

    #[tokio::test]
    async fn skip_past_the_end_emits_nothing() {
        assert_eq!(window(&[b"abc"], 3, 5).await, b"");
        assert_eq!(window(&[b"abc"], 100, 5).await, b"");
    }

    #[tokio::test]
    async fn zero_size_emits_nothing() {
        assert_eq!(window(&[b"abc"], 0, 0).await, b"");
    }

    #[tokio::test]
    async fn short_upstream_ends_the_window() {
        assert_eq!(window(&[b"abc"], 1, 100).await, b"bc");
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let items: Vec<Result<Bytes, DataSourceError>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Err(DataSourceError::Transient("reset".into())),
        ];
        let ranged = ByteRangeStream::new(
            Box::pin(stream::iter(items)),
            Region { offset: 1, size: 10 },
        );
        assert!(collect(ranged.into_data_stream()).await.is_err());
    }

    #[test]
    fn clamping_matches_emission() {
        let clamped = clamp_region(Region { offset: 5, size: 10 }, 8);
        assert_eq!(clamped.size, 3);
        let past = clamp_region(Region { offset: 9, size: 10 }, 8);
        assert_eq!(past.size, 0);
        let inside = clamp_region(Region { offset: 0, size: 4 }, 8);
        assert_eq!(inside.size, 4);
    }
}
