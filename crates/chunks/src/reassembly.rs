// Path: crates/chunks/src/reassembly.rs

//! The chunk reassembly producer.
//!
//! Turns a transaction boundary back into a stream of exactly
//! `data_size` contiguous bytes. The producer is an explicit state
//! machine owning its cursor and the single in-flight chunk fetch; the
//! `Stream` implementation is a thin pull adapter over it. One chunk is
//! in flight at a time, so memory stays bounded and backpressure is the
//! consumer simply not polling.

use futures::future::BoxFuture;
use futures::{Future, Stream};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;
use weave_api::ChunkSource;
use weave_types::chunk::{Chunk, ChunkSpec};
use weave_types::data::DataStream;
use weave_types::error::DataSourceError;
use weave_types::id::DataRoot;

/// A pull-driven stream of a transaction's bytes, chunk by chunk.
///
/// Chunks are emitted in strictly increasing offset order; any producer
/// error (including cancellation) terminates the stream with that error.
pub struct ChunkReassemblyStream {
    source: Arc<dyn ChunkSource>,
    data_root: DataRoot,
    size: u64,
    start_offset: u64,
    bytes_emitted: u64,
    cancel: CancellationToken,
    pending: Option<BoxFuture<'static, Result<Chunk, DataSourceError>>>,
    done: bool,
}

impl ChunkReassemblyStream {
    /// Builds the producer for a transaction boundary.
    ///
    /// `start_offset` is the weave-absolute offset of the transaction's
    /// first byte; `size` its total data size.
    pub fn new(
        source: Arc<dyn ChunkSource>,
        data_root: DataRoot,
        size: u64,
        start_offset: u64,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            data_root,
            size,
            start_offset,
            bytes_emitted: 0,
            cancel,
            pending: None,
            done: false,
        }
    }

    /// Boxes the producer into the uniform stream type.
    pub fn into_data_stream(self) -> DataStream {
        Box::pin(self)
    }

    fn next_spec(&self) -> ChunkSpec {
        ChunkSpec {
            tx_size: self.size,
            absolute_offset: self.start_offset + self.bytes_emitted,
            data_root: self.data_root,
            relative_offset: self.bytes_emitted,
        }
    }

    fn fail(&mut self, error: DataSourceError) -> Poll<Option<Result<bytes::Bytes, DataSourceError>>> {
        self.done = true;
        self.pending = None;
        Poll::Ready(Some(Err(error)))
    }
}

impl Stream for ChunkReassemblyStream {
    type Item = Result<bytes::Bytes, DataSourceError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(None);
        }
        if this.cancel.is_cancelled() {
            return this.fail(DataSourceError::Cancelled);
        }
        if this.bytes_emitted == this.size {
            this.done = true;
            return Poll::Ready(None);
        }

        if this.pending.is_none() {
            let source = Arc::clone(&this.source);
            let spec = this.next_spec();
            let cancel = this.cancel.clone();
            this.pending = Some(Box::pin(async move {
                tokio::select! {
                    _ = cancel.cancelled() => Err(DataSourceError::Cancelled),
                    chunk = source.get_chunk(spec) => chunk,
                }
            }));
        }

        let Some(pending) = this.pending.as_mut() else {
            return Poll::Pending;
        };
        match Pin::new(pending).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => this.fail(e),
            Poll::Ready(Ok(chunk)) => {
                this.pending = None;
                if chunk.metadata.offset != this.bytes_emitted {
                    return this.fail(DataSourceError::DataCorrupt(format!(
                        "chunk arrived at offset {} but {} was expected",
                        chunk.metadata.offset, this.bytes_emitted
                    )));
                }
                let len = chunk.data.chunk.len() as u64;
                if len == 0 {
                    return this.fail(DataSourceError::DataCorrupt(
                        "empty chunk would stall reassembly".to_string(),
                    ));
                }
                if this.bytes_emitted + len > this.size {
                    return this.fail(DataSourceError::DataCorrupt(format!(
                        "chunk of {} bytes overruns the transaction size {}",
                        len, this.size
                    )));
                }
                this.bytes_emitted += len;
                Poll::Ready(Some(Ok(chunk.data.chunk)))
            }
        }
    }
}
