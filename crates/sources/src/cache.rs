// Path: crates/sources/src/cache.rs

//! The read-through contiguous data cache.
//!
//! Hits stream straight off the content-addressed store, windowed for
//! regions. Full-object misses delegate to the inner source and tee the
//! bytes through an incremental SHA-256 into a tmp file; when the stream
//! completes at the expected length, the file is renamed to its content
//! address and an attribute record is offered to the importer, making
//! the next request a hit. Region'd misses pass through uncached: a
//! windowed stream cannot be content-addressed. Cache-write failures are
//! logged and counted, never surfaced to the consumer.

use crate::data_store::FsContiguousDataStore;
use crate::range::clamp_region;
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{Future, Stream};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::AsyncWriteExt;
use weave_api::{AttributeImportSink, ContiguousDataIndex, ContiguousDataSource, GetDataParams};
use weave_telemetry::cache_metrics;
use weave_types::data::{ContiguousData, ContiguousDataAttributes, DataStream};
use weave_types::error::DataSourceError;
use weave_types::id::{DataHash, TxId};

/// The read-through cache in front of one inner source.
pub struct ReadThroughDataCache {
    inner: Arc<dyn ContiguousDataSource>,
    store: Arc<FsContiguousDataStore>,
    index: Arc<dyn ContiguousDataIndex>,
    attributes: Arc<dyn AttributeImportSink>,
}

impl ReadThroughDataCache {
    /// Assembles the cache.
    pub fn new(
        inner: Arc<dyn ContiguousDataSource>,
        store: Arc<FsContiguousDataStore>,
        index: Arc<dyn ContiguousDataIndex>,
        attributes: Arc<dyn AttributeImportSink>,
    ) -> Self {
        Self {
            inner,
            store,
            index,
            attributes,
        }
    }

    async fn try_hit(&self, params: &GetDataParams) -> Option<ContiguousData> {
        let attributes = match self.index.get_data_attributes(&params.id).await {
            Ok(found) => found?,
            Err(e) => {
                tracing::warn!(target: "sources", id = %params.id, error = %e, "attribute lookup failed");
                return None;
            }
        };
        let hash = attributes.hash?;
        let stream = match self
            .store
            .open_stream(&hash, params.region, attributes.size)
            .await
        {
            Ok(Some(stream)) => stream,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(target: "sources", id = %params.id, error = %e, "cache open failed");
                return None;
            }
        };
        let size = match params.region {
            Some(region) => clamp_region(region, attributes.size).size,
            None => attributes.size,
        };
        Some(ContiguousData {
            stream,
            size,
            source_content_type: attributes.content_type,
            verified: attributes.verified,
            trusted: true,
            cached: true,
        })
    }
}

#[async_trait]
impl ContiguousDataSource for ReadThroughDataCache {
    async fn get_data(&self, params: GetDataParams) -> Result<ContiguousData, DataSourceError> {
        if params.cancel.is_cancelled() {
            return Err(DataSourceError::Cancelled);
        }

        if let Some(hit) = self.try_hit(&params).await {
            cache_metrics().inc_cache_hit("contiguous");
            return Ok(hit);
        }
        cache_metrics().inc_cache_miss("contiguous");

        let data = self.inner.get_data(params.clone()).await?;
        if params.region.is_some() {
            return Ok(data);
        }

        let (tmp, file) = match self.store.create_tmp().await {
            Ok(created) => created,
            Err(e) => {
                cache_metrics().inc_cache_write_error("contiguous");
                tracing::warn!(target: "sources", id = %params.id, error = %e, "tmp create failed, serving uncached");
                return Ok(data);
            }
        };

        let finalize = FinalizeCtx {
            store: Arc::clone(&self.store),
            sink: Arc::clone(&self.attributes),
            tmp,
            id: params.id,
            content_type: data.source_content_type.clone(),
            verified: data.verified,
        };
        let stream = TeeCacheStream::new(data.stream, file, finalize, data.size);

        Ok(ContiguousData {
            stream: Box::pin(stream),
            size: data.size,
            source_content_type: data.source_content_type,
            verified: data.verified,
            trusted: data.trusted,
            cached: false,
        })
    }

    fn label(&self) -> &'static str {
        "read-through-cache"
    }
}

struct FinalizeCtx {
    store: Arc<FsContiguousDataStore>,
    sink: Arc<dyn AttributeImportSink>,
    tmp: PathBuf,
    id: TxId,
    content_type: Option<String>,
    verified: bool,
}

enum TeeState {
    /// Forwarding; `None` means caching was aborted and bytes just flow.
    Streaming(Option<tokio::fs::File>),
    /// A buffer is being written to the tmp file before it is emitted.
    Writing {
        fut: BoxFuture<'static, (tokio::fs::File, std::io::Result<()>)>,
        buf: Bytes,
    },
    /// The upstream ended; the tmp file is being promoted.
    Finalizing(BoxFuture<'static, ()>),
    Done,
}

/// Tees a stream into the content-addressed store while forwarding it.
///
/// An explicit state machine: one buffer is in flight at a time, and the
/// consumer does not see the final end-of-stream until the cache file is
/// promoted (or abandoned), so a drained stream implies a settled cache.
struct TeeCacheStream {
    inner: DataStream,
    state: TeeState,
    hasher: Option<Sha256>,
    ctx: Option<FinalizeCtx>,
    bytes_seen: u64,
    expected: u64,
}

impl TeeCacheStream {
    fn new(inner: DataStream, file: tokio::fs::File, ctx: FinalizeCtx, expected: u64) -> Self {
        Self {
            inner,
            state: TeeState::Streaming(Some(file)),
            hasher: Some(Sha256::new()),
            ctx: Some(ctx),
            bytes_seen: 0,
            expected,
        }
    }

    fn abort_caching(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            tokio::spawn(async move {
                ctx.store.discard_tmp(&ctx.tmp).await;
            });
        }
        self.hasher = None;
    }
}

async fn finalize_cache(
    mut file: tokio::fs::File,
    ctx: FinalizeCtx,
    hasher: Sha256,
    bytes_seen: u64,
    expected: u64,
) {
    if let Err(e) = file.flush().await {
        cache_metrics().inc_cache_write_error("contiguous");
        tracing::warn!(target: "sources", error = %e, "cache flush failed");
        ctx.store.discard_tmp(&ctx.tmp).await;
        return;
    }
    drop(file);

    if bytes_seen != expected {
        tracing::warn!(
            target: "sources",
            id = %ctx.id,
            bytes_seen,
            expected,
            "stream ended short, not caching"
        );
        ctx.store.discard_tmp(&ctx.tmp).await;
        return;
    }

    let hash = DataHash(hasher.finalize().into());
    if let Err(e) = ctx.store.finalize_tmp(&ctx.tmp, &hash).await {
        cache_metrics().inc_cache_write_error("contiguous");
        tracing::warn!(target: "sources", id = %ctx.id, error = %e, "cache promote failed");
        ctx.store.discard_tmp(&ctx.tmp).await;
        return;
    }

    let attributes = ContiguousDataAttributes {
        hash: Some(hash),
        data_root: None,
        size: expected,
        content_type: ctx.content_type,
        verified: ctx.verified,
    };
    if !ctx.sink.offer(ctx.id, attributes, false) {
        tracing::debug!(target: "sources", id = %ctx.id, "attribute import dropped");
    }
}

impl Stream for TeeCacheStream {
    type Item = Result<Bytes, DataSourceError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                TeeState::Done => return Poll::Ready(None),

                TeeState::Finalizing(fut) => match fut.as_mut().poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(()) => {
                        this.state = TeeState::Done;
                        return Poll::Ready(None);
                    }
                },

                TeeState::Writing { fut, buf } => match fut.as_mut().poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready((file, Ok(()))) => {
                        let out = buf.clone();
                        this.state = TeeState::Streaming(Some(file));
                        return Poll::Ready(Some(Ok(out)));
                    }
                    Poll::Ready((_, Err(e))) => {
                        cache_metrics().inc_cache_write_error("contiguous");
                        tracing::warn!(target: "sources", error = %e, "cache write failed, serving uncached");
                        let out = buf.clone();
                        this.abort_caching();
                        this.state = TeeState::Streaming(None);
                        return Poll::Ready(Some(Ok(out)));
                    }
                },

                TeeState::Streaming(file_slot) => {
                    match this.inner.as_mut().poll_next(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Some(Ok(buf))) => {
                            this.bytes_seen += buf.len() as u64;
                            if let Some(hasher) = this.hasher.as_mut() {
                                hasher.update(&buf);
                            }
                            match file_slot.take() {
                                Some(mut file) => {
                                    let to_write = buf.clone();
                                    this.state = TeeState::Writing {
                                        fut: Box::pin(async move {
                                            let result = file.write_all(&to_write).await;
                                            (file, result)
                                        }),
                                        buf,
                                    };
                                    // Poll the write immediately.
                                }
                                None => return Poll::Ready(Some(Ok(buf))),
                            }
                        }
                        Poll::Ready(Some(Err(e))) => {
                            this.abort_caching();
                            this.state = TeeState::Done;
                            return Poll::Ready(Some(Err(e)));
                        }
                        Poll::Ready(None) => match file_slot.take() {
                            Some(file) => {
                                let (Some(ctx), Some(hasher)) =
                                    (this.ctx.take(), this.hasher.take())
                                else {
                                    this.state = TeeState::Done;
                                    return Poll::Ready(None);
                                };
                                this.state = TeeState::Finalizing(Box::pin(finalize_cache(
                                    file,
                                    ctx,
                                    hasher,
                                    this.bytes_seen,
                                    this.expected,
                                )));
                            }
                            None => {
                                this.state = TeeState::Done;
                                return Poll::Ready(None);
                            }
                        },
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_util::testing::{collect, CountingSource};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use weave_types::data::{DataItemAttributes, Region};
    use weave_types::error::KvError;

    /// An index whose attribute sink writes synchronously, standing in
    /// for the importer queue.
    #[derive(Default)]
    struct MemoryIndexSink {
        attrs: Mutex<HashMap<TxId, ContiguousDataAttributes>>,
    }

    #[async_trait]
    impl ContiguousDataIndex for MemoryIndexSink {
        async fn get_data_attributes(
            &self,
            id: &TxId,
        ) -> Result<Option<ContiguousDataAttributes>, KvError> {
            Ok(self.attrs.lock().unwrap().get(id).cloned())
        }

        async fn get_data_item_attributes(
            &self,
            _id: &TxId,
        ) -> Result<Option<DataItemAttributes>, KvError> {
            Ok(None)
        }

        async fn save_data_content_attributes(
            &self,
            id: &TxId,
            attributes: &ContiguousDataAttributes,
        ) -> Result<(), KvError> {
            self.attrs
                .lock()
                .unwrap()
                .entry(*id)
                .or_insert_with(|| attributes.clone());
            Ok(())
        }

        async fn save_verification_status(&self, _id: &TxId, _ok: bool) -> Result<(), KvError> {
            Ok(())
        }

        async fn increment_verification_retry_count(&self, _id: &TxId) -> Result<(), KvError> {
            Ok(())
        }
    }

    impl AttributeImportSink for MemoryIndexSink {
        fn offer(
            &self,
            id: TxId,
            attributes: ContiguousDataAttributes,
            _prioritized: bool,
        ) -> bool {
            self.attrs.lock().unwrap().entry(id).or_insert(attributes);
            true
        }
    }

    fn cache_over(
        inner: Arc<CountingSource>,
        dir: &std::path::Path,
    ) -> (Arc<MemoryIndexSink>, ReadThroughDataCache) {
        let index = Arc::new(MemoryIndexSink::default());
        let cache = ReadThroughDataCache::new(
            inner as Arc<dyn ContiguousDataSource>,
            Arc::new(FsContiguousDataStore::open(dir).unwrap()),
            Arc::clone(&index) as Arc<dyn ContiguousDataIndex>,
            Arc::clone(&index) as Arc<dyn AttributeImportSink>,
        );
        (index, cache)
    }

    #[tokio::test]
    async fn first_miss_fills_the_cache_for_the_second_request() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(CountingSource::succeeding(b"cache-me"));
        let (index, cache) = cache_over(Arc::clone(&inner), dir.path());
        let id = TxId([1u8; 32]);

        let first = cache.get_data(GetDataParams::new(id)).await.unwrap();
        assert!(!first.cached);
        // Draining to end drives the tee through its finalize state.
        assert_eq!(collect(first.stream).await.unwrap(), b"cache-me");
        assert!(index.attrs.lock().unwrap().contains_key(&id));

        let second = cache.get_data(GetDataParams::new(id)).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.size, 8);
        assert_eq!(collect(second.stream).await.unwrap(), b"cache-me");
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn cached_objects_serve_regions_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(CountingSource::succeeding(b"abcdefgh"));
        let (_index, cache) = cache_over(Arc::clone(&inner), dir.path());
        let id = TxId([2u8; 32]);

        let full = cache.get_data(GetDataParams::new(id)).await.unwrap();
        collect(full.stream).await.unwrap();

        let mut params = GetDataParams::new(id);
        params.region = Some(Region { offset: 2, size: 3 });
        let windowed = cache.get_data(params).await.unwrap();
        assert!(windowed.cached);
        assert_eq!(windowed.size, 3);
        assert_eq!(collect(windowed.stream).await.unwrap(), b"cde");
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn region_misses_pass_through_uncached() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(CountingSource::succeeding(b"abcdefgh"));
        let (index, cache) = cache_over(Arc::clone(&inner), dir.path());

        let mut params = GetDataParams::new(TxId([3u8; 32]));
        params.region = Some(Region { offset: 0, size: 4 });
        let data = cache.get_data(params).await.unwrap();
        assert!(!data.cached);
        collect(data.stream).await.unwrap();
        assert!(index.attrs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn inner_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(CountingSource::failing(DataSourceError::NotFound));
        let (_index, cache) = cache_over(inner, dir.path());
        assert!(matches!(
            cache.get_data(GetDataParams::new(TxId([4u8; 32]))).await,
            Err(DataSourceError::NotFound)
        ));
    }
}
