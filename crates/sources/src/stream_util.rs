// Path: crates/sources/src/stream_util.rs

//! Stream adapters shared by sources.

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;
use weave_types::data::DataStream;
use weave_types::error::DataSourceError;

/// Wraps a stream so cancellation surfaces as an error item instead of a
/// silent truncation: pipe targets observe the failure.
pub fn cancellable(inner: DataStream, cancel: CancellationToken) -> DataStream {
    Box::pin(CancelGuard {
        inner,
        cancel,
        done: false,
    })
}

struct CancelGuard {
    inner: DataStream,
    cancel: CancellationToken,
    done: bool,
}

impl Stream for CancelGuard {
    type Item = Result<bytes::Bytes, DataSourceError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if this.cancel.is_cancelled() {
            this.done = true;
            return Poll::Ready(Some(Err(DataSourceError::Cancelled)));
        }
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Err(e))) => {
                this.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Source fixtures shared across the crate's tests.

    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::{stream, StreamExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use weave_api::{ContiguousDataSource, GetDataParams};
    use weave_types::data::{ContiguousData, DataStream};
    use weave_types::error::DataSourceError;

    /// Drains a stream into a byte vector.
    pub(crate) async fn collect(mut stream: DataStream) -> Result<Vec<u8>, DataSourceError> {
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.extend_from_slice(&item?);
        }
        Ok(out)
    }

    /// A fixed-bytes retrieval result.
    pub(crate) fn fixed_data(bytes: &[u8], verified: bool) -> ContiguousData {
        let owned = Bytes::copy_from_slice(bytes);
        let size = owned.len() as u64;
        ContiguousData {
            stream: Box::pin(stream::iter(vec![Ok(owned)])),
            size,
            source_content_type: Some("application/octet-stream".to_string()),
            verified,
            trusted: true,
            cached: false,
        }
    }

    enum Behavior {
        Succeed { bytes: Vec<u8>, verified: bool },
        Fail(DataSourceError),
    }

    /// A source that counts its invocations and either succeeds with
    /// fixed bytes or fails with a fixed error.
    pub(crate) struct CountingSource {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl CountingSource {
        pub fn succeeding(bytes: &[u8]) -> Self {
            Self {
                behavior: Behavior::Succeed {
                    bytes: bytes.to_vec(),
                    verified: false,
                },
                calls: AtomicUsize::new(0),
            }
        }

        pub fn verified(bytes: &[u8]) -> Self {
            Self {
                behavior: Behavior::Succeed {
                    bytes: bytes.to_vec(),
                    verified: true,
                },
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(error: DataSourceError) -> Self {
            Self {
                behavior: Behavior::Fail(error),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContiguousDataSource for CountingSource {
        async fn get_data(
            &self,
            _params: GetDataParams,
        ) -> Result<ContiguousData, DataSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Succeed { bytes, verified } => Ok(fixed_data(bytes, *verified)),
                Behavior::Fail(error) => Err(error.clone()),
            }
        }

        fn label(&self) -> &'static str {
            "counting"
        }
    }
}
