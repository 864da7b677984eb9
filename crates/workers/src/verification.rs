// Path: crates/workers/src/verification.rs

//! The data verification worker.
//!
//! Re-derives the merkle root of an object's locally-reassembled bytes
//! and compares it against the indexed authoritative root. A match
//! records a verified status; a mismatch (or a retrieval failure) bumps
//! the retry counter so the object is revisited. At most one pass per id
//! is in flight at a time.

use crate::queue::{JobHandler, QueueJob, QueueOptions, WorkerQueue};
use async_trait::async_trait;
use std::sync::Arc;
use weave_api::{ContiguousDataIndex, ContiguousDataSource, GetDataParams, VerificationSink};
use weave_chunks::compute_data_root;
use weave_telemetry::verification_metrics;
use weave_types::config::QueueConfig;
use weave_types::id::TxId;

/// One id to verify.
pub struct VerificationJob(pub TxId);

impl QueueJob for VerificationJob {
    fn key(&self) -> String {
        self.0.to_b64url()
    }
}

struct VerificationHandler {
    /// The trusted retrieval path; in production this is the chunk
    /// reassembly source so bytes come off the chain, not a peer cache.
    source: Arc<dyn ContiguousDataSource>,
    index: Arc<dyn ContiguousDataIndex>,
}

#[async_trait]
impl JobHandler<VerificationJob> for VerificationHandler {
    async fn handle(&self, job: VerificationJob) -> anyhow::Result<()> {
        let id = job.0;
        let attributes = self
            .index
            .get_data_attributes(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no indexed attributes for {}", id))?;
        let Some(expected_root) = attributes.data_root else {
            anyhow::bail!("no authoritative data root indexed for {}", id);
        };

        let data = match self.source.get_data(GetDataParams::new(id)).await {
            Ok(data) => data,
            Err(e) => {
                self.index.increment_verification_retry_count(&id).await?;
                verification_metrics().inc_verification(false);
                anyhow::bail!("retrieval for verification failed: {}", e);
            }
        };
        let (root, total) = match compute_data_root(data.stream).await {
            Ok(result) => result,
            Err(e) => {
                self.index.increment_verification_retry_count(&id).await?;
                verification_metrics().inc_verification(false);
                anyhow::bail!("stream for verification failed: {}", e);
            }
        };

        let ok = root == expected_root && total == attributes.size;
        verification_metrics().inc_verification(ok);
        if ok {
            self.index.save_verification_status(&id, true).await?;
        } else {
            tracing::warn!(
                target: "workers",
                id = %id,
                expected = %expected_root,
                computed = %root,
                bytes = total,
                "data verification mismatch"
            );
            self.index.increment_verification_retry_count(&id).await?;
        }
        Ok(())
    }
}

/// The verification worker: a bounded, deduplicating queue re-rooting
/// objects against the index.
pub struct DataVerificationWorker {
    queue: WorkerQueue<VerificationJob>,
}

impl DataVerificationWorker {
    /// Starts the worker.
    pub fn start(
        source: Arc<dyn ContiguousDataSource>,
        index: Arc<dyn ContiguousDataIndex>,
        config: QueueConfig,
    ) -> Self {
        let queue = WorkerQueue::start(
            QueueOptions {
                name: "verification",
                worker_count: config.worker_count,
                max_queue_size: config.max_queue_size,
                unique_in_flight: true,
            },
            Arc::new(VerificationHandler { source, index }),
        );
        Self { queue }
    }

    /// Current queue length, for backpressure probes.
    pub fn queue_depth(&self) -> usize {
        self.queue.queue_depth()
    }

    /// Drains in-flight work and refuses new ids.
    pub async fn stop(&self) {
        self.queue.stop().await;
    }
}

impl VerificationSink for DataVerificationWorker {
    fn offer(&self, id: TxId, prioritized: bool) -> bool {
        if prioritized {
            self.queue.enqueue_prioritized(VerificationJob(id))
        } else {
            self.queue.enqueue(VerificationJob(id))
        }
    }
}
