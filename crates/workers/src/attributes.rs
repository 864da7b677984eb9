// Path: crates/workers/src/attributes.rs

//! The data content attributes importer.
//!
//! Retrieval paths observe object attributes (hash, size, content type)
//! as streams complete and hand them here; the worker persists them
//! through the index so the read-through data cache can serve later
//! requests from disk. The index is write-once for these records, so
//! re-imports of the same id are harmless.

use crate::queue::{JobHandler, QueueJob, QueueOptions, WorkerQueue};
use async_trait::async_trait;
use std::sync::Arc;
use weave_api::{AttributeImportSink, ContiguousDataIndex};
use weave_types::config::QueueConfig;
use weave_types::data::ContiguousDataAttributes;
use weave_types::id::TxId;

/// One attribute record to persist.
pub struct AttributeJob {
    /// The object the attributes describe.
    pub id: TxId,
    /// The observed attributes.
    pub attributes: ContiguousDataAttributes,
}

impl QueueJob for AttributeJob {
    fn key(&self) -> String {
        self.id.to_b64url()
    }
}

struct AttributeHandler {
    index: Arc<dyn ContiguousDataIndex>,
}

#[async_trait]
impl JobHandler<AttributeJob> for AttributeHandler {
    async fn handle(&self, job: AttributeJob) -> anyhow::Result<()> {
        self.index
            .save_data_content_attributes(&job.id, &job.attributes)
            .await?;
        Ok(())
    }
}

/// The attributes importer: a bounded queue in front of the index.
pub struct DataAttributesImporter {
    queue: WorkerQueue<AttributeJob>,
}

impl DataAttributesImporter {
    /// Starts the importer.
    pub fn start(index: Arc<dyn ContiguousDataIndex>, config: QueueConfig) -> Self {
        let queue = WorkerQueue::start(
            QueueOptions {
                name: "attributes",
                worker_count: config.worker_count,
                max_queue_size: config.max_queue_size,
                unique_in_flight: false,
            },
            Arc::new(AttributeHandler { index }),
        );
        Self { queue }
    }

    /// Current queue length, for backpressure probes.
    pub fn queue_depth(&self) -> usize {
        self.queue.queue_depth()
    }

    /// Drains in-flight work and refuses new records.
    pub async fn stop(&self) {
        self.queue.stop().await;
    }
}

impl AttributeImportSink for DataAttributesImporter {
    fn offer(&self, id: TxId, attributes: ContiguousDataAttributes, prioritized: bool) -> bool {
        let job = AttributeJob { id, attributes };
        if prioritized {
            self.queue.enqueue_prioritized(job)
        } else {
            self.queue.enqueue(job)
        }
    }
}
