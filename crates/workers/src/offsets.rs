// Path: crates/workers/src/offsets.rs

//! The transaction offset importer.
//!
//! Resolves a transaction's weave placement through an offset source and
//! persists it in the local offset index, keeping placements available
//! for chunk reassembly without repeated chain round-trips. At most one
//! import per id is in flight at a time.

use crate::queue::{JobHandler, QueueJob, QueueOptions, WorkerQueue};
use async_trait::async_trait;
use std::sync::Arc;
use weave_api::TxOffsetSource;
use weave_kv::KvJsonStore;
use weave_types::config::QueueConfig;
use weave_types::id::TxId;
use weave_types::offset::TxDataOffset;

/// One placement to import.
pub struct TxOffsetJob(pub TxId);

impl QueueJob for TxOffsetJob {
    fn key(&self) -> String {
        self.0.to_b64url()
    }
}

struct TxOffsetHandler {
    source: Arc<dyn TxOffsetSource>,
    store: Arc<KvJsonStore<TxDataOffset>>,
}

#[async_trait]
impl JobHandler<TxOffsetJob> for TxOffsetHandler {
    async fn handle(&self, job: TxOffsetJob) -> anyhow::Result<()> {
        let id = job.0;
        let placement = self.source.get_tx_offset(&id).await?;
        if !placement.is_valid() {
            anyhow::bail!("placement of {} is unresolved", id);
        }
        self.store.set(&id.to_b64url(), &placement).await?;
        Ok(())
    }
}

/// The offset importer: a bounded, deduplicating queue in front of the
/// offset index.
pub struct TxOffsetImporter {
    queue: WorkerQueue<TxOffsetJob>,
}

impl TxOffsetImporter {
    /// Starts the importer.
    pub fn start(
        source: Arc<dyn TxOffsetSource>,
        store: Arc<KvJsonStore<TxDataOffset>>,
        config: QueueConfig,
    ) -> Self {
        let queue = WorkerQueue::start(
            QueueOptions {
                name: "tx-offsets",
                worker_count: config.worker_count,
                max_queue_size: config.max_queue_size,
                unique_in_flight: true,
            },
            Arc::new(TxOffsetHandler { source, store }),
        );
        Self { queue }
    }

    /// Offers an id for import.
    pub fn offer(&self, id: TxId, prioritized: bool) -> bool {
        if prioritized {
            self.queue.enqueue_prioritized(TxOffsetJob(id))
        } else {
            self.queue.enqueue(TxOffsetJob(id))
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use weave_kv::LruKvStore;
    use weave_types::error::ChainError;
    use weave_types::id::DataRoot;

    struct FixedSource(TxDataOffset);

    #[async_trait]
    impl TxOffsetSource for FixedSource {
        async fn get_tx_offset(&self, _id: &TxId) -> Result<TxDataOffset, ChainError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn placements_are_persisted() {
        let id = TxId([6u8; 32]);
        let placement = TxDataOffset {
            id: Some(id),
            data_root: Some(DataRoot([1u8; 32])),
            data_size: Some(100),
            offset: Some(999),
        };
        let store = Arc::new(KvJsonStore::new(
            Arc::new(LruKvStore::new(16, 3600).unwrap()),
            "H|",
            true,
        ));
        let importer = TxOffsetImporter::start(
            Arc::new(FixedSource(placement)),
            Arc::clone(&store),
            QueueConfig {
                worker_count: 1,
                max_queue_size: 8,
            },
        );

        assert!(importer.offer(id, false));
        for _ in 0..200 {
            if store.get(&id.to_b64url()).await.unwrap().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(store.get(&id.to_b64url()).await.unwrap(), Some(placement));
        importer.stop().await;
    }

    #[tokio::test]
    async fn unresolved_placements_are_not_persisted() {
        let id = TxId([7u8; 32]);
        let store = Arc::new(KvJsonStore::new(
            Arc::new(LruKvStore::new(16, 3600).unwrap()),
            "H|",
            true,
        ));
        let importer = TxOffsetImporter::start(
            Arc::new(FixedSource(TxDataOffset::unset())),
            Arc::clone(&store),
            QueueConfig {
                worker_count: 1,
                max_queue_size: 8,
            },
        );

        assert!(importer.offer(id, false));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get(&id.to_b64url()).await.unwrap(), None);
        importer.stop().await;
    }
}
