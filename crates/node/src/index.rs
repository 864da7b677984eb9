// Path: crates/node/src/index.rs

//! The KV-backed contiguous data index.
//!
//! Attribute records are write-once (`DA|` / `DI|` prefixes): the first
//! observation of an object wins. Verification state lives in its own
//! overwritable records (`V|`) and is merged into read results, so a
//! later verification pass never needs to rewrite the attribute record.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use weave_api::{ContiguousDataIndex, KvBuffer};
use weave_kv::KvJsonStore;
use weave_types::data::{ContiguousDataAttributes, DataItemAttributes};
use weave_types::error::KvError;
use weave_types::id::TxId;

const ATTRIBUTES_PREFIX: &str = "DA|";
const DATA_ITEM_PREFIX: &str = "DI|";
const VERIFICATION_PREFIX: &str = "V|";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct VerificationRecord {
    verified: bool,
    retry_count: u32,
}

/// The contiguous data index over the shared KV backend.
pub struct KvDataIndex {
    attributes: KvJsonStore<ContiguousDataAttributes>,
    data_items: KvJsonStore<DataItemAttributes>,
    verification: KvJsonStore<VerificationRecord>,
}

impl KvDataIndex {
    /// Builds the index's logical stores on one backend.
    pub fn new(kv: Arc<dyn KvBuffer>) -> Self {
        Self {
            attributes: KvJsonStore::new(Arc::clone(&kv), ATTRIBUTES_PREFIX, false),
            data_items: KvJsonStore::new(Arc::clone(&kv), DATA_ITEM_PREFIX, false),
            verification: KvJsonStore::new(kv, VERIFICATION_PREFIX, true),
        }
    }

    /// Records a data item's placement inside its root transaction.
    pub async fn save_data_item_attributes(
        &self,
        id: &TxId,
        attributes: &DataItemAttributes,
    ) -> Result<(), KvError> {
        self.data_items.set(&id.to_b64url(), attributes).await
    }

    /// The verification retry count for `id`, for requeue policies.
    pub async fn verification_retry_count(&self, id: &TxId) -> Result<u32, KvError> {
        Ok(self
            .verification
            .get(&id.to_b64url())
            .await?
            .map(|record| record.retry_count)
            .unwrap_or(0))
    }
}

#[async_trait]
impl ContiguousDataIndex for KvDataIndex {
    async fn get_data_attributes(
        &self,
        id: &TxId,
    ) -> Result<Option<ContiguousDataAttributes>, KvError> {
        let key = id.to_b64url();
        let Some(mut attributes) = self.attributes.get(&key).await? else {
            return Ok(None);
        };
        if let Some(verification) = self.verification.get(&key).await? {
            attributes.verified = attributes.verified || verification.verified;
        }
        Ok(Some(attributes))
    }

    async fn get_data_item_attributes(
        &self,
        id: &TxId,
    ) -> Result<Option<DataItemAttributes>, KvError> {
        self.data_items.get(&id.to_b64url()).await
    }

    async fn save_data_content_attributes(
        &self,
        id: &TxId,
        attributes: &ContiguousDataAttributes,
    ) -> Result<(), KvError> {
        self.attributes.set(&id.to_b64url(), attributes).await
    }

    async fn save_verification_status(&self, id: &TxId, verified: bool) -> Result<(), KvError> {
        let key = id.to_b64url();
        let mut record = self.verification.get(&key).await?.unwrap_or_default();
        record.verified = verified;
        self.verification.set(&key, &record).await
    }

    async fn increment_verification_retry_count(&self, id: &TxId) -> Result<(), KvError> {
        let key = id.to_b64url();
        let mut record = self.verification.get(&key).await?.unwrap_or_default();
        record.retry_count += 1;
        self.verification.set(&key, &record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_kv::LruKvStore;

    fn index() -> KvDataIndex {
        KvDataIndex::new(Arc::new(LruKvStore::new(64, 3600).unwrap()))
    }

    fn attrs(size: u64) -> ContiguousDataAttributes {
        ContiguousDataAttributes {
            hash: None,
            data_root: None,
            size,
            content_type: None,
            verified: false,
        }
    }

    #[tokio::test]
    async fn attribute_records_are_write_once() {
        let index = index();
        let id = TxId([1u8; 32]);
        index.save_data_content_attributes(&id, &attrs(10)).await.unwrap();
        index.save_data_content_attributes(&id, &attrs(99)).await.unwrap();
        assert_eq!(index.get_data_attributes(&id).await.unwrap().unwrap().size, 10);
    }

    #[tokio::test]
    async fn verification_merges_into_reads() {
        let index = index();
        let id = TxId([2u8; 32]);
        index.save_data_content_attributes(&id, &attrs(10)).await.unwrap();
        assert!(!index.get_data_attributes(&id).await.unwrap().unwrap().verified);

        index.save_verification_status(&id, true).await.unwrap();
        assert!(index.get_data_attributes(&id).await.unwrap().unwrap().verified);
    }

    #[tokio::test]
    async fn retry_counts_accumulate() {
        let index = index();
        let id = TxId([3u8; 32]);
        assert_eq!(index.verification_retry_count(&id).await.unwrap(), 0);
        index.increment_verification_retry_count(&id).await.unwrap();
        index.increment_verification_retry_count(&id).await.unwrap();
        assert_eq!(index.verification_retry_count(&id).await.unwrap(), 2);
    }
}
