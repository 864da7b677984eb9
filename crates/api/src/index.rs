// Path: crates/api/src/index.rs

//! The contiguous-data index role consumed by the retrieval core.

use async_trait::async_trait;
use weave_types::data::{ContiguousDataAttributes, DataItemAttributes};
use weave_types::error::KvError;
use weave_types::id::TxId;

/// The persistent index of contiguous-data attributes.
///
/// Attribute writes are write-once from the core's perspective: the
/// importer saves a record on first retrieval and later saves are ignored
/// by the backing store.
#[async_trait]
pub trait ContiguousDataIndex: Send + Sync {
    /// Reads the persisted attributes of a transaction or data item.
    async fn get_data_attributes(
        &self,
        id: &TxId,
    ) -> Result<Option<ContiguousDataAttributes>, KvError>;

    /// Reads the bundle placement of a data item, when indexed.
    async fn get_data_item_attributes(
        &self,
        id: &TxId,
    ) -> Result<Option<DataItemAttributes>, KvError>;

    /// Persists the attributes observed for `id`.
    async fn save_data_content_attributes(
        &self,
        id: &TxId,
        attributes: &ContiguousDataAttributes,
    ) -> Result<(), KvError>;

    /// Records the outcome of a data verification pass.
    async fn save_verification_status(&self, id: &TxId, verified: bool) -> Result<(), KvError>;

    /// Bumps the verification retry counter for `id`.
    async fn increment_verification_retry_count(&self, id: &TxId) -> Result<(), KvError>;
}
