// Path: crates/api/src/object_store.rs

//! The S3-shaped object store role.

use async_trait::async_trait;
use bytes::Bytes;
use weave_types::error::DataSourceError;

/// Read access to an S3-shaped object store.
///
/// Chunk objects live at `[prefix/]<data_root>/<relative_offset>`; the
/// bucket and prefix are fixed at construction by the implementation.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads the object at `key`, failing with `NotFound` when absent.
    async fn get_object(&self, key: &str) -> Result<Bytes, DataSourceError>;
}
