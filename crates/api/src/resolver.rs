// Path: crates/api/src/resolver.rs

//! The name resolver role.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use weave_types::error::DataSourceError;
use weave_types::id::TxId;

/// A resolved name record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameResolution {
    /// The transaction the name currently points at.
    pub tx_id: TxId,
    /// The controlling process, when the name is process-managed.
    pub process_id: Option<TxId>,
    /// Seconds the resolution may be cached.
    pub ttl_seconds: u64,
}

/// Resolves human-readable names to transaction ids.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Resolves `name`, returning `None` when the name is unregistered.
    async fn resolve_name(&self, name: &str) -> Result<Option<NameResolution>, DataSourceError>;
}
