// Path: crates/api/src/source.rs

//! The data source contract: one operation, a shared error taxonomy.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use weave_types::data::{ContiguousData, Region, RequestAttributes};
use weave_types::error::DataSourceError;
use weave_types::id::TxId;

/// Parameters of a single retrieval attempt.
///
/// One cancellation token is created per client request and threaded
/// through every nested source and stream; implementations check it at
/// the top of each suspension point.
#[derive(Debug, Clone)]
pub struct GetDataParams {
    /// The requested transaction or data item id.
    pub id: TxId,
    /// Optional byte window relative to the logical object.
    pub region: Option<Region>,
    /// Client-supplied metadata consumed by policy decorators.
    pub attributes: Option<RequestAttributes>,
    /// The per-request cancellation token.
    pub cancel: CancellationToken,
}

impl GetDataParams {
    /// A plain lookup of `id` with no region, attributes, or cancellation.
    pub fn new(id: TxId) -> Self {
        Self {
            id,
            region: None,
            attributes: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// A source of contiguous object bytes.
///
/// A call either produces a [`ContiguousData`] (stream + size +
/// provenance flags) or fails with one variant of the retrieval taxonomy.
/// `Cancelled` must be raised verbatim and never mapped to another
/// variant; all other failures let a chain engine move on to the next
/// source.
#[async_trait]
pub trait ContiguousDataSource: Send + Sync {
    /// Retrieves the object's bytes.
    async fn get_data(&self, params: GetDataParams) -> Result<ContiguousData, DataSourceError>;

    /// A short stable label for logs and metrics.
    fn label(&self) -> &'static str;
}
