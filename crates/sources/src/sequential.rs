// Path: crates/sources/src/sequential.rs

//! The chain engine: strictly ordered fall-through.
//!
//! Sources are tried in configured order, never fanned out, so source
//! precedence is preserved and upstreams see no redundant load. The
//! cancellation marker is re-raised verbatim and stops the walk; every
//! other failure is recorded and the next source gets its turn.

use async_trait::async_trait;
use std::sync::Arc;
use weave_api::{ContiguousDataSource, GetDataParams};
use weave_telemetry::source_metrics;
use weave_types::data::ContiguousData;
use weave_types::error::{DataSourceError, ErrorCode};

/// An ordered fall-through over inner sources.
pub struct SequentialDataSource {
    sources: Vec<Arc<dyn ContiguousDataSource>>,
}

impl SequentialDataSource {
    /// Builds the chain in precedence order.
    pub fn new(sources: Vec<Arc<dyn ContiguousDataSource>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl ContiguousDataSource for SequentialDataSource {
    async fn get_data(&self, params: GetDataParams) -> Result<ContiguousData, DataSourceError> {
        for source in &self.sources {
            if params.cancel.is_cancelled() {
                return Err(DataSourceError::Cancelled);
            }
            source_metrics().inc_source_attempt(source.label());
            match source.get_data(params.clone()).await {
                Ok(data) => {
                    source_metrics().inc_source_success(source.label());
                    return Ok(data);
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    source_metrics().inc_source_error(source.label(), e.code());
                    match &e {
                        DataSourceError::Fatal(_) => tracing::error!(
                            target: "sources",
                            source = source.label(),
                            id = %params.id,
                            error = %e,
                            "source failed"
                        ),
                        _ => tracing::debug!(
                            target: "sources",
                            source = source.label(),
                            id = %params.id,
                            error = %e,
                            "source yielded"
                        ),
                    }
                }
            }
        }
        Err(DataSourceError::NoSourceAvailable)
    }

    fn label(&self) -> &'static str {
        "sequential"
    }
}
