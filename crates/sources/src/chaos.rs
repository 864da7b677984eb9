// Path: crates/sources/src/chaos.rs

//! The chaos-injection decorator.
//!
//! Consults a failure simulator before delegating, so operators can
//! exercise the chain's fall-through behavior against a known fraction
//! of induced failures without touching the wrapped source.

use async_trait::async_trait;
use std::sync::Arc;
use weave_api::{ContiguousDataSource, GetDataParams};
use weave_types::data::ContiguousData;
use weave_types::error::DataSourceError;
use weave_workers::FailureSimulator;

/// A failure-injecting gate in front of one inner source.
pub struct ChaosDataSource {
    inner: Arc<dyn ContiguousDataSource>,
    simulator: FailureSimulator,
}

impl ChaosDataSource {
    /// Wraps `inner` with the given simulator.
    pub fn new(inner: Arc<dyn ContiguousDataSource>, simulator: FailureSimulator) -> Self {
        Self { inner, simulator }
    }
}

#[async_trait]
impl ContiguousDataSource for ChaosDataSource {
    async fn get_data(&self, params: GetDataParams) -> Result<ContiguousData, DataSourceError> {
        if self.simulator.maybe_fail().is_err() {
            return Err(DataSourceError::Transient("simulated failure".into()));
        }
        self.inner.get_data(params).await
    }

    fn label(&self) -> &'static str {
        "chaos"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_util::testing::CountingSource;
    use weave_types::id::TxId;

    #[tokio::test]
    async fn rate_one_always_injects() {
        let inner = Arc::new(CountingSource::succeeding(b"x"));
        let chaos = ChaosDataSource::new(
            Arc::clone(&inner) as Arc<dyn ContiguousDataSource>,
            FailureSimulator::new(1.0),
        );
        assert!(matches!(
            chaos.get_data(GetDataParams::new(TxId([0u8; 32]))).await,
            Err(DataSourceError::Transient(_))
        ));
        assert_eq!(inner.calls(), 0);
    }

    #[tokio::test]
    async fn rate_zero_never_injects() {
        let inner = Arc::new(CountingSource::succeeding(b"x"));
        let chaos = ChaosDataSource::new(
            Arc::clone(&inner) as Arc<dyn ContiguousDataSource>,
            FailureSimulator::new(0.0),
        );
        for _ in 0..20 {
            assert!(chaos
                .get_data(GetDataParams::new(TxId([0u8; 32])))
                .await
                .is_ok());
        }
        assert_eq!(inner.calls(), 20);
    }
}
