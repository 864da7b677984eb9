// Path: crates/sources/src/sampling.rs

//! The sampling decorator.
//!
//! Lets a configurable fraction of requests through to its inner source.
//! The deterministic strategy draws from the first four big-endian bytes
//! of `SHA-256(id)`, so a given id gets the same verdict in every
//! process and across restarts; the random strategy draws uniformly per
//! call.

use async_trait::async_trait;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use weave_api::{ContiguousDataSource, GetDataParams};
use weave_telemetry::source_metrics;
use weave_types::config::{SamplingConfig, SamplingStrategy};
use weave_types::data::ContiguousData;
use weave_types::error::DataSourceError;
use weave_types::id::TxId;

/// A probabilistic gate in front of one inner source.
pub struct SamplingDataSource {
    inner: Arc<dyn ContiguousDataSource>,
    rate: f64,
    strategy: SamplingStrategy,
}

/// The pure deterministic decision: `SHA-256(id)[0..4]` big-endian,
/// scaled into `[0, 1)`, compared against the rate.
pub fn deterministic_sample(id: &TxId, rate: f64) -> bool {
    let digest = Sha256::digest(id.to_b64url().as_bytes());
    let mut head = [0u8; 4];
    head.copy_from_slice(&digest[0..4]);
    let draw = u32::from_be_bytes(head) as f64 / 4_294_967_296.0;
    draw < rate
}

impl SamplingDataSource {
    /// Builds the gate; rates outside `[0, 1]` are clamped.
    pub fn new(inner: Arc<dyn ContiguousDataSource>, config: SamplingConfig) -> Self {
        Self {
            inner,
            rate: config.rate.clamp(0.0, 1.0),
            strategy: config.strategy,
        }
    }

    /// Decides whether this request is let through.
    pub fn should_sample(&self, id: &TxId) -> bool {
        match self.strategy {
            SamplingStrategy::Random => rand::thread_rng().gen::<f64>() < self.rate,
            SamplingStrategy::Deterministic => deterministic_sample(id, self.rate),
        }
    }
}

#[async_trait]
impl ContiguousDataSource for SamplingDataSource {
    async fn get_data(&self, params: GetDataParams) -> Result<ContiguousData, DataSourceError> {
        let sampled = self.should_sample(&params.id);
        source_metrics().inc_sampling_decision(sampled);
        if !sampled {
            return Err(DataSourceError::Filtered("not sampled".into()));
        }
        match self.inner.get_data(params).await {
            Ok(data) => Ok(data),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                tracing::debug!(target: "sources", error = %e, "sampled request failed");
                Err(e)
            }
        }
    }

    fn label(&self) -> &'static str {
        "sampling"
    }
}
