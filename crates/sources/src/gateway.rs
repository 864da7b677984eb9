// Path: crates/sources/src/gateway.rs

//! The trusted-gateway fall-through source.
//!
//! Streams `GET /raw/{id}` from a peer gateway, deriving a `Range`
//! header from the requested region. Bytes from a peer are never
//! verified here; trust is whatever the operator configured for the
//! peer.

use crate::stream_util::cancellable;
use async_trait::async_trait;
use futures::TryStreamExt;
use std::time::Duration;
use weave_api::{ContiguousDataSource, GetDataParams};
use weave_types::config::TrustedGatewayConfig;
use weave_types::data::{ContiguousData, Region};
use weave_types::error::DataSourceError;

/// A peer gateway as a data source.
pub struct GatewayDataSource {
    http: reqwest::Client,
    base_url: String,
    trusted: bool,
}

/// Renders a `Range` header for a region; regions are half-open, HTTP
/// ranges are inclusive.
pub(crate) fn range_header(region: &Region) -> String {
    format!(
        "bytes={}-{}",
        region.offset,
        region.offset + region.size.saturating_sub(1)
    )
}

impl GatewayDataSource {
    /// Builds the source for one peer.
    pub fn new(config: &TrustedGatewayConfig) -> Result<Self, DataSourceError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DataSourceError::Fatal(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            trusted: config.trusted,
        })
    }

    fn classify_status(status: reqwest::StatusCode) -> Option<DataSourceError> {
        if status.is_success() {
            None
        } else if status.as_u16() == 404 {
            Some(DataSourceError::NotFound)
        } else if status.as_u16() == 429 || status.is_server_error() {
            Some(DataSourceError::Transient(format!(
                "gateway status {}",
                status.as_u16()
            )))
        } else {
            Some(DataSourceError::Fatal(format!(
                "gateway status {}",
                status.as_u16()
            )))
        }
    }
}

#[async_trait]
impl ContiguousDataSource for GatewayDataSource {
    async fn get_data(&self, params: GetDataParams) -> Result<ContiguousData, DataSourceError> {
        if params.cancel.is_cancelled() {
            return Err(DataSourceError::Cancelled);
        }

        let mut request = self
            .http
            .get(format!("{}/raw/{}", self.base_url, params.id));
        if let Some(region) = &params.region {
            request = request.header(reqwest::header::RANGE, range_header(region));
        }

        let response = tokio::select! {
            _ = params.cancel.cancelled() => return Err(DataSourceError::Cancelled),
            sent = request.send() => sent.map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    DataSourceError::Transient(e.to_string())
                } else {
                    DataSourceError::Fatal(e.to_string())
                }
            })?,
        };

        if let Some(error) = Self::classify_status(response.status()) {
            return Err(error);
        }

        let size = response
            .content_length()
            .ok_or_else(|| DataSourceError::Fatal("gateway response without a length".into()))?;
        let source_content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes_stream()
            .map_err(|e| DataSourceError::Transient(e.to_string()));
        let stream = cancellable(Box::pin(body), params.cancel.clone());

        Ok(ContiguousData {
            stream,
            size,
            source_content_type,
            verified: false,
            trusted: self.trusted,
            cached: false,
        })
    }

    fn label(&self) -> &'static str {
        "gateway"
    }
}
