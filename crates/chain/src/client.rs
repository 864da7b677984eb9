// Path: crates/chain/src/client.rs

//! The reqwest-backed chain client.
//!
//! Transient upstream failures (timeouts, 429, 5xx) are retried with
//! capped exponential backoff; everything else surfaces immediately.
//! `find_tx_by_offset` binary-searches block headers inside the bracket
//! supplied by the offset-block mapping, then walks the winning block's
//! transactions by their weave sub-ranges.

use crate::mapping::OffsetBlockMapping;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use weave_api::ChainClient;
use weave_types::chain::{ChainBlock, ChainChunkEnvelope, ChainTx, ChainTxOffset};
use weave_types::config::ChainConfig;
use weave_types::error::ChainError;
use weave_types::id::TxId;

/// HTTP access to a chain node.
pub struct HttpChainClient {
    http: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_base_delay: Duration,
    mapping: Option<OffsetBlockMapping>,
}

enum Fetched {
    Body(bytes::Bytes),
    Missing,
    Transient(String),
    Status(u16),
}

impl HttpChainClient {
    /// Builds the client from its config and an optional offset mapping.
    pub fn new(
        config: &ChainConfig,
        mapping: Option<OffsetBlockMapping>,
    ) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            mapping,
        })
    }

    async fn fetch_once(&self, path: &str) -> Fetched {
        let url = format!("{}{}", self.base_url, path);
        match self.http.get(&url).send().await {
            Err(e) => Fetched::Transient(e.to_string()),
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    match resp.bytes().await {
                        Ok(body) => Fetched::Body(body),
                        Err(e) => Fetched::Transient(e.to_string()),
                    }
                } else if status.as_u16() == 404 {
                    Fetched::Missing
                } else if status.as_u16() == 429 || status.is_server_error() {
                    Fetched::Transient(format!("status {}", status.as_u16()))
                } else {
                    Fetched::Status(status.as_u16())
                }
            }
        }
    }

    /// Fetches `path`, retrying transient failures with exponential backoff.
    async fn fetch(&self, path: &str) -> Result<bytes::Bytes, ChainError> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_once(path).await {
                Fetched::Body(body) => return Ok(body),
                Fetched::Missing => return Err(ChainError::NotFound),
                Fetched::Status(code) => return Err(ChainError::Status(code)),
                Fetched::Transient(reason) => {
                    if attempt >= self.max_retries {
                        return Err(ChainError::Transient(reason));
                    }
                    let delay = self.retry_base_delay * 2u32.saturating_pow(attempt);
                    tracing::debug!(
                        target: "chain",
                        path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        reason,
                        "retrying transient chain failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ChainError> {
        let body = self.fetch(path).await?;
        serde_json::from_slice(&body).map_err(|e| ChainError::Decode(e.to_string()))
    }

    async fn fetch_text(&self, path: &str) -> Result<String, ChainError> {
        let body = self.fetch(path).await?;
        String::from_utf8(body.to_vec()).map_err(|e| ChainError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn get_tx(&self, id: &TxId) -> Result<ChainTx, ChainError> {
        self.fetch_json(&format!("/tx/{}", id)).await
    }

    async fn get_tx_offset(&self, id: &TxId) -> Result<ChainTxOffset, ChainError> {
        self.fetch_json(&format!("/tx/{}/offset", id)).await
    }

    async fn get_tx_field(&self, id: &TxId, field: &str) -> Result<serde_json::Value, ChainError> {
        let text = self.fetch_text(&format!("/tx/{}/{}", id, field)).await?;
        // Scalar fields come back as bare text, structured ones as JSON.
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }

    async fn find_tx_by_offset(&self, offset: u64) -> Result<Option<(TxId, u64)>, ChainError> {
        crate::search::find_tx_by_offset(self, self.mapping.as_ref(), offset).await
    }

    async fn get_block_by_height(&self, height: u64) -> Result<ChainBlock, ChainError> {
        self.fetch_json(&format!("/block/height/{}", height)).await
    }

    async fn get_pending_tx_ids(&self) -> Result<Vec<TxId>, ChainError> {
        self.fetch_json("/tx/pending").await
    }

    async fn get_height(&self) -> Result<u64, ChainError> {
        let text = self.fetch_text("/height").await?;
        text.trim()
            .parse()
            .map_err(|_| ChainError::Decode(format!("bad height {:?}", text)))
    }

    async fn get_chunk(&self, absolute_offset: u64) -> Result<ChainChunkEnvelope, ChainError> {
        self.fetch_json(&format!("/chunk/{}", absolute_offset)).await
    }
}
