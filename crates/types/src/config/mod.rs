// Path: crates/types/src/config/mod.rs

//! Shared configuration structures for gateway components.
//!
//! The composition root deserializes one [`GatewayConfig`] and hands each
//! component its own section by value; no component reads configuration
//! globals.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Root directory for all persisted state (caches, KV, headers).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Chain node access.
    #[serde(default)]
    pub chain: ChainConfig,
    /// Trusted gateway used as a fall-through source, if any.
    #[serde(default)]
    pub trusted_gateway: Option<TrustedGatewayConfig>,
    /// Request filtering policy.
    #[serde(default)]
    pub filter: FilterConfig,
    /// Optional request sampling applied to the retrieval chain.
    #[serde(default)]
    pub sampling: Option<SamplingConfig>,
    /// KV-buffer backend selection.
    #[serde(default)]
    pub kv: KvBackendConfig,
    /// Worker queue sizing.
    #[serde(default)]
    pub workers: WorkersConfig,
    /// Path to the offset-block mapping JSON, if present.
    #[serde(default)]
    pub offset_mapping_path: Option<PathBuf>,
    /// Optional chaos injection for resilience testing.
    #[serde(default)]
    pub chaos: Option<ChaosConfig>,
    /// Listen address for the metrics endpoint.
    #[serde(default = "default_metrics_listen")]
    pub metrics_listen: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            chain: ChainConfig::default(),
            trusted_gateway: None,
            filter: FilterConfig::default(),
            sampling: None,
            kv: KvBackendConfig::default(),
            workers: WorkersConfig::default(),
            offset_mapping_path: None,
            chaos: None,
            metrics_listen: default_metrics_listen(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_metrics_listen() -> String {
    "127.0.0.1:9100".to_string()
}

/// Chain node access configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Base URL of the chain node.
    #[serde(default = "default_chain_url")]
    pub url: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum retry attempts for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            url: default_chain_url(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

fn default_chain_url() -> String {
    "https://arweave.net".to_string()
}
fn default_request_timeout_ms() -> u64 {
    15_000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    100
}

/// A gateway peer used by the gateway fall-through source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedGatewayConfig {
    /// Base URL of the peer gateway.
    pub url: String,
    /// Whether responses from this peer are marked trusted.
    #[serde(default = "default_true")]
    pub trusted: bool,
}

fn default_true() -> bool {
    true
}

/// Request filtering policy for the filtering decorator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Origins refused outright.
    #[serde(default)]
    pub blocked_origins: Vec<String>,
    /// Client addresses refused outright: exact IPs or IPv4 CIDR blocks.
    #[serde(default)]
    pub blocked_ip_addresses: Vec<String>,
}

/// Which sampling decision function the sampling decorator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// A uniform random draw per call.
    Random,
    /// A pure function of the id, stable across processes.
    Deterministic,
}

/// Sampling decorator configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Probability in `[0, 1]` that a request is let through.
    pub rate: f64,
    /// The decision function.
    pub strategy: SamplingStrategy,
}

/// Selects the backing implementation for the shared KV buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "backend")]
pub enum KvBackendConfig {
    /// One file per key under a spill directory.
    Fs {
        /// Directory for the key files, relative to `data_dir` if relative.
        path: PathBuf,
    },
    /// A single embedded log-structured database file.
    Redb {
        /// Database file path, relative to `data_dir` if relative.
        path: PathBuf,
    },
    /// In-process bounded LRU with per-entry TTL. Not durable.
    Lru {
        /// Maximum number of resident keys.
        max_keys: usize,
        /// Seconds before an entry expires.
        ttl_seconds: u64,
    },
    /// A networked Redis instance with per-key TTL.
    Redis {
        /// Connection URL.
        url: String,
        /// Seconds before a key expires.
        ttl_seconds: u64,
    },
}

impl Default for KvBackendConfig {
    fn default() -> Self {
        KvBackendConfig::Redb {
            path: PathBuf::from("kv.redb"),
        }
    }
}

/// Sizing for one worker queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Number of concurrent workers.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Maximum queued items before non-prioritised enqueues drop.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            max_queue_size: default_max_queue_size(),
        }
    }
}

fn default_worker_count() -> usize {
    1
}
fn default_max_queue_size() -> usize {
    1000
}

/// Worker queue sizing per importer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkersConfig {
    /// Data content attribute importer.
    #[serde(default)]
    pub attributes: QueueConfig,
    /// Transaction offset importer.
    #[serde(default)]
    pub tx_offsets: QueueConfig,
    /// Data verification worker.
    #[serde(default)]
    pub verification: QueueConfig,
}

/// Chaos injection configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChaosConfig {
    /// Probability in `[0, 1]` that a wrapped source call fails.
    pub failure_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: GatewayConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.chain.max_retries, 3);
        assert!(cfg.trusted_gateway.is_none());
        assert!(matches!(cfg.kv, KvBackendConfig::Redb { .. }));
    }

    #[test]
    fn kv_backend_is_tagged() {
        let cfg: KvBackendConfig = serde_json::from_str(
            r#"{"backend":"lru","max_keys":100,"ttl_seconds":60}"#,
        )
        .unwrap();
        assert!(matches!(cfg, KvBackendConfig::Lru { max_keys: 100, ttl_seconds: 60 }));
    }
}
