// Path: crates/sources/src/filtered.rs

//! The origin / client-IP filtering decorator.
//!
//! Refuses a request before delegating when its origin is in the blocked
//! set or its client address matches a blocked entry (exact text match,
//! or IPv4 CIDR containment for entries carrying a `/`). CIDR masks use
//! unsigned arithmetic throughout, so a `/0` entry matches every
//! address.

use async_trait::async_trait;
use ipnetwork::Ipv4Network;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use weave_api::{ContiguousDataSource, GetDataParams};
use weave_types::config::FilterConfig;
use weave_types::data::ContiguousData;
use weave_types::error::DataSourceError;

enum BlockedAddress {
    Exact(String),
    Network(Ipv4Network),
}

/// A policy gate in front of one inner source.
pub struct FilteredDataSource {
    inner: Arc<dyn ContiguousDataSource>,
    blocked_origins: HashSet<String>,
    blocked_addresses: Vec<BlockedAddress>,
}

impl FilteredDataSource {
    /// Builds the gate from its config; unparsable CIDR entries are
    /// logged and skipped rather than silently blocking nothing.
    pub fn new(inner: Arc<dyn ContiguousDataSource>, config: &FilterConfig) -> Self {
        let mut blocked_addresses = Vec::with_capacity(config.blocked_ip_addresses.len());
        for entry in &config.blocked_ip_addresses {
            if entry.contains('/') {
                match entry.parse::<Ipv4Network>() {
                    Ok(network) => blocked_addresses.push(BlockedAddress::Network(network)),
                    Err(e) => {
                        tracing::warn!(target: "sources", entry, error = %e, "ignoring unparsable blocked CIDR");
                    }
                }
            } else {
                blocked_addresses.push(BlockedAddress::Exact(entry.clone()));
            }
        }
        Self {
            inner,
            blocked_origins: config.blocked_origins.iter().cloned().collect(),
            blocked_addresses,
        }
    }

    /// True when `client_ip` matches a blocked entry.
    pub fn is_ip_blocked(&self, client_ip: &str) -> bool {
        let parsed: Option<IpAddr> = client_ip.parse().ok();
        self.blocked_addresses.iter().any(|blocked| match blocked {
            BlockedAddress::Exact(entry) => entry == client_ip,
            BlockedAddress::Network(network) => match parsed {
                Some(IpAddr::V4(v4)) => network.contains(v4),
                _ => false,
            },
        })
    }
}

#[async_trait]
impl ContiguousDataSource for FilteredDataSource {
    async fn get_data(&self, params: GetDataParams) -> Result<ContiguousData, DataSourceError> {
        if let Some(attributes) = &params.attributes {
            if let Some(origin) = &attributes.origin {
                if self.blocked_origins.contains(origin) {
                    return Err(DataSourceError::Filtered(format!(
                        "origin {} is blocked",
                        origin
                    )));
                }
            }
            if let Some(client_ip) = &attributes.client_ip {
                if self.is_ip_blocked(client_ip) {
                    return Err(DataSourceError::Filtered("client address is blocked".into()));
                }
            }
        }
        self.inner.get_data(params).await
    }

    fn label(&self) -> &'static str {
        "filtered"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_util::testing::CountingSource;
    use weave_types::data::RequestAttributes;
    use weave_types::id::TxId;

    fn source(config: &FilterConfig) -> (Arc<CountingSource>, FilteredDataSource) {
        let inner = Arc::new(CountingSource::succeeding(b"ok"));
        let filtered = FilteredDataSource::new(
            Arc::clone(&inner) as Arc<dyn ContiguousDataSource>,
            config,
        );
        (inner, filtered)
    }

    fn params_for(origin: Option<&str>, client_ip: Option<&str>) -> GetDataParams {
        let mut params = GetDataParams::new(TxId([0u8; 32]));
        params.attributes = Some(RequestAttributes {
            origin: origin.map(str::to_string),
            client_ip: client_ip.map(str::to_string),
            hops: None,
        });
        params
    }

    #[tokio::test]
    async fn cidr_blocks_contained_addresses_only() {
        let config = FilterConfig {
            blocked_origins: vec![],
            blocked_ip_addresses: vec!["10.0.0.0/8".to_string()],
        };
        let (inner, filtered) = source(&config);

        assert!(matches!(
            filtered.get_data(params_for(None, Some("10.1.2.3"))).await,
            Err(DataSourceError::Filtered(_))
        ));
        assert_eq!(inner.calls(), 0);

        assert!(filtered
            .get_data(params_for(None, Some("11.0.0.1")))
            .await
            .is_ok());
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn zero_prefix_blocks_everything() {
        let config = FilterConfig {
            blocked_origins: vec![],
            blocked_ip_addresses: vec!["0.0.0.0/0".to_string()],
        };
        let (_, filtered) = source(&config);
        assert!(filtered.is_ip_blocked("1.2.3.4"));
        assert!(filtered.is_ip_blocked("255.255.255.255"));
    }

    #[tokio::test]
    async fn exact_entries_match_textually() {
        let config = FilterConfig {
            blocked_origins: vec![],
            blocked_ip_addresses: vec!["192.0.2.7".to_string()],
        };
        let (_, filtered) = source(&config);
        assert!(filtered.is_ip_blocked("192.0.2.7"));
        assert!(!filtered.is_ip_blocked("192.0.2.8"));
    }

    #[tokio::test]
    async fn blocked_origins_are_refused() {
        let config = FilterConfig {
            blocked_origins: vec!["bad-gateway.example".to_string()],
            blocked_ip_addresses: vec![],
        };
        let (inner, filtered) = source(&config);

        assert!(matches!(
            filtered
                .get_data(params_for(Some("bad-gateway.example"), None))
                .await,
            Err(DataSourceError::Filtered(_))
        ));
        assert!(filtered
            .get_data(params_for(Some("good.example"), None))
            .await
            .is_ok());
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn requests_without_attributes_pass_through() {
        let config = FilterConfig {
            blocked_origins: vec!["x".to_string()],
            blocked_ip_addresses: vec!["10.0.0.0/8".to_string()],
        };
        let (inner, filtered) = source(&config);
        assert!(filtered
            .get_data(GetDataParams::new(TxId([0u8; 32])))
            .await
            .is_ok());
        assert_eq!(inner.calls(), 1);
    }
}
