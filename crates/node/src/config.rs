// Path: crates/node/src/config.rs

//! Configuration loading.

use anyhow::Context;
use std::path::Path;
use weave_types::config::GatewayConfig;

/// Loads the gateway config from a JSON file, or the defaults when no
/// path is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<GatewayConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let config = serde_json::from_slice(&raw)
                .with_context(|| format!("parsing config {}", path.display()))?;
            Ok(config)
        }
        None => Ok(GatewayConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.chain.max_retries, 3);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, br#"{"chain":{"url":"https://node.example"}}"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.chain.url, "https://node.example");
        assert_eq!(config.chain.max_retries, 3);
    }

    #[test]
    fn unreadable_files_error() {
        assert!(load_config(Some(Path::new("/nonexistent/config.json"))).is_err());
    }
}
