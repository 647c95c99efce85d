//! Configuration models for the monitor

use crate::monitor::types::{Endpoint, ProbeMethod};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Polling configuration
    #[serde(default)]
    pub polling: PollingConfig,
    /// History persistence configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Monitored RPC endpoints
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointConfig>,
    /// Base URL of the Prometheus instance used for historical queries
    #[serde(default = "default_prometheus_url")]
    pub prometheus_url: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            polling: PollingConfig::default(),
            storage: StorageConfig::default(),
            endpoints: default_endpoints(),
            prometheus_url: default_prometheus_url(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Interval between poll cycles in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Per-probe timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Active probe method
    #[serde(default)]
    pub method: ProbeMethod,
    /// Where consumers read results from (local poller or remote backend)
    #[serde(default)]
    pub data_source: DataSource,
    /// Cadence for consumers polling the backend, in milliseconds
    #[serde(default = "default_backend_poll_ms")]
    pub backend_poll_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
            method: ProbeMethod::default(),
            data_source: DataSource::default(),
            backend_poll_interval_ms: default_backend_poll_ms(),
        }
    }
}

/// Data source mode for downstream consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Consumers read snapshots produced by the local poller
    #[default]
    Local,
    /// Consumers poll the backend status endpoint at a fixed cadence
    Backend,
}

/// History persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for persisted history blobs
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
    /// Namespace prefix for blob names
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Retention age for persisted history, in days
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// Minimum interval between durable writes, in seconds
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            namespace: default_namespace(),
            retention_days: default_retention_days(),
            save_interval_secs: default_save_interval_secs(),
        }
    }
}

/// A monitored endpoint as it appears in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// RPC endpoint URL
    pub url: String,
    /// Display name; defaults to the URL when empty
    #[serde(default)]
    pub name: String,
}

impl From<&EndpointConfig> for Endpoint {
    fn from(config: &EndpointConfig) -> Self {
        Endpoint::new(config.url.clone(), config.name.clone())
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_interval_ms() -> u64 {
    10_000
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_backend_poll_ms() -> u64 {
    5_000
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_namespace() -> String {
    "rpc".to_string()
}

fn default_retention_days() -> u64 {
    30
}

fn default_save_interval_secs() -> u64 {
    30
}

fn default_prometheus_url() -> String {
    "http://prometheus:9090".to_string()
}

fn default_endpoints() -> Vec<EndpointConfig> {
    vec![
        EndpointConfig {
            url: "https://rpc.polkadot.io".to_string(),
            name: "Parity".to_string(),
        },
        EndpointConfig {
            url: "https://polkadot-rpc.dwellir.com".to_string(),
            name: "Dwellir".to_string(),
        },
        EndpointConfig {
            url: "https://rpc.ibp.network/polkadot".to_string(),
            name: "IBP".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.polling.interval_ms, 10_000);
        assert_eq!(config.polling.timeout_ms, 5_000);
        assert_eq!(config.polling.method, ProbeMethod::ChainGetBlock);
        assert_eq!(config.polling.data_source, DataSource::Local);
        assert_eq!(config.storage.retention_days, 30);
        assert!(!config.endpoints.is_empty());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
polling:
  interval_ms: 2000
endpoints:
  - url: "https://example.com/rpc"
    name: "Example"
"#;
        let config: MonitorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.polling.interval_ms, 2000);
        assert_eq!(config.polling.timeout_ms, 5000);
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].name, "Example");
    }

    #[test]
    fn test_method_parses_rpc_name() {
        let yaml = r#"
polling:
  method: "eth_blockNumber"
"#;
        let config: MonitorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.polling.method, ProbeMethod::EthBlockNumber);
    }
}
