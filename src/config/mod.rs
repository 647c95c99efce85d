//! Configuration management for the monitor
//!
//! This module handles loading and validation of all monitor configuration.

pub mod models;

pub use models::*;

use crate::utils::error::{MonitorError, Result};
use std::path::Path;
use tracing::{debug, info};

/// Default config file path checked when no explicit path is given
const DEFAULT_CONFIG_PATH: &str = "config/monitor.yaml";

/// Main configuration struct for the monitor
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Monitor configuration
    pub monitor: MonitorConfig,
}

impl Config {
    /// Load configuration from file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MonitorError::Config(format!("Failed to read config file: {}", e)))?;

        let monitor: MonitorConfig = serde_yaml::from_str(&content)
            .map_err(|e| MonitorError::Config(format!("Failed to parse config: {}", e)))?;

        let mut config = Self { monitor };
        config.apply_env_overrides();
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from the `MONITOR_CONFIG` path, the default
    /// config file, or built-in defaults, in that order.
    pub async fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("MONITOR_CONFIG") {
            return Self::from_file(path).await;
        }

        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            return Self::from_file(DEFAULT_CONFIG_PATH).await;
        }

        info!("No config file found, using defaults with environment overrides");
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides on top of the loaded values
    fn apply_env_overrides(&mut self) {
        if let Some(interval) = std::env::var("CHECK_INTERVAL")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.monitor.polling.interval_ms = interval;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            self.monitor.server.port = port;
        }
        if let Ok(url) = std::env::var("PROMETHEUS_URL") {
            self.monitor.prometheus_url = url;
        }
    }

    /// Get server configuration
    pub fn server(&self) -> &ServerConfig {
        &self.monitor.server
    }

    /// Get polling configuration
    pub fn polling(&self) -> &PollingConfig {
        &self.monitor.polling
    }

    /// Get storage configuration
    pub fn storage(&self) -> &StorageConfig {
        &self.monitor.storage
    }

    /// Get the configured endpoints
    pub fn endpoints(&self) -> &[EndpointConfig] {
        &self.monitor.endpoints
    }

    /// Get the Prometheus base URL for historical queries
    pub fn prometheus_url(&self) -> &str {
        &self.monitor.prometheus_url
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        if self.monitor.polling.interval_ms == 0 {
            return Err(MonitorError::Config(
                "polling.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.monitor.polling.timeout_ms == 0 {
            return Err(MonitorError::Config(
                "polling.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.monitor.storage.retention_days == 0 {
            return Err(MonitorError::Config(
                "storage.retention_days must be greater than zero".to_string(),
            ));
        }
        if self.monitor.endpoints.is_empty() {
            return Err(MonitorError::Config(
                "at least one endpoint must be configured".to_string(),
            ));
        }

        for endpoint in &self.monitor.endpoints {
            url::Url::parse(&endpoint.url).map_err(|e| {
                MonitorError::Config(format!("invalid endpoint url {:?}: {}", endpoint.url, e))
            })?;
        }

        url::Url::parse(&self.monitor.prometheus_url).map_err(|e| {
            MonitorError::Config(format!(
                "invalid prometheus url {:?}: {}",
                self.monitor.prometheus_url, e
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = Config::default();
        config.monitor.polling.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_endpoint_url_rejected() {
        let mut config = Config::default();
        config.monitor.endpoints[0].url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_endpoints_rejected() {
        let mut config = Config::default();
        config.monitor.endpoints.clear();
        assert!(config.validate().is_err());
    }
}
