//! Shared application state for the HTTP server

use crate::config::Config;
use crate::monitor::{HistoryStore, RpcMonitor};
use prometheus::Registry;
use std::sync::Arc;

/// State shared across all route handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<Config>,
    /// The poll cycle coordinator
    pub monitor: RpcMonitor,
    /// History store and metrics aggregator
    pub history: Arc<HistoryStore>,
    /// Registry backing the /metrics exposition
    pub registry: Registry,
    /// Client for proxied Prometheus range queries
    pub http: reqwest::Client,
}

impl AppState {
    /// Assemble the shared state
    pub fn new(
        config: Arc<Config>,
        monitor: RpcMonitor,
        history: Arc<HistoryStore>,
        registry: Registry,
    ) -> Self {
        Self {
            config,
            monitor,
            history,
            registry,
            http: reqwest::Client::new(),
        }
    }
}
