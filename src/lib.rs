//! RPC endpoint monitor
//!
//! Concurrently probes a set of blockchain JSON-RPC endpoints for liveness
//! and chain height, ranks them per cycle, keeps bounded local history with
//! derived uptime/latency metrics, exports Prometheus gauges and serves the
//! results over HTTP.

pub mod config;
pub mod monitor;
pub mod server;
pub mod utils;

pub use config::Config;
pub use monitor::{
    Endpoint, HistoryStore, MetricsExporter, ProbeMethod, ProbeResult, Prober, RpcMonitor,
    Snapshot,
};
pub use utils::error::{MonitorError, Result};

use crate::config::DataSource;
use crate::server::{AppState, HttpServer};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The assembled monitoring service: poller, history, metrics and HTTP
/// server wired together from one configuration.
pub struct Monitor {
    config: Arc<Config>,
    monitor: RpcMonitor,
    history: Arc<HistoryStore>,
    registry: Registry,
}

impl Monitor {
    /// Build the service: storage is opened and prior history loaded, the
    /// gauges are registered and the observers are wired in order (history
    /// first, then the exporter).
    pub async fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let registry = Registry::new();

        let endpoints: Vec<Endpoint> = config.endpoints().iter().map(Endpoint::from).collect();
        let monitor = RpcMonitor::new(
            Prober::new()?,
            endpoints,
            Duration::from_millis(config.polling().timeout_ms),
            config.polling().method,
        );

        let storage = config.storage();
        let store = monitor::FileStore::new(&storage.dir)
            .await
            .map_err(|e| MonitorError::Storage(e.to_string()))?;
        let history = Arc::new(HistoryStore::new(
            Arc::new(store),
            storage.namespace.clone(),
            Duration::from_secs(storage.retention_days * 24 * 60 * 60),
            Duration::from_secs(storage.save_interval_secs),
        ));
        history.load().await?;

        let exporter = MetricsExporter::new(&registry)?;
        monitor.add_observer(history.clone());
        monitor.add_observer(Arc::new(exporter));

        Ok(Self {
            config,
            monitor,
            history,
            registry,
        })
    }

    /// The poll cycle coordinator
    pub fn monitor(&self) -> &RpcMonitor {
        &self.monitor
    }

    /// The history store
    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Run until shutdown: start the polling loop (in local mode), serve
    /// HTTP until the server exits, then stop the loop.
    pub async fn run(&self) -> Result<()> {
        let polling = self.config.polling();

        match polling.data_source {
            DataSource::Local => {
                self.monitor
                    .start(Duration::from_millis(polling.interval_ms), polling.method)
                    .await;
            }
            DataSource::Backend => {
                info!("backend data source configured, local polling loop disabled");
            }
        }

        let state = AppState::new(
            self.config.clone(),
            self.monitor.clone(),
            self.history.clone(),
            self.registry.clone(),
        );
        let result = HttpServer::new(state).start().await;

        self.monitor.stop().await;
        info!("monitor stopped");
        result
    }
}
