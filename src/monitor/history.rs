//! History and metrics aggregation
//!
//! Consumes each published snapshot, maintains the bounded per-(method,
//! endpoint) time series, rolling status windows and error logs, derives
//! uptime/latency metrics on demand and persists the whole state to a
//! storage backend with throttled writes and capacity-pressure eviction.

use crate::monitor::classify::{classify, max_block_height};
use crate::monitor::coordinator::SnapshotObserver;
use crate::monitor::persist::{HistoryStorage, StorageError};
use crate::monitor::types::{
    ErrorEntry, ErrorKind, LatencyPoint, ProbeMethod, ProbeResult, StatusCategory,
};
use crate::utils::error::{MonitorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Fixed length of the rolling status window per endpoint
pub const STATUS_WINDOW: usize = 7;

/// Latency series cap per (method, endpoint): ~24h at the 10s default cadence
pub const MAX_SERIES_POINTS: usize = 8640;

/// Error log cap per (method, endpoint)
pub const MAX_ERROR_ENTRIES: usize = 500;

/// Version tag written into export documents
const EXPORT_VERSION: &str = "1.0";

const BLOB_SERIES: &str = "monitor-data-by-method";
const BLOB_STATUS: &str = "endpoint-history-by-method";
const BLOB_ERRORS: &str = "endpoint-errors-by-method";

/// Nested map keyed first by method wire name, then by endpoint URL
type MethodMap<T> = HashMap<String, HashMap<String, T>>;

/// Versioned export of the full history/error state.
///
/// Import merges by (method, endpoint) key; imported entries replace
/// same-keyed existing entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// When the export was produced
    pub timestamp: DateTime<Utc>,
    /// Document format version
    pub version: String,
    /// Latency series per method per endpoint
    pub history_data: MethodMap<Vec<LatencyPoint>>,
    /// Rolling status windows per method per endpoint
    pub endpoint_history: MethodMap<Vec<StatusCategory>>,
    /// Error logs per method per endpoint
    #[serde(default)]
    pub endpoint_errors: MethodMap<Vec<ErrorEntry>>,
}

/// History store and metrics aggregator.
///
/// Ingest-then-persist runs as one critical section per cycle; readers and
/// import/export serialize against it through the same lock.
pub struct HistoryStore {
    storage: Arc<dyn HistoryStorage>,
    namespace: String,
    save_interval: Duration,
    state: tokio::sync::Mutex<StoreState>,
}

#[derive(Debug)]
struct StoreState {
    series: MethodMap<Vec<LatencyPoint>>,
    status: MethodMap<VecDeque<StatusCategory>>,
    errors: MethodMap<Vec<ErrorEntry>>,
    retention: chrono::Duration,
    last_save: Option<Instant>,
}

impl HistoryStore {
    /// Create a store over a storage backend.
    ///
    /// `namespace` prefixes the persisted blob names; `retention` is the
    /// wall-clock age cap; `save_interval` throttles durable writes.
    pub fn new(
        storage: Arc<dyn HistoryStorage>,
        namespace: impl Into<String>,
        retention: Duration,
        save_interval: Duration,
    ) -> Self {
        Self {
            storage,
            namespace: namespace.into(),
            save_interval,
            state: tokio::sync::Mutex::new(StoreState {
                series: HashMap::new(),
                status: HashMap::new(),
                errors: HashMap::new(),
                retention: chrono::Duration::from_std(retention)
                    .unwrap_or_else(|_| chrono::Duration::days(30)),
                last_save: None,
            }),
        }
    }

    fn blob_key(&self, suffix: &str) -> String {
        format!("{}-{}", self.namespace, suffix)
    }

    /// Load persisted state, dropping entries older than the retention age
    pub async fn load(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        if let Some(value) = self.load_blob(BLOB_SERIES).await? {
            state.series = serde_json::from_value(value)
                .map_err(|e| MonitorError::Storage(format!("corrupt history blob: {e}")))?;
        }
        if let Some(value) = self.load_blob(BLOB_STATUS).await? {
            state.status = serde_json::from_value(value)
                .map_err(|e| MonitorError::Storage(format!("corrupt status blob: {e}")))?;
        }
        if let Some(value) = self.load_blob(BLOB_ERRORS).await? {
            state.errors = serde_json::from_value(value)
                .map_err(|e| MonitorError::Storage(format!("corrupt error blob: {e}")))?;
        }

        prune_expired(&mut state, Utc::now());
        debug!(
            methods = state.series.len(),
            "loaded persisted history state"
        );
        Ok(())
    }

    async fn load_blob(&self, suffix: &str) -> Result<Option<serde_json::Value>> {
        self.storage
            .load(&self.blob_key(suffix))
            .await
            .map_err(|e| MonitorError::Storage(e.to_string()))
    }

    /// Ingest one complete snapshot: classify every result, update the
    /// rolling windows, series and error logs, then persist (throttled).
    pub async fn ingest(&self, snapshot: &[ProbeResult]) -> Result<()> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let max_height = max_block_height(snapshot);

        for result in snapshot {
            let method = result.method.rpc_name();
            let url = result.endpoint.url.as_str();
            let failed = !result.is_success() || result.timeout;

            let window = state
                .status
                .entry(method.to_string())
                .or_default()
                .entry(url.to_string())
                .or_insert_with(|| VecDeque::from(vec![StatusCategory::Unknown; STATUS_WINDOW]));
            window.push_back(classify(result, max_height));
            while window.len() > STATUS_WINDOW {
                window.pop_front();
            }

            let series = state
                .series
                .entry(method.to_string())
                .or_default()
                .entry(url.to_string())
                .or_default();
            series.push(LatencyPoint {
                time: now,
                value: result.response_time,
                error: failed,
            });
            trim_front(series, MAX_SERIES_POINTS);

            if failed {
                let log = state
                    .errors
                    .entry(method.to_string())
                    .or_default()
                    .entry(url.to_string())
                    .or_default();
                log.push(ErrorEntry {
                    timestamp: now,
                    error_type: if result.timeout {
                        ErrorKind::Timeout
                    } else {
                        ErrorKind::Error
                    },
                    message: result
                        .error
                        .clone()
                        .unwrap_or_else(|| "Unknown error".to_string()),
                    response_time: result.response_time,
                    details: result.raw.clone(),
                });
                trim_front(log, MAX_ERROR_ENTRIES);
            }
        }

        self.maybe_persist(&mut state, false).await
    }

    /// Persist the state unless a write happened within the save interval.
    ///
    /// On a capacity failure: halve the retention window, drop everything
    /// older than the new cutoff and retry once. A second failure is
    /// reported, not retried.
    async fn maybe_persist(&self, state: &mut StoreState, force: bool) -> Result<()> {
        if !force {
            if let Some(last) = state.last_save {
                if last.elapsed() < self.save_interval {
                    return Ok(());
                }
            }
        }
        state.last_save = Some(Instant::now());

        prune_expired(state, Utc::now());

        match self.persist_blobs(state).await {
            Ok(()) => Ok(()),
            Err(StorageError::CapacityExceeded(msg)) => {
                warn!(
                    error = %msg,
                    "storage capacity exceeded, halving retention window and retrying"
                );
                state.retention = state.retention / 2;
                prune_expired(state, Utc::now());

                self.persist_blobs(state).await.map_err(|e| {
                    error!(error = %e, "history persistence failed after pruning");
                    MonitorError::Storage(e.to_string())
                })
            }
            Err(e) => Err(MonitorError::Storage(e.to_string())),
        }
    }

    async fn persist_blobs(&self, state: &StoreState) -> std::result::Result<(), StorageError> {
        let series = serde_json::to_value(&state.series)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        self.storage.save(&self.blob_key(BLOB_SERIES), &series).await?;

        let status = serde_json::to_value(&state.status)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        self.storage.save(&self.blob_key(BLOB_STATUS), &status).await?;

        let errors = serde_json::to_value(&state.errors)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        self.storage.save(&self.blob_key(BLOB_ERRORS), &errors).await
    }

    /// Latency series for one (method, endpoint), filtered by age
    pub async fn history_series(
        &self,
        method: ProbeMethod,
        endpoint: &str,
        window: Duration,
    ) -> Vec<LatencyPoint> {
        let state = self.state.lock().await;
        let now = Utc::now();

        state
            .series
            .get(method.rpc_name())
            .and_then(|endpoints| endpoints.get(endpoint))
            .map(|series| {
                series
                    .iter()
                    .filter(|point| age_of(now, point.time) <= window)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Error log for one (method, endpoint), filtered by age, newest first
    pub async fn error_log(
        &self,
        method: ProbeMethod,
        endpoint: &str,
        window: Duration,
    ) -> Vec<ErrorEntry> {
        let state = self.state.lock().await;
        let now = Utc::now();

        let mut entries: Vec<ErrorEntry> = state
            .errors
            .get(method.rpc_name())
            .and_then(|endpoints| endpoints.get(endpoint))
            .map(|log| {
                log.iter()
                    .filter(|entry| age_of(now, entry.timestamp) <= window)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }

    /// Rolling status window for one (method, endpoint); seeded with
    /// `unknown` before the first observation
    pub async fn status_window(&self, method: ProbeMethod, endpoint: &str) -> Vec<StatusCategory> {
        let state = self.state.lock().await;
        state
            .status
            .get(method.rpc_name())
            .and_then(|endpoints| endpoints.get(endpoint))
            .map(|window| window.iter().copied().collect())
            .unwrap_or_else(|| vec![StatusCategory::Unknown; STATUS_WINDOW])
    }

    /// Derived metrics per endpoint over a sliding window.
    ///
    /// Endpoints with zero in-window points are omitted.
    pub async fn compute_metrics(
        &self,
        method: ProbeMethod,
        window: Duration,
    ) -> HashMap<String, crate::monitor::types::EndpointMetrics> {
        let state = self.state.lock().await;
        let now = Utc::now();
        let mut metrics = HashMap::new();

        let Some(endpoints) = state.series.get(method.rpc_name()) else {
            return metrics;
        };

        for (url, series) in endpoints {
            let recent: Vec<&LatencyPoint> = series
                .iter()
                .filter(|point| age_of(now, point.time) <= window)
                .collect();
            if recent.is_empty() {
                continue;
            }

            let error_count = recent.iter().filter(|point| point.error).count();
            let up_count = recent.len() - error_count;
            let uptime = (up_count as f64 / recent.len() as f64) * 100.0;

            let success_values: Vec<f64> = recent
                .iter()
                .filter(|point| !point.error)
                .map(|point| point.value)
                .collect();
            let avg_latency = if success_values.is_empty() {
                f64::INFINITY
            } else {
                success_values.iter().sum::<f64>() / success_values.len() as f64
            };

            metrics.insert(
                url.clone(),
                crate::monitor::types::EndpointMetrics {
                    avg_latency,
                    uptime,
                    data_points: recent.len(),
                    error_count,
                },
            );
        }

        metrics
    }

    /// Export the full history/error state as a versioned document
    pub async fn export(&self) -> ExportDocument {
        let state = self.state.lock().await;

        let endpoint_history = state
            .status
            .iter()
            .map(|(method, endpoints)| {
                let endpoints = endpoints
                    .iter()
                    .map(|(url, window)| (url.clone(), window.iter().copied().collect()))
                    .collect();
                (method.clone(), endpoints)
            })
            .collect();

        ExportDocument {
            timestamp: Utc::now(),
            version: EXPORT_VERSION.to_string(),
            history_data: state.series.clone(),
            endpoint_history,
            endpoint_errors: state.errors.clone(),
        }
    }

    /// Import a previously exported document.
    ///
    /// Merges by (method, endpoint) key, last writer wins: imported entries
    /// replace same-keyed existing entries, everything else is kept. The
    /// merged state is persisted immediately.
    pub async fn import(&self, doc: ExportDocument) -> Result<()> {
        if doc.version != EXPORT_VERSION {
            warn!(version = %doc.version, "importing document with unexpected version");
        }

        let mut state = self.state.lock().await;

        for (method, endpoints) in doc.history_data {
            for (url, mut series) in endpoints {
                trim_front(&mut series, MAX_SERIES_POINTS);
                state
                    .series
                    .entry(method.clone())
                    .or_default()
                    .insert(url, series);
            }
        }

        for (method, endpoints) in doc.endpoint_history {
            for (url, window) in endpoints {
                let mut window: VecDeque<StatusCategory> = window.into();
                while window.len() > STATUS_WINDOW {
                    window.pop_front();
                }
                state
                    .status
                    .entry(method.clone())
                    .or_default()
                    .insert(url, window);
            }
        }

        for (method, endpoints) in doc.endpoint_errors {
            for (url, mut log) in endpoints {
                trim_front(&mut log, MAX_ERROR_ENTRIES);
                state
                    .errors
                    .entry(method.clone())
                    .or_default()
                    .insert(url, log);
            }
        }

        self.maybe_persist(&mut state, true).await
    }

    /// Drop all history for one method
    pub async fn clear(&self, method: ProbeMethod) -> Result<()> {
        let mut state = self.state.lock().await;
        state.series.remove(method.rpc_name());
        state.status.remove(method.rpc_name());
        state.errors.remove(method.rpc_name());
        self.maybe_persist(&mut state, true).await
    }
}

#[async_trait::async_trait]
impl SnapshotObserver for HistoryStore {
    async fn on_snapshot(&self, snapshot: &[ProbeResult]) {
        if let Err(e) = self.ingest(snapshot).await {
            warn!(error = %e, "history ingestion failed");
        }
    }
}

/// Drop the oldest entries until `values` fits the cap
fn trim_front<T>(values: &mut Vec<T>, cap: usize) {
    if values.len() > cap {
        let excess = values.len() - cap;
        values.drain(..excess);
    }
}

/// Drop all points and error entries older than the retention cutoff
fn prune_expired(state: &mut StoreState, now: DateTime<Utc>) {
    let cutoff = now - state.retention;

    for endpoints in state.series.values_mut() {
        for series in endpoints.values_mut() {
            series.retain(|point| point.time >= cutoff);
        }
    }
    for endpoints in state.errors.values_mut() {
        for log in endpoints.values_mut() {
            log.retain(|entry| entry.timestamp >= cutoff);
        }
    }
}

/// Age of an observation, saturating to zero for future timestamps
fn age_of(now: DateTime<Utc>, time: DateTime<Utc>) -> Duration {
    (now - time).to_std().unwrap_or_default()
}
