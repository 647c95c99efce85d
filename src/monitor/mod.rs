//! RPC endpoint monitoring engine
//!
//! The pipeline per cycle: the coordinator probes every registered endpoint
//! concurrently, ranks the results into a snapshot, then hands the snapshot
//! to observers (history store, Prometheus exporter).

pub mod classify;
pub mod coordinator;
pub mod exporter;
pub mod history;
pub mod persist;
pub mod probe;
pub mod types;

pub use classify::{classify, max_block_height};
pub use coordinator::{rank_order, RpcMonitor, SnapshotObserver};
pub use exporter::MetricsExporter;
pub use history::{ExportDocument, HistoryStore};
pub use persist::{FileStore, HistoryStorage, MemoryStore, StorageError};
pub use probe::Prober;
pub use types::{
    Endpoint, EndpointMetrics, ErrorEntry, ErrorKind, LatencyPoint, ProbeMethod, ProbeResult,
    ProbeStatus, Snapshot, StatusCategory,
};
