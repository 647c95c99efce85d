//! Core data types for the polling, ranking and history engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// A monitored RPC endpoint. Identity is the URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// RPC endpoint URL
    pub url: String,
    /// Display name
    pub name: String,
}

impl Endpoint {
    /// Create an endpoint; an empty name defaults to the URL
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        let url = url.into();
        let name = name.into();
        let name = if name.is_empty() { url.clone() } else { name };
        Self { url, name }
    }
}

/// JSON-RPC method used to probe an endpoint.
///
/// Each variant carries its own request shape and height-extraction rule,
/// selected once per cycle by the active method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProbeMethod {
    /// Substrate `chain_getBlock`; height from the block header, base-16
    #[default]
    #[serde(rename = "chain_getBlock")]
    ChainGetBlock,
    /// Substrate `chain_getFinalizedHead`; two-step: hash, then block by hash
    #[serde(rename = "chain_getFinalizedHead")]
    ChainGetFinalizedHead,
    /// Ethereum `eth_blockNumber`; height is the hex result itself
    #[serde(rename = "eth_blockNumber")]
    EthBlockNumber,
    /// Substrate `system_syncState`; height from `currentBlock`, decimal
    #[serde(rename = "system_syncState")]
    SystemSyncState,
}

impl ProbeMethod {
    /// Wire name of the JSON-RPC method
    pub fn rpc_name(&self) -> &'static str {
        match self {
            ProbeMethod::ChainGetBlock => "chain_getBlock",
            ProbeMethod::ChainGetFinalizedHead => "chain_getFinalizedHead",
            ProbeMethod::EthBlockNumber => "eth_blockNumber",
            ProbeMethod::SystemSyncState => "system_syncState",
        }
    }

    /// Parse a wire name back into a method
    pub fn from_rpc_name(name: &str) -> Option<Self> {
        match name {
            "chain_getBlock" => Some(ProbeMethod::ChainGetBlock),
            "chain_getFinalizedHead" => Some(ProbeMethod::ChainGetFinalizedHead),
            "eth_blockNumber" => Some(ProbeMethod::EthBlockNumber),
            "system_syncState" => Some(ProbeMethod::SystemSyncState),
            _ => None,
        }
    }

    /// JSON-RPC request body for the first call of this method
    pub fn request_body(&self) -> serde_json::Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": self.rpc_name(),
            "params": [],
        })
    }
}

impl std::fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.rpc_name())
    }
}

/// Transport-level outcome of a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// The RPC call completed and returned a well-formed result
    Success,
    /// The call failed at any layer (transport, protocol, parse, timeout)
    Error,
}

/// Result of probing one endpoint in one cycle. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    /// The probed endpoint
    pub endpoint: Endpoint,
    /// Outcome
    pub status: ProbeStatus,
    /// Comparable chain height, if the method yields one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    /// Wall-clock time from call start to final byte, in milliseconds
    pub response_time: f64,
    /// Completion time
    pub timestamp: DateTime<Utc>,
    /// Method that produced this result
    pub method: ProbeMethod,
    /// Whether the probe hit its deadline
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub timeout: bool,
    /// Error message, present on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Raw method-specific payload from a successful response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl ProbeResult {
    /// Whether the probe succeeded
    pub fn is_success(&self) -> bool {
        self.status == ProbeStatus::Success
    }
}

/// One poll cycle's ordered results, one per registered endpoint
pub type Snapshot = Vec<ProbeResult>;

/// Derived status category for one probe result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategory {
    /// Reachable and at (or near) the maximum observed height
    Success,
    /// Reachable but lagging more than two blocks behind
    Warning,
    /// Failed with a transport, protocol or parse error
    Error,
    /// Hit the probe deadline
    Timeout,
    /// No observation yet
    Unknown,
}

/// One point in an endpoint's latency series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyPoint {
    /// Observation time
    pub time: DateTime<Utc>,
    /// Response time in milliseconds
    pub value: f64,
    /// Whether the underlying probe failed
    pub error: bool,
}

/// Classification of a logged failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The probe hit its deadline
    Timeout,
    /// Any other failure
    Error,
}

/// One entry in an endpoint's error log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    /// When the failure was recorded
    pub timestamp: DateTime<Utc>,
    /// Timeout or plain error
    pub error_type: ErrorKind,
    /// Error message
    pub message: String,
    /// Response time of the failed probe, in milliseconds
    pub response_time: f64,
    /// Raw failure payload, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Derived per-endpoint metrics over a sliding time window.
///
/// Computed on demand from the latency series; never stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointMetrics {
    /// Mean latency of non-error points; infinite when none exist.
    /// Serialized as null, since JSON has no infinity.
    #[serde(serialize_with = "serialize_latency")]
    pub avg_latency: f64,
    /// Percentage of non-error points in the window
    pub uptime: f64,
    /// Number of points in the window
    pub data_points: usize,
    /// Number of error points in the window
    pub error_count: usize,
}

fn serialize_latency<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}
