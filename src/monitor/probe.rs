//! Probe execution
//!
//! Issues one JSON-RPC call set (possibly two chained calls) against one
//! endpoint under a cancellable deadline and normalizes every outcome into
//! a [`ProbeResult`]. Probing never fails as a `Result`; all failure paths
//! produce an error result for that endpoint only.

use crate::monitor::types::{Endpoint, ProbeMethod, ProbeResult, ProbeStatus};
use crate::utils::error::Result;
use chrono::Utc;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

/// Probe executor backed by one shared HTTP client
#[derive(Debug, Clone)]
pub struct Prober {
    client: reqwest::Client,
}

impl Prober {
    /// Create a prober.
    ///
    /// The client carries no global timeout; the per-probe deadline is
    /// enforced around the whole call set, including the second hop of the
    /// finalized-head method.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rpcwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Probe one endpoint with the given method under a deadline.
    ///
    /// On deadline expiry the in-flight call is cancelled and a timeout
    /// result is returned with `response_time` equal to the configured
    /// timeout.
    pub async fn probe(
        &self,
        endpoint: &Endpoint,
        timeout: Duration,
        method: ProbeMethod,
    ) -> ProbeResult {
        let started = Instant::now();

        match tokio::time::timeout(timeout, self.execute(endpoint, method, started)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(endpoint = %endpoint.url, method = %method, "probe timed out");
                ProbeResult {
                    endpoint: endpoint.clone(),
                    status: ProbeStatus::Error,
                    block_height: None,
                    response_time: timeout.as_millis() as f64,
                    timestamp: Utc::now(),
                    method,
                    timeout: true,
                    error: Some(format!("Request timed out after {}ms", timeout.as_millis())),
                    raw: None,
                }
            }
        }
    }

    async fn execute(
        &self,
        endpoint: &Endpoint,
        method: ProbeMethod,
        started: Instant,
    ) -> ProbeResult {
        let first = match self.call(&endpoint.url, method.request_body()).await {
            Ok(value) => value,
            Err(message) => return failure(endpoint, method, message, started),
        };

        if let Some(message) = rpc_error_message(&first) {
            return failure(endpoint, method, message, started);
        }

        let (block_height, raw) = match method {
            ProbeMethod::ChainGetFinalizedHead => {
                match self.finalized_head_height(endpoint, &first).await {
                    Ok(extracted) => extracted,
                    Err(message) => return failure(endpoint, method, message, started),
                }
            }
            ProbeMethod::ChainGetBlock => {
                let result = first.get("result").unwrap_or(&Value::Null);
                match parse_header_number(result) {
                    Ok(height) => (Some(height), Some(result.clone())),
                    Err(message) => return failure(endpoint, method, message, started),
                }
            }
            ProbeMethod::EthBlockNumber => match first.get("result").and_then(Value::as_str) {
                Some(hex) => match parse_hex_u64(hex) {
                    Ok(height) => (Some(height), None),
                    Err(message) => return failure(endpoint, method, message, started),
                },
                None => {
                    return failure(
                        endpoint,
                        method,
                        "missing hex block number in result".to_string(),
                        started,
                    );
                }
            },
            ProbeMethod::SystemSyncState => {
                let result = first.get("result").unwrap_or(&Value::Null);
                match result.get("currentBlock").and_then(Value::as_u64) {
                    Some(height) => (Some(height), Some(result.clone())),
                    None => {
                        return failure(
                            endpoint,
                            method,
                            "missing currentBlock in sync state".to_string(),
                            started,
                        );
                    }
                }
            }
        };

        ProbeResult {
            endpoint: endpoint.clone(),
            status: ProbeStatus::Success,
            block_height,
            response_time: elapsed_ms(started),
            timestamp: Utc::now(),
            method,
            timeout: false,
            error: None,
            raw,
        }
    }

    /// Second hop of the finalized-head flow: fetch the block behind the
    /// finalized hash and extract its height. Runs under the same overall
    /// deadline as the first call.
    async fn finalized_head_height(
        &self,
        endpoint: &Endpoint,
        first: &Value,
    ) -> std::result::Result<(Option<u64>, Option<Value>), String> {
        let hash = first
            .get("result")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing finalized head hash in result".to_string())?;

        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "chain_getBlock",
            "params": [hash],
        });

        let second = self
            .call(&endpoint.url, body)
            .await
            .map_err(|message| format!("{message} on second call"))?;

        if let Some(message) = rpc_error_message(&second) {
            return Err(format!("Second call error: {message}"));
        }

        let result = second.get("result").unwrap_or(&Value::Null);
        let height =
            parse_header_number(result).map_err(|message| format!("Second call error: {message}"))?;

        let raw = serde_json::json!({
            "finalizedHash": hash,
            "blockDetails": result,
        });
        Ok((Some(height), Some(raw)))
    }

    /// One JSON-RPC POST. Transport failures, non-2xx responses and
    /// malformed JSON all come back as messages.
    async fn call(&self, url: &str, body: Value) -> std::result::Result<Value, String> {
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP error {}", status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| format!("invalid JSON response: {e}"))
    }
}

/// Error message from a JSON-RPC error envelope, preserved verbatim when
/// the envelope carries one.
fn rpc_error_message(envelope: &Value) -> Option<String> {
    let error = envelope.get("error")?;
    Some(
        error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
    )
}

/// Parse `result.block.header.number` as a base-16 block height
fn parse_header_number(result: &Value) -> std::result::Result<u64, String> {
    let number = result
        .pointer("/block/header/number")
        .ok_or_else(|| "missing block.header.number in result".to_string())?;

    match number {
        Value::String(raw) => parse_hex_u64(raw),
        other => Err(format!("unexpected block number shape: {other}")),
    }
}

/// Parse a hex block height, with or without the `0x` prefix
fn parse_hex_u64(raw: &str) -> std::result::Result<u64, String> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid hex block number {raw:?}: {e}"))
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn failure(endpoint: &Endpoint, method: ProbeMethod, error: String, started: Instant) -> ProbeResult {
    debug!(endpoint = %endpoint.url, method = %method, error = %error, "probe failed");
    ProbeResult {
        endpoint: endpoint.clone(),
        status: ProbeStatus::Error,
        block_height: None,
        response_time: elapsed_ms(started),
        timestamp: Utc::now(),
        method,
        timeout: false,
        error: Some(error),
        raw: None,
    }
}
