//! Prometheus gauge export
//!
//! Mirrors every snapshot into three gauge families labeled by endpoint URL
//! and display name.

use crate::monitor::coordinator::SnapshotObserver;
use crate::monitor::types::ProbeResult;
use crate::utils::error::Result;
use prometheus::{GaugeVec, IntGaugeVec, Opts, Registry};

const LABELS: [&str; 2] = ["endpoint", "name"];

/// Snapshot observer that keeps the gauge families current.
///
/// Heights are only written for results that carry one; a stale height
/// gauge keeps its last value rather than dropping to zero.
pub struct MetricsExporter {
    block_height: IntGaugeVec,
    response_time: GaugeVec,
    status: IntGaugeVec,
}

impl MetricsExporter {
    /// Create the exporter and register its gauges on `registry`
    pub fn new(registry: &Registry) -> Result<Self> {
        let block_height = IntGaugeVec::new(
            Opts::new("rpc_block_height", "Latest block height per RPC endpoint"),
            &LABELS,
        )?;
        let response_time = GaugeVec::new(
            Opts::new(
                "rpc_response_time_ms",
                "Latest probe response time per RPC endpoint in milliseconds",
            ),
            &LABELS,
        )?;
        let status = IntGaugeVec::new(
            Opts::new(
                "rpc_status",
                "Whether the latest probe of an RPC endpoint succeeded (1) or failed (0)",
            ),
            &LABELS,
        )?;

        registry.register(Box::new(block_height.clone()))?;
        registry.register(Box::new(response_time.clone()))?;
        registry.register(Box::new(status.clone()))?;

        Ok(Self {
            block_height,
            response_time,
            status,
        })
    }

    /// Write one snapshot into the gauges
    pub fn record(&self, snapshot: &[ProbeResult]) {
        for result in snapshot {
            let labels = [result.endpoint.url.as_str(), result.endpoint.name.as_str()];

            self.response_time
                .with_label_values(&labels)
                .set(result.response_time);
            self.status
                .with_label_values(&labels)
                .set(i64::from(result.is_success()));
            if let Some(height) = result.block_height {
                self.block_height
                    .with_label_values(&labels)
                    .set(height as i64);
            }
        }
    }
}

#[async_trait::async_trait]
impl SnapshotObserver for MetricsExporter {
    async fn on_snapshot(&self, snapshot: &[ProbeResult]) {
        self.record(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::types::{Endpoint, ProbeMethod, ProbeStatus};
    use chrono::Utc;

    fn result(name: &str, block_height: Option<u64>, success: bool) -> ProbeResult {
        ProbeResult {
            endpoint: Endpoint::new(format!("https://{name}.example.com"), name),
            status: if success {
                ProbeStatus::Success
            } else {
                ProbeStatus::Error
            },
            block_height,
            response_time: 42.0,
            timestamp: Utc::now(),
            method: ProbeMethod::ChainGetBlock,
            timeout: false,
            error: (!success).then(|| "HTTP error 500".to_string()),
            raw: None,
        }
    }

    fn gauge_value(registry: &Registry, family: &str, endpoint: &str) -> Option<f64> {
        registry
            .gather()
            .iter()
            .find(|mf| mf.get_name() == family)?
            .get_metric()
            .iter()
            .find(|m| {
                m.get_label()
                    .iter()
                    .any(|l| l.get_name() == "endpoint" && l.get_value() == endpoint)
            })
            .map(|m| m.get_gauge().value())
    }

    #[test]
    fn test_snapshot_is_mirrored_into_gauges() {
        let registry = Registry::new();
        let exporter = MetricsExporter::new(&registry).unwrap();

        exporter.record(&[result("a", Some(100), true), result("b", None, false)]);

        assert_eq!(
            gauge_value(&registry, "rpc_block_height", "https://a.example.com"),
            Some(100.0)
        );
        assert_eq!(
            gauge_value(&registry, "rpc_status", "https://a.example.com"),
            Some(1.0)
        );
        assert_eq!(
            gauge_value(&registry, "rpc_status", "https://b.example.com"),
            Some(0.0)
        );
        assert_eq!(
            gauge_value(&registry, "rpc_response_time_ms", "https://b.example.com"),
            Some(42.0)
        );
        // no height observed, no height series for b
        assert_eq!(
            gauge_value(&registry, "rpc_block_height", "https://b.example.com"),
            None
        );
    }

    #[test]
    fn test_height_gauge_keeps_last_value_on_failure() {
        let registry = Registry::new();
        let exporter = MetricsExporter::new(&registry).unwrap();

        exporter.record(&[result("a", Some(100), true)]);
        exporter.record(&[result("a", None, false)]);

        assert_eq!(
            gauge_value(&registry, "rpc_block_height", "https://a.example.com"),
            Some(100.0)
        );
        assert_eq!(
            gauge_value(&registry, "rpc_status", "https://a.example.com"),
            Some(0.0)
        );
    }
}
