//! Poll cycle coordination
//!
//! Drives the probe executor concurrently across all registered endpoints,
//! ranks the results, publishes the latest snapshot and notifies observers.

use crate::monitor::probe::Prober;
use crate::monitor::types::{Endpoint, ProbeMethod, ProbeResult, Snapshot};
use futures::future::join_all;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Observer invoked with each complete, ordered snapshot.
///
/// Observers run sequentially after a cycle fully resolves and before the
/// next cycle can begin, so each one always sees a fully-formed snapshot.
#[async_trait::async_trait]
pub trait SnapshotObserver: Send + Sync {
    /// Called once per cycle with the ranked snapshot
    async fn on_snapshot(&self, snapshot: &[ProbeResult]);
}

/// The poll cycle coordinator.
///
/// Cheap to clone; all state is shared. At most one polling loop and one
/// cycle are in flight at any time: `start` stops any prior loop first and
/// the loop awaits each cycle before sleeping for the next tick.
#[derive(Clone)]
pub struct RpcMonitor {
    prober: Arc<Prober>,
    timeout: Duration,
    inner: Arc<MonitorState>,
}

struct MonitorState {
    endpoints: RwLock<Vec<Endpoint>>,
    method: RwLock<ProbeMethod>,
    interval: RwLock<Duration>,
    latest: RwLock<Snapshot>,
    observers: RwLock<Vec<Arc<dyn SnapshotObserver>>>,
    loop_task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl RpcMonitor {
    /// Create a monitor over a fixed starting set of endpoints
    pub fn new(
        prober: Prober,
        endpoints: Vec<Endpoint>,
        timeout: Duration,
        method: ProbeMethod,
    ) -> Self {
        Self {
            prober: Arc::new(prober),
            timeout,
            inner: Arc::new(MonitorState {
                endpoints: RwLock::new(endpoints),
                method: RwLock::new(method),
                interval: RwLock::new(Duration::from_secs(10)),
                latest: RwLock::new(Vec::new()),
                observers: RwLock::new(Vec::new()),
                loop_task: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Register an endpoint. The registry is append-only during a run.
    pub fn add_endpoint(&self, url: impl Into<String>, name: impl Into<String>) {
        let endpoint = Endpoint::new(url, name);
        self.inner.endpoints.write().push(endpoint);
    }

    /// Registered endpoints
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.inner.endpoints.read().clone()
    }

    /// Register a snapshot observer
    pub fn add_observer(&self, observer: Arc<dyn SnapshotObserver>) {
        self.inner.observers.write().push(observer);
    }

    /// The currently active probe method
    pub fn method(&self) -> ProbeMethod {
        *self.inner.method.read()
    }

    /// The most recently published snapshot
    pub fn latest(&self) -> Snapshot {
        self.inner.latest.read().clone()
    }

    /// Run one poll cycle with the given method (or the current one).
    ///
    /// Probes all endpoints concurrently, ranks the results, publishes them
    /// as the latest snapshot and notifies observers in order.
    pub async fn check_all(&self, method: Option<ProbeMethod>) -> Snapshot {
        let method = method.unwrap_or_else(|| self.method());
        let endpoints = self.endpoints();
        debug!(method = %method, endpoints = endpoints.len(), "running poll cycle");

        let probes = endpoints
            .iter()
            .map(|endpoint| self.prober.probe(endpoint, self.timeout, method));
        let mut results = join_all(probes).await;

        results.sort_by(rank_order);

        *self.inner.latest.write() = results.clone();

        let observers: Vec<_> = self.inner.observers.read().clone();
        for observer in observers {
            observer.on_snapshot(&results).await;
        }

        results
    }

    /// Start the polling loop: one cycle immediately, then one per interval.
    ///
    /// Any previously running loop is stopped first, so loops never overlap.
    pub async fn start(&self, interval: Duration, method: ProbeMethod) {
        self.stop().await;

        *self.inner.method.write() = method;
        *self.inner.interval.write() = interval;
        info!(interval_ms = interval.as_millis() as u64, method = %method, "starting polling loop");

        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                monitor.check_all(None).await;
            }
        });

        *self.inner.loop_task.lock().await = Some(handle);
    }

    /// Stop the polling loop, if running
    pub async fn stop(&self) {
        if let Some(handle) = self.inner.loop_task.lock().await.take() {
            handle.abort();
            debug!("polling loop stopped");
        }
    }

    /// Switch the active probe method.
    ///
    /// If the loop is running it is restarted with the new method at the
    /// current interval. Historical data is never cleared by a switch.
    pub async fn set_method(&self, method: ProbeMethod) {
        if self.method() == method {
            return;
        }

        let running = self.inner.loop_task.lock().await.is_some();
        if running {
            let interval = *self.inner.interval.read();
            self.start(interval, method).await;
        } else {
            *self.inner.method.write() = method;
        }
        info!(method = %method, "probe method changed");
    }
}

/// Ranking total order for snapshot results.
///
/// Results with a defined height sort before results without one; among
/// defined heights, higher first; ties break by ascending response time.
/// `f64::total_cmp` keeps the comparator total even for pathological
/// response times.
pub fn rank_order(a: &ProbeResult, b: &ProbeResult) -> Ordering {
    match (a.block_height, b.block_height) {
        (Some(ha), Some(hb)) if ha != hb => hb.cmp(&ha),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => a.response_time.total_cmp(&b.response_time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::types::ProbeStatus;
    use chrono::Utc;

    fn result(name: &str, block_height: Option<u64>, response_time: f64) -> ProbeResult {
        ProbeResult {
            endpoint: Endpoint::new(format!("https://{name}.example.com"), name),
            status: ProbeStatus::Success,
            block_height,
            response_time,
            timestamp: Utc::now(),
            method: ProbeMethod::ChainGetBlock,
            timeout: false,
            error: None,
            raw: None,
        }
    }

    #[test]
    fn test_ranking_scenario() {
        // A(height=100, rt=50), B(height=100, rt=10), C(height=none, rt=5)
        // must order as [B, A, C]
        let mut snapshot = vec![
            result("a", Some(100), 50.0),
            result("b", Some(100), 10.0),
            result("c", None, 5.0),
        ];
        snapshot.sort_by(rank_order);

        let names: Vec<_> = snapshot.iter().map(|r| r.endpoint.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_higher_height_wins_regardless_of_latency() {
        let mut snapshot = vec![result("slow", Some(200), 900.0), result("fast", Some(100), 1.0)];
        snapshot.sort_by(rank_order);
        assert_eq!(snapshot[0].endpoint.name, "slow");
    }

    #[test]
    fn test_undefined_heights_order_by_response_time() {
        let mut snapshot = vec![result("x", None, 30.0), result("y", None, 10.0)];
        snapshot.sort_by(rank_order);
        assert_eq!(snapshot[0].endpoint.name, "y");
    }

    #[test]
    fn test_rank_order_is_total() {
        let a = result("a", Some(100), 10.0);
        let b = result("b", Some(100), 10.0);
        assert_eq!(rank_order(&a, &b), Ordering::Equal);
        assert_eq!(rank_order(&a, &b), rank_order(&b, &a));

        let c = result("c", None, f64::NAN);
        let d = result("d", None, 5.0);
        // total_cmp keeps NaN comparable and consistent
        assert_eq!(rank_order(&c, &d), rank_order(&c, &d));
    }

    #[tokio::test]
    async fn test_registry_is_append_only() {
        let monitor = RpcMonitor::new(
            Prober::new().unwrap(),
            vec![Endpoint::new("https://one.example.com", "one")],
            Duration::from_millis(100),
            ProbeMethod::ChainGetBlock,
        );

        monitor.add_endpoint("https://two.example.com", "");
        let endpoints = monitor.endpoints();
        assert_eq!(endpoints.len(), 2);
        // empty display name falls back to the url
        assert_eq!(endpoints[1].name, "https://two.example.com");
    }

    #[tokio::test]
    async fn test_set_method_without_loop_just_updates() {
        let monitor = RpcMonitor::new(
            Prober::new().unwrap(),
            vec![],
            Duration::from_millis(100),
            ProbeMethod::ChainGetBlock,
        );

        monitor.set_method(ProbeMethod::EthBlockNumber).await;
        assert_eq!(monitor.method(), ProbeMethod::EthBlockNumber);
    }
}
