//! Monitor query endpoints
//!
//! Latest snapshot, proxied Prometheus range queries and local
//! history/error/metrics lookups.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::debug;

use crate::monitor::types::ProbeMethod;
use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use crate::utils::error::MonitorError;
use crate::utils::time::parse_time_range;

/// Configure monitor query routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("", web::get().to(banner))
            .route("/status", web::get().to(latest_status))
            .route("/history", web::get().to(prometheus_history))
            .route("/local-history", web::get().to(local_history))
            .route("/errors", web::get().to(error_log))
            .route("/metrics-summary", web::get().to(metrics_summary)),
    );
}

/// Query parameters shared by the history-style endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    /// Endpoint URL to query
    pub endpoint: Option<String>,
    /// Prometheus metric name (proxy queries only)
    pub metric: Option<String>,
    /// Probe method wire name (local queries only)
    pub method: Option<String>,
    /// Time range such as `5m`, `1h`, `7d`
    pub time_range: Option<String>,
}

impl HistoryQuery {
    fn endpoint(&self) -> Result<&str, MonitorError> {
        self.endpoint
            .as_deref()
            .ok_or_else(|| MonitorError::BadRequest("endpoint parameter is required".to_string()))
    }

    fn method(&self, fallback: ProbeMethod) -> Result<ProbeMethod, MonitorError> {
        match self.method.as_deref() {
            None => Ok(fallback),
            Some(name) => ProbeMethod::from_rpc_name(name)
                .ok_or_else(|| MonitorError::BadRequest(format!("unknown method {name:?}"))),
        }
    }

    fn range(&self) -> std::time::Duration {
        parse_time_range(self.time_range.as_deref().unwrap_or("1h"))
    }
}

/// Service banner
async fn banner() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "RPC endpoint monitor",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/api/status",
            "/api/history",
            "/api/local-history",
            "/api/errors",
            "/api/metrics-summary",
            "/metrics",
            "/health",
            "/version",
        ],
    }))
}

/// Latest ranked snapshot, as a raw JSON array
async fn latest_status(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.monitor.latest())
}

/// Historical range query proxied to Prometheus.
///
/// Requires `endpoint`; `metric` defaults to `rpc_block_height` and
/// `timeRange` to `1h`. The Prometheus response body is passed through
/// unchanged.
async fn prometheus_history(
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, MonitorError> {
    let endpoint = query.endpoint()?;
    let metric = query.metric.as_deref().unwrap_or("rpc_block_height");
    let range = query.time_range.as_deref().unwrap_or("1h");

    let promql = format!("{metric}{{endpoint=\"{endpoint}\"}}[{range}]");
    let url = format!("{}/api/v1/query", state.config.prometheus_url());
    debug!(%promql, "proxying range query to Prometheus");

    let response = state
        .http
        .get(&url)
        .query(&[("query", promql.as_str())])
        .send()
        .await
        .map_err(|e| MonitorError::Upstream(format!("Prometheus request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MonitorError::Upstream(format!(
            "Prometheus returned HTTP {}",
            status.as_u16()
        )));
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| MonitorError::Upstream(format!("invalid Prometheus response: {e}")))?;
    Ok(HttpResponse::Ok().json(body))
}

/// Local latency series for one endpoint
async fn local_history(
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, MonitorError> {
    let endpoint = query.endpoint()?;
    let method = query.method(state.monitor.method())?;

    let series = state
        .history
        .history_series(method, endpoint, query.range())
        .await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(series)))
}

/// Local error log for one endpoint, newest first
async fn error_log(
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, MonitorError> {
    let endpoint = query.endpoint()?;
    let method = query.method(state.monitor.method())?;

    let log = state.history.error_log(method, endpoint, query.range()).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(log)))
}

/// Derived uptime/latency metrics per endpoint over a window
async fn metrics_summary(
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, MonitorError> {
    let method = query.method(state.monitor.method())?;
    let metrics = state.history.compute_metrics(method, query.range()).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(metrics)))
}
