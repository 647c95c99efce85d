//! HTTP query surface
//!
//! Exposes the latest snapshot, local history/error/metrics queries, the
//! proxied Prometheus range query and the usual health/version/metrics
//! endpoints.

pub mod routes;
pub mod server;
pub mod state;

pub use server::HttpServer;
pub use state::AppState;
