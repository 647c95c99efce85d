//! Error handling for the monitor
//!
//! This module defines all error types used throughout the monitor.

use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Result type alias for the monitor
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Main error type for the monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metrics registry errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// History persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Bad request errors
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upstream time-series backend errors
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for MonitorError {
    fn error_response(&self) -> HttpResponse {
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });

        match self {
            MonitorError::BadRequest(_) => HttpResponse::BadRequest().json(body),
            MonitorError::Upstream(_) => HttpResponse::BadGateway().json(body),
            _ => HttpResponse::InternalServerError().json(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_bad_request_maps_to_400() {
        let err = MonitorError::BadRequest("endpoint parameter is required".to_string());
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_maps_to_502() {
        let err = MonitorError::Upstream("prometheus unreachable".to_string());
        assert_eq!(err.error_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_display_includes_context() {
        let err = MonitorError::Config("missing endpoints".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing endpoints");
    }
}
