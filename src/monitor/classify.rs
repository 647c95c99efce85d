//! Status classification
//!
//! Pure functions mapping a probe result and the cycle's maximum observed
//! height into a status category.

use crate::monitor::types::{ProbeResult, StatusCategory};

/// How many blocks an endpoint may lag before it is flagged as a warning
const MAX_BLOCK_LAG: u64 = 2;

/// Classify one probe result against the snapshot's maximum observed height.
///
/// `max_height` of zero (no successful height in the snapshot) never yields
/// a warning.
pub fn classify(result: &ProbeResult, max_height: u64) -> StatusCategory {
    if result.timeout {
        return StatusCategory::Timeout;
    }

    if !result.is_success() {
        return StatusCategory::Error;
    }

    let Some(height) = result.block_height else {
        return StatusCategory::Success;
    };

    if max_height > 0 && max_height.saturating_sub(height) > MAX_BLOCK_LAG {
        return StatusCategory::Warning;
    }

    StatusCategory::Success
}

/// Maximum height among the snapshot's successful results, or zero.
///
/// Recomputed per snapshot, never cached across cycles.
pub fn max_block_height(snapshot: &[ProbeResult]) -> u64 {
    snapshot
        .iter()
        .filter(|result| result.is_success())
        .filter_map(|result| result.block_height)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::types::{Endpoint, ProbeMethod, ProbeStatus};
    use chrono::Utc;

    fn result(
        status: ProbeStatus,
        block_height: Option<u64>,
        timeout: bool,
        response_time: f64,
    ) -> ProbeResult {
        ProbeResult {
            endpoint: Endpoint::new("https://rpc.example.com", "Example"),
            status,
            block_height,
            response_time,
            timestamp: Utc::now(),
            method: ProbeMethod::ChainGetBlock,
            timeout,
            error: None,
            raw: None,
        }
    }

    #[test]
    fn test_timeout_wins_over_everything() {
        let r = result(ProbeStatus::Error, Some(100), true, 5000.0);
        assert_eq!(classify(&r, 200), StatusCategory::Timeout);
    }

    #[test]
    fn test_error_status() {
        let r = result(ProbeStatus::Error, None, false, 12.0);
        assert_eq!(classify(&r, 100), StatusCategory::Error);
    }

    #[test]
    fn test_success_without_height() {
        let r = result(ProbeStatus::Success, None, false, 12.0);
        assert_eq!(classify(&r, 100), StatusCategory::Success);
    }

    #[test]
    fn test_lagging_endpoint_is_warning() {
        let r = result(ProbeStatus::Success, Some(97), false, 12.0);
        assert_eq!(classify(&r, 100), StatusCategory::Warning);
    }

    #[test]
    fn test_small_lag_is_success() {
        let r = result(ProbeStatus::Success, Some(98), false, 12.0);
        assert_eq!(classify(&r, 100), StatusCategory::Success);
    }

    #[test]
    fn test_zero_max_height_never_warns() {
        let r = result(ProbeStatus::Success, Some(1), false, 12.0);
        assert_eq!(classify(&r, 0), StatusCategory::Success);
    }

    #[test]
    fn test_classify_is_pure() {
        let r = result(ProbeStatus::Success, Some(90), false, 12.0);
        let first = classify(&r, 100);
        let second = classify(&r, 100);
        assert_eq!(first, second);
    }

    #[test]
    fn test_max_block_height_ignores_failures() {
        let snapshot = vec![
            result(ProbeStatus::Success, Some(100), false, 10.0),
            result(ProbeStatus::Error, Some(500), false, 10.0),
            result(ProbeStatus::Success, None, false, 10.0),
        ];
        assert_eq!(max_block_height(&snapshot), 100);
    }

    #[test]
    fn test_max_block_height_empty() {
        assert_eq!(max_block_height(&[]), 0);
        let snapshot = vec![result(ProbeStatus::Error, None, false, 10.0)];
        assert_eq!(max_block_height(&snapshot), 0);
    }
}
