//! Time range parsing helpers

use std::time::Duration;

/// Default window when a range string cannot be parsed: one hour.
const DEFAULT_RANGE: Duration = Duration::from_secs(3600);

/// Parse a compact time range string ("30m", "1h", "7d") into a duration.
///
/// Unrecognized suffixes and unparseable values fall back to one hour.
pub fn parse_time_range(range: &str) -> Duration {
    let digits: String = range.chars().take_while(|c| c.is_ascii_digit()).collect();
    let Ok(value) = digits.parse::<u64>() else {
        return DEFAULT_RANGE;
    };

    match range.chars().last() {
        Some('m') => Duration::from_secs(value * 60),
        Some('h') => Duration::from_secs(value * 60 * 60),
        Some('d') => Duration::from_secs(value * 24 * 60 * 60),
        _ => DEFAULT_RANGE,
    }
}
