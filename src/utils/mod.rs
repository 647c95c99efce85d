//! Shared utilities
//!
//! Error types and small helpers used across the monitor.

pub mod error;
pub mod time;

pub use error::{MonitorError, Result};
pub use time::parse_time_range;
