//! Shared test utilities for the weather pipeline workspace.
//!
//! This crate provides:
//! - Station, record and provider-source fixtures
//! - [`ScriptedSource`], an in-memory `WeatherSource` with per-target replies
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{observation_station, Reply, ScriptedSource};
//! ```

pub mod fixtures;
pub mod scripted;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use scripted::{FetchCall, Reply, ScriptedSource};

/// Assert the timestamps of a record list, in order.
///
/// ```ignore
/// assert_timestamps!(records, [t0, t0 + Duration::hours(1)]);
/// ```
#[macro_export]
macro_rules! assert_timestamps {
    ($records:expr, [$($ts:expr),* $(,)?]) => {{
        let actual: Vec<_> = $records.iter().map(|r| r.timestamp).collect();
        let expected = vec![$($ts),*];
        assert_eq!(actual, expected, "record timestamps differ");
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_assert_timestamps_passes() {
        let records = hourly_records(fixed_now(), 2);
        assert_timestamps!(records, [fixed_now(), fixed_now() + Duration::hours(1)]);
    }

    #[test]
    #[should_panic(expected = "record timestamps differ")]
    fn test_assert_timestamps_fails() {
        let records = hourly_records(fixed_now(), 1);
        assert_timestamps!(records, [fixed_now() + Duration::hours(1)]);
    }
}
