//! Time handling for weather records.
//!
//! Everything in the pipeline works in UTC. Timestamps read back from the
//! store have no zone attached, so they are interpreted as UTC here.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// Format used for timestamp columns in the store.
///
/// Naive UTC, lexicographically sortable, so `MAX()` and range predicates
/// work on the text directly.
pub const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a timestamp and normalize it to UTC.
///
/// Accepts RFC 3339 with any offset. Values without an offset are taken to
/// already be UTC.
pub fn parse_utc(s: &str) -> Result<DateTime<Utc>, WeatherError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // "+00:00" offsets without the T separator, as written by some SQL engines
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(WeatherError::InvalidTime(s.to_string()))
}

/// Render a timestamp the way the store persists it.
pub fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(DB_TIMESTAMP_FORMAT).to_string()
}

/// A closed time window `[start, end]` used for remote fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `[now - days, now]`, or an error if the start is not representable.
    pub fn lookback(now: DateTime<Utc>, days: u32) -> Result<Self, WeatherError> {
        Duration::try_days(i64::from(days))
            .and_then(|span| now.checked_sub_signed(span))
            .map(|start| Self::new(start, now))
            .ok_or_else(|| WeatherError::InvalidTime(format!("{} minus {} days", now, days)))
    }

    /// `[now, now + days]`, or an error if the end is not representable.
    pub fn ahead(now: DateTime<Utc>, days: u32) -> Result<Self, WeatherError> {
        Duration::try_days(i64::from(days))
            .and_then(|span| now.checked_add_signed(span))
            .map(|end| Self::new(now, end))
            .ok_or_else(|| WeatherError::InvalidTime(format!("{} plus {} days", now, days)))
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}
