//! Time-stamped weather records as delivered by the provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One measurement or prediction for a single timestamp.
///
/// Observations and forecasts carry the same fields; which one a record is
/// depends on the table it lands in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub timestamp: DateTime<Utc>,
    pub source_id: Option<i64>,
    pub precipitation: Option<f64>,
    pub pressure_msl: Option<f64>,
    pub sunshine: Option<f64>,
    pub temperature: Option<f64>,
    pub wind_direction: Option<f64>,
    pub wind_speed: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub dew_point: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub visibility: Option<f64>,
    pub wind_gust_direction: Option<f64>,
    pub wind_gust_speed: Option<f64>,
    pub condition: Option<String>,
    pub precipitation_probability: Option<f64>,
    pub precipitation_probability_6h: Option<f64>,
    pub solar: Option<f64>,
    pub icon: Option<String>,
    /// Provider fallback mapping, kept as JSON text
    pub fallback_source_ids: Option<String>,
}

impl WeatherRecord {
    /// A record with only the timestamp set.
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }
}

/// Drop records whose timestamp was already seen, keeping the first.
///
/// Input order is preserved.
pub fn dedup_by_timestamp(records: Vec<WeatherRecord>) -> Vec<WeatherRecord> {
    let mut seen = std::collections::HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| seen.insert(r.timestamp))
        .collect()
}
