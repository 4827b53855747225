//! Wire types for BrightSky responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use weather_common::{parse_utc, WeatherRecord, WeatherResult};

/// A provider source (one station/observation-type combination).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub id: i64,
    #[serde(default)]
    pub dwd_station_id: Option<String>,
    #[serde(default)]
    pub wmo_station_id: Option<String>,
    #[serde(default)]
    pub station_name: Option<String>,
    /// "historical", "current", "synop" or "forecast"
    pub observation_type: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_utc")]
    pub first_record: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_opt_utc")]
    pub last_record: Option<DateTime<Utc>>,
    #[serde(default)]
    pub distance: Option<f64>,
}

impl SourceDescriptor {
    pub fn is_forecast(&self) -> bool {
        self.observation_type == "forecast"
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SourcesResponse {
    #[serde(default)]
    pub sources: Vec<SourceDescriptor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WeatherResponse {
    #[serde(default)]
    pub weather: Vec<RawWeatherRecord>,
}

/// A weather entry before timestamp normalization.
#[derive(Debug, Deserialize)]
pub(crate) struct RawWeatherRecord {
    pub timestamp: String,
    #[serde(default)]
    pub source_id: Option<i64>,
    #[serde(default)]
    pub precipitation: Option<f64>,
    #[serde(default)]
    pub pressure_msl: Option<f64>,
    #[serde(default)]
    pub sunshine: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub wind_direction: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub cloud_cover: Option<f64>,
    #[serde(default)]
    pub dew_point: Option<f64>,
    #[serde(default)]
    pub relative_humidity: Option<f64>,
    #[serde(default)]
    pub visibility: Option<f64>,
    #[serde(default)]
    pub wind_gust_direction: Option<f64>,
    #[serde(default)]
    pub wind_gust_speed: Option<f64>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub precipitation_probability: Option<f64>,
    #[serde(default)]
    pub precipitation_probability_6h: Option<f64>,
    #[serde(default)]
    pub solar: Option<f64>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub fallback_source_ids: Option<serde_json::Value>,
}

impl RawWeatherRecord {
    fn into_record(self) -> WeatherResult<WeatherRecord> {
        let timestamp = parse_utc(&self.timestamp)?;
        Ok(WeatherRecord {
            timestamp,
            source_id: self.source_id,
            precipitation: self.precipitation,
            pressure_msl: self.pressure_msl,
            sunshine: self.sunshine,
            temperature: self.temperature,
            wind_direction: self.wind_direction,
            wind_speed: self.wind_speed,
            cloud_cover: self.cloud_cover,
            dew_point: self.dew_point,
            relative_humidity: self.relative_humidity,
            visibility: self.visibility,
            wind_gust_direction: self.wind_gust_direction,
            wind_gust_speed: self.wind_gust_speed,
            condition: self.condition,
            precipitation_probability: self.precipitation_probability,
            precipitation_probability_6h: self.precipitation_probability_6h,
            solar: self.solar,
            icon: self.icon,
            fallback_source_ids: self
                .fallback_source_ids
                .filter(|v| !v.is_null())
                .map(|v| v.to_string()),
        })
    }
}

/// Decode a `/sources` body.
pub fn parse_sources_body(body: &str) -> WeatherResult<Vec<SourceDescriptor>> {
    let response: SourcesResponse = serde_json::from_str(body)?;
    Ok(response.sources)
}

/// Decode a `/weather` body.
///
/// Entries with an unparseable timestamp are dropped with a warning.
pub fn parse_weather_body(body: &str) -> WeatherResult<Vec<WeatherRecord>> {
    let response: WeatherResponse = serde_json::from_str(body)?;
    let records = response
        .weather
        .into_iter()
        .filter_map(|raw| {
            let ts = raw.timestamp.clone();
            match raw.into_record() {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(timestamp = %ts, error = %e, "Dropping weather entry");
                    None
                }
            }
        })
        .collect();
    Ok(records)
}

fn deserialize_opt_utc<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_utc(&s).map_err(serde::de::Error::custom))
        .transpose()
}
