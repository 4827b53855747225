//! The weather source seam used by the ingestion engines.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use weather_common::{Station, WeatherRecord, WeatherResult};

use crate::models::SourceDescriptor;

/// What a weather query is keyed on.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchTarget {
    /// WMO station id
    Station(String),
    /// Nearest data for a coordinate
    Coordinates { lat: f64, lon: f64 },
}

impl FetchTarget {
    /// Pick the query mode for a station.
    ///
    /// WMO id when present, coordinates otherwise. `None` when the station
    /// cannot be queried at all.
    pub fn for_station(station: &Station) -> Option<Self> {
        if let Some(id) = station.wmo_id() {
            return Some(FetchTarget::Station(id.to_string()));
        }
        station
            .coordinates()
            .map(|(lat, lon)| FetchTarget::Coordinates { lat, lon })
    }
}

impl std::fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchTarget::Station(id) => write!(f, "wmo:{}", id),
            FetchTarget::Coordinates { lat, lon } => write!(f, "{:.4},{:.4}", lat, lon),
        }
    }
}

/// Trait for remote services that can discover stations and return weather records.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// List stations within `max_distance_m` meters of a coordinate.
    async fn find_stations(
        &self,
        lat: f64,
        lon: f64,
        max_distance_m: u32,
    ) -> WeatherResult<Vec<SourceDescriptor>>;

    /// Fetch records for a target between `from` and `to`.
    ///
    /// The bounds are a request hint; callers filter the result themselves.
    async fn fetch_weather(
        &self,
        target: &FetchTarget,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> WeatherResult<Vec<WeatherRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_common::StationKind;

    fn station(wmo: Option<&str>, lat: f64) -> Station {
        Station {
            id: "4711".into(),
            wmo_station_id: wmo.map(String::from),
            dwd_station_id: None,
            name: "Potsdam".into(),
            lat,
            lon: 13.06,
            height: None,
            kind: StationKind::Forecast,
            first_record: None,
            last_record: None,
            distance: None,
        }
    }

    #[test]
    fn test_target_prefers_wmo_id() {
        assert_eq!(
            FetchTarget::for_station(&station(Some("10379"), 52.38)),
            Some(FetchTarget::Station("10379".into()))
        );
    }

    #[test]
    fn test_target_falls_back_to_coordinates() {
        assert_eq!(
            FetchTarget::for_station(&station(None, 52.38)),
            Some(FetchTarget::Coordinates { lat: 52.38, lon: 13.06 })
        );
        assert_eq!(FetchTarget::for_station(&station(None, f64::NAN)), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(FetchTarget::Station("10379".into()).to_string(), "wmo:10379");
        assert_eq!(
            FetchTarget::Coordinates { lat: 52.5, lon: 13.4 }.to_string(),
            "52.5000,13.4000"
        );
    }
}
