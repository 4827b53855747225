//! Common test fixtures for weather pipeline tests.

use brightsky::SourceDescriptor;
use chrono::{DateTime, Duration, TimeZone, Utc};
use weather_common::{Station, StationKind, WeatherRecord};

/// A fixed reference instant, so tests do not depend on the wall clock.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
}

/// Station near Berlin queried by WMO id.
pub fn station(id: &str, wmo: Option<&str>, kind: StationKind) -> Station {
    Station {
        id: id.to_string(),
        wmo_station_id: wmo.map(String::from),
        dwd_station_id: None,
        name: format!("Station {}", id),
        lat: 52.52,
        lon: 13.40,
        height: Some(34.0),
        kind,
        first_record: None,
        last_record: None,
        distance: Some(0.0),
    }
}

pub fn observation_station(id: &str, wmo: &str) -> Station {
    station(id, Some(wmo), StationKind::Observation)
}

pub fn forecast_station(id: &str, wmo: &str) -> Station {
    station(id, Some(wmo), StationKind::Forecast)
}

pub fn dual_station(id: &str, wmo: &str) -> Station {
    station(id, Some(wmo), StationKind::Both)
}

/// Station without WMO id, queried by coordinates.
pub fn located_station(id: &str, lat: f64, lon: f64, kind: StationKind) -> Station {
    Station {
        lat,
        lon,
        ..station(id, None, kind)
    }
}

/// Station that cannot be queried at all.
///
/// Coordinates are out of range rather than NaN, which SQLite would store as NULL.
pub fn unlocatable_station(id: &str, kind: StationKind) -> Station {
    located_station(id, 95.0, 200.0, kind)
}

/// Record with only a timestamp set.
pub fn record_at(timestamp: DateTime<Utc>) -> WeatherRecord {
    WeatherRecord::at(timestamp)
}

/// Record with a temperature, the field tests usually compare on.
pub fn record_with_temperature(timestamp: DateTime<Utc>, temperature: f64) -> WeatherRecord {
    WeatherRecord {
        temperature: Some(temperature),
        ..WeatherRecord::at(timestamp)
    }
}

/// `count` hourly records starting at `start`, temperatures 0, 1, 2, ...
pub fn hourly_records(start: DateTime<Utc>, count: usize) -> Vec<WeatherRecord> {
    (0..count)
        .map(|i| record_with_temperature(start + Duration::hours(i as i64), i as f64))
        .collect()
}

/// Provider source as returned by station search.
pub fn source_descriptor(id: i64, wmo: Option<&str>, observation_type: &str) -> SourceDescriptor {
    SourceDescriptor {
        id,
        dwd_station_id: None,
        wmo_station_id: wmo.map(String::from),
        station_name: Some(format!("Station {}", id)),
        observation_type: observation_type.to_string(),
        lat: 52.47,
        lon: 13.40,
        height: Some(48.0),
        first_record: None,
        last_record: None,
        distance: Some(1000.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hourly_records() {
        let records = hourly_records(fixed_now(), 3);
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].timestamp, fixed_now() + Duration::hours(2));
        assert_eq!(records[2].temperature, Some(2.0));
    }

    #[test]
    fn test_unlocatable_station_has_no_coordinates() {
        assert_eq!(unlocatable_station("1", StationKind::Both).coordinates(), None);
    }
}
