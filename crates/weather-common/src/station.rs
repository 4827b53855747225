//! Monitored weather stations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which datasets a station is polled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationKind {
    Observation,
    Forecast,
    Both,
}

impl StationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Observation => "observation",
            Self::Forecast => "forecast",
            Self::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "observation" => Some(Self::Observation),
            "forecast" => Some(Self::Forecast),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    /// Kinds eligible for the given dataset.
    pub fn eligible_for(dataset: Dataset) -> &'static [StationKind] {
        match dataset {
            Dataset::Observations => &[StationKind::Observation, StationKind::Both],
            Dataset::Forecasts => &[StationKind::Forecast, StationKind::Both],
        }
    }

    /// Combine two kinds seen for the same physical station.
    pub fn merge(self, other: StationKind) -> StationKind {
        if self == other {
            self
        } else {
            StationKind::Both
        }
    }
}

/// The two time series the pipeline maintains per station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Observations,
    Forecasts,
}

impl Dataset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Observations => "observations",
            Self::Forecasts => "forecasts",
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A station from the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Internal id (the provider's source id)
    pub id: String,
    /// WMO station id, used for per-station queries
    pub wmo_station_id: Option<String>,
    /// DWD station id, kept for reference
    pub dwd_station_id: Option<String>,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Elevation in meters
    pub height: Option<f64>,
    pub kind: StationKind,
    pub first_record: Option<DateTime<Utc>>,
    pub last_record: Option<DateTime<Utc>>,
    /// Distance from the discovery center in meters
    pub distance: Option<f64>,
}

impl Station {
    /// WMO id if it is present and not blank.
    pub fn wmo_id(&self) -> Option<&str> {
        self.wmo_station_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Coordinates if they can be used for a location query.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let valid = self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon);
        valid.then_some((self.lat, self.lon))
    }
}
