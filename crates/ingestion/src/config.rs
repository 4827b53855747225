//! Ingestion settings.

use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, Result};

/// Longest lookback or forecast horizon accepted, in days.
pub const MAX_WINDOW_DAYS: u32 = 36_500;

/// Values the engines and station discovery are constructed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Days of history fetched for a station with no stored observations
    pub lookback_days: u32,
    /// Days of forecast requested ahead of now
    pub forecast_horizon_days: u32,
    /// Discovery reference point
    pub center_lat: f64,
    pub center_lon: f64,
    /// Discovery radius in meters
    pub max_distance_m: u32,
    /// Stations processed at once within one engine
    pub max_concurrent_stations: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            forecast_horizon_days: 10,
            center_lat: 52.52,
            center_lon: 13.40,
            max_distance_m: 50_000,
            max_concurrent_stations: 1,
        }
    }
}

impl IngestionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lookback_days == 0 {
            return Err(IngestionError::InvalidConfig(
                "lookback_days must be at least 1".into(),
            ));
        }
        if self.forecast_horizon_days == 0 {
            return Err(IngestionError::InvalidConfig(
                "forecast_horizon_days must be at least 1".into(),
            ));
        }
        if self.lookback_days > MAX_WINDOW_DAYS || self.forecast_horizon_days > MAX_WINDOW_DAYS {
            return Err(IngestionError::InvalidConfig(format!(
                "lookback_days and forecast_horizon_days must not exceed {}",
                MAX_WINDOW_DAYS
            )));
        }
        if !(-90.0..=90.0).contains(&self.center_lat) || !(-180.0..=180.0).contains(&self.center_lon)
        {
            return Err(IngestionError::InvalidConfig(format!(
                "center {},{} is not a valid coordinate",
                self.center_lat, self.center_lon
            )));
        }
        if self.max_distance_m == 0 {
            return Err(IngestionError::InvalidConfig(
                "max_distance_m must be positive".into(),
            ));
        }
        if self.max_concurrent_stations == 0 {
            return Err(IngestionError::InvalidConfig(
                "max_concurrent_stations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
