//! Read access to the station table.

use storage::WeatherStore;
use weather_common::{Dataset, Station, StationKind};

use crate::error::{IngestionError, Result};

/// Stations partitioned by which engine serves them.
#[derive(Clone)]
pub struct StationRegistry {
    store: WeatherStore,
}

impl StationRegistry {
    pub fn new(store: WeatherStore) -> Self {
        Self { store }
    }

    /// Observation and dual-purpose stations.
    pub async fn observation_stations(&self) -> Result<Vec<Station>> {
        self.stations_for(Dataset::Observations).await
    }

    /// Forecast and dual-purpose stations.
    pub async fn forecast_stations(&self) -> Result<Vec<Station>> {
        self.stations_for(Dataset::Forecasts).await
    }

    pub async fn stations_for(&self, dataset: Dataset) -> Result<Vec<Station>> {
        self.store
            .stations_by_kind(StationKind::eligible_for(dataset))
            .await
            .map_err(IngestionError::Registry)
    }
}
