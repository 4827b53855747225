//! Station discovery: provider sources into the station table.

use std::collections::BTreeMap;
use std::sync::Arc;

use brightsky::{SourceDescriptor, WeatherSource};
use storage::WeatherStore;
use tracing::{info, instrument, warn};
use weather_common::{Station, StationKind};

use crate::config::IngestionConfig;
use crate::error::{IngestionError, Result};

/// Refreshes the station table from the remote source.
pub struct StationDiscovery {
    source: Arc<dyn WeatherSource>,
    store: WeatherStore,
    config: IngestionConfig,
}

impl StationDiscovery {
    pub fn new(source: Arc<dyn WeatherSource>, store: WeatherStore, config: IngestionConfig) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// Replace the station table with what the source reports around the
    /// configured center. Returns the number of stations stored.
    ///
    /// An empty answer leaves the existing table untouched.
    #[instrument(skip(self), fields(
        lat = self.config.center_lat,
        lon = self.config.center_lon,
        radius_m = self.config.max_distance_m
    ))]
    pub async fn run(&self) -> Result<usize> {
        let sources = self
            .source
            .find_stations(
                self.config.center_lat,
                self.config.center_lon,
                self.config.max_distance_m,
            )
            .await
            .map_err(IngestionError::Discovery)?;

        info!(sources = sources.len(), "Fetched provider sources");

        if sources.is_empty() {
            warn!("No stations found, keeping existing station table");
            return Ok(0);
        }

        let stations = group_sources(sources);
        self.store
            .replace_stations(&stations)
            .await
            .map_err(IngestionError::StationStore)?;

        info!(stations = stations.len(), "Station table refreshed");
        Ok(stations.len())
    }
}

/// Fold provider sources into stations.
///
/// Sources sharing a WMO id are one station, identified by the smallest
/// source id; sources without a WMO id stand alone. Output is ordered by
/// station id.
pub fn group_sources(sources: Vec<SourceDescriptor>) -> Vec<Station> {
    let mut by_wmo: BTreeMap<String, Vec<SourceDescriptor>> = BTreeMap::new();
    let mut stations = Vec::new();

    for source in sources {
        let wmo = source
            .wmo_station_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from);
        match wmo {
            Some(id) => by_wmo.entry(id).or_default().push(source),
            None => stations.push(merge_group(vec![source])),
        }
    }

    stations.extend(by_wmo.into_values().map(merge_group));
    stations.sort_by(|a, b| a.id.cmp(&b.id));
    stations
}

fn merge_group(mut group: Vec<SourceDescriptor>) -> Station {
    group.sort_by_key(|s| s.id);
    let primary = &group[0];

    let kind = group
        .iter()
        .map(source_kind)
        .reduce(StationKind::merge)
        .unwrap_or(StationKind::Observation);

    let wmo_station_id = primary
        .wmo_station_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from);
    let name = group
        .iter()
        .find_map(|s| s.station_name.clone())
        .or_else(|| wmo_station_id.clone())
        .unwrap_or_else(|| format!("source {}", primary.id));

    Station {
        id: primary.id.to_string(),
        dwd_station_id: group.iter().find_map(|s| s.dwd_station_id.clone()),
        wmo_station_id,
        name,
        lat: primary.lat,
        lon: primary.lon,
        height: group.iter().find_map(|s| s.height),
        kind,
        first_record: group.iter().filter_map(|s| s.first_record).min(),
        last_record: group.iter().filter_map(|s| s.last_record).max(),
        distance: group
            .iter()
            .filter_map(|s| s.distance)
            .reduce(f64::min),
    }
}

fn source_kind(source: &SourceDescriptor) -> StationKind {
    if source.is_forecast() {
        StationKind::Forecast
    } else {
        StationKind::Observation
    }
}
