//! Forecast ingestion with per-station replacement.

use std::sync::Arc;

use brightsky::{FetchTarget, WeatherSource};
use chrono::{DateTime, Utc};
use storage::WeatherStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use weather_common::{
    dedup_by_timestamp, Dataset, Station, TimeWindow, WeatherError, WeatherRecord,
};

use crate::config::IngestionConfig;
use crate::error::Result;
use crate::outcome::{RunSummary, StationOutcome};
use crate::registry::StationRegistry;
use crate::runner::run_stations;

/// Replaces each station's future forecasts with the latest prediction.
pub struct ForecastEngine {
    source: Arc<dyn WeatherSource>,
    store: WeatherStore,
    registry: StationRegistry,
    config: IngestionConfig,
}

impl ForecastEngine {
    pub fn new(source: Arc<dyn WeatherSource>, store: WeatherStore, config: IngestionConfig) -> Self {
        Self {
            source,
            registry: StationRegistry::new(store.clone()),
            store,
            config,
        }
    }

    /// Refresh forecasts for every forecast-eligible station once.
    pub async fn run(&self, now: DateTime<Utc>, cancel: &CancellationToken) -> Result<RunSummary> {
        let stations = self.registry.forecast_stations().await?;
        info!(stations = stations.len(), "Starting forecast ingestion");

        let summary = run_stations(
            Dataset::Forecasts,
            stations,
            self.config.max_concurrent_stations,
            cancel,
            |station| async move { self.ingest_station(&station, now).await },
        )
        .await;

        info!(
            rows = summary.total_rows(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            cancelled = summary.cancelled(),
            "Forecast ingestion finished"
        );
        Ok(summary)
    }

    #[instrument(skip(self, station), fields(station = %station.id))]
    async fn ingest_station(&self, station: &Station, now: DateTime<Utc>) -> StationOutcome {
        let Some(target) = FetchTarget::for_station(station) else {
            let reason = WeatherError::MissingLocation(station.id.clone());
            warn!(reason = %reason, "Skipping station");
            return StationOutcome::Skipped(reason.to_string());
        };

        let window = match TimeWindow::ahead(now, self.config.forecast_horizon_days) {
            Ok(window) => window,
            Err(e) => {
                error!(error = %e, "Cannot build forecast window");
                return StationOutcome::Failed(e.to_string());
            }
        };
        debug!(
            target = %target,
            from = %window.start,
            to = %window.end,
            span_hours = window.duration().num_hours(),
            "Fetching forecasts"
        );

        let records = match self.source.fetch_weather(&target, window.start, window.end).await {
            Ok(records) => records,
            Err(e) if e.is_malformed_response() => {
                warn!(error = %e, "Undecodable forecast response, keeping stored forecasts");
                return StationOutcome::Succeeded(0);
            }
            Err(e) => {
                error!(error = %e, transient = e.is_transient(), "Forecast fetch failed");
                return StationOutcome::Failed(e.to_string());
            }
        };

        let fetched = records.len();
        let upcoming = select_upcoming(records, now);
        if upcoming.is_empty() {
            // an empty answer must not wipe what we have
            debug!(fetched, "No upcoming forecasts, keeping stored forecasts");
            return StationOutcome::Succeeded(0);
        }

        match self
            .store
            .replace_forecasts(station, now, &upcoming, Utc::now())
            .await
        {
            Ok(written) => {
                info!(fetched, rows = written, "Replaced forecasts");
                StationOutcome::Succeeded(written)
            }
            Err(e) => {
                error!(error = %e, "Forecast replace failed");
                StationOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Keep records strictly after `now`, first occurrence per timestamp.
pub fn select_upcoming(records: Vec<WeatherRecord>, now: DateTime<Utc>) -> Vec<WeatherRecord> {
    let kept = records.into_iter().filter(|r| r.timestamp > now).collect();
    dedup_by_timestamp(kept)
}
