//! Incremental observation ingestion.

use std::sync::Arc;

use brightsky::{FetchTarget, WeatherSource};
use chrono::{DateTime, Utc};
use storage::WeatherStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use weather_common::{
    dedup_by_timestamp, Dataset, Station, TimeWindow, WeatherError, WeatherRecord, WeatherResult,
};

use crate::config::IngestionConfig;
use crate::error::Result;
use crate::outcome::{RunSummary, StationOutcome};
use crate::registry::StationRegistry;
use crate::runner::run_stations;
use crate::watermark::WatermarkTracker;

/// Appends observations newer than each station's watermark.
pub struct ObservationEngine {
    source: Arc<dyn WeatherSource>,
    store: WeatherStore,
    registry: StationRegistry,
    watermarks: WatermarkTracker,
    config: IngestionConfig,
}

impl ObservationEngine {
    pub fn new(source: Arc<dyn WeatherSource>, store: WeatherStore, config: IngestionConfig) -> Self {
        Self {
            source,
            registry: StationRegistry::new(store.clone()),
            watermarks: WatermarkTracker::new(store.clone()),
            store,
            config,
        }
    }

    /// Ingest every observation-eligible station once.
    ///
    /// Only a registry read failure is an error; everything per station ends
    /// up in the summary.
    pub async fn run(&self, now: DateTime<Utc>, cancel: &CancellationToken) -> Result<RunSummary> {
        let stations = self.registry.observation_stations().await?;
        info!(stations = stations.len(), "Starting observation ingestion");

        let summary = run_stations(
            Dataset::Observations,
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
            "Observation ingestion finished"
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

        let watermark = self.watermarks.latest(&station.id, Dataset::Observations).await;
        let window = match observation_window(watermark, now, self.config.lookback_days) {
            Ok(window) => window,
            Err(e) => {
                error!(error = %e, "Cannot build observation window");
                return StationOutcome::Failed(e.to_string());
            }
        };
        debug!(
            target = %target,
            from = %window.start,
            to = %window.end,
            span_hours = window.duration().num_hours(),
            backfill = watermark.is_none(),
            "Fetching observations"
        );

        let records = match self.source.fetch_weather(&target, window.start, window.end).await {
            Ok(records) => records,
            Err(e) if e.is_malformed_response() => {
                warn!(error = %e, "Undecodable observation response, treating as empty");
                return StationOutcome::Succeeded(0);
            }
            Err(e) => {
                error!(error = %e, transient = e.is_transient(), "Observation fetch failed");
                return StationOutcome::Failed(e.to_string());
            }
        };

        let fetched = records.len();
        let fresh = select_new_observations(records, watermark, &window);
        if fresh.is_empty() {
            debug!(fetched, "No new observations");
            return StationOutcome::Succeeded(0);
        }

        match self
            .store
            .append_observations(station, &fresh, Utc::now())
            .await
        {
            Ok(inserted) => {
                info!(fetched, rows = inserted, "Stored observations");
                StationOutcome::Succeeded(inserted)
            }
            Err(e) => {
                error!(error = %e, "Observation insert failed");
                StationOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Request window: backfill `[now - lookback, now]` without a watermark,
/// `[watermark, now]` with one.
pub fn observation_window(
    watermark: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    lookback_days: u32,
) -> WeatherResult<TimeWindow> {
    match watermark {
        Some(w) => Ok(TimeWindow::new(w, now)),
        None => TimeWindow::lookback(now, lookback_days),
    }
}

/// Keep records strictly after the watermark (or at/after the backfill
/// start) and not after `window.end`, first occurrence per timestamp.
pub fn select_new_observations(
    records: Vec<WeatherRecord>,
    watermark: Option<DateTime<Utc>>,
    window: &TimeWindow,
) -> Vec<WeatherRecord> {
    let kept = records
        .into_iter()
        .filter(|r| match watermark {
            Some(w) => r.timestamp > w && r.timestamp <= window.end,
            None => window.contains(&r.timestamp),
        })
        .collect();
    dedup_by_timestamp(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use test_utils::record_at;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_backfill_window() {
        let window = observation_window(None, now(), 30).unwrap();
        assert_eq!(window.start, now() - Duration::days(30));
        assert_eq!(window.end, now());
    }

    #[test]
    fn test_unrepresentable_backfill_is_an_error() {
        assert!(observation_window(None, now(), u32::MAX).is_err());
        // an existing watermark never needs the lookback
        assert!(observation_window(Some(now()), now(), u32::MAX).is_ok());
    }

    #[test]
    fn test_incremental_window_starts_at_watermark() {
        let w = now() - Duration::hours(6);
        assert_eq!(
            observation_window(Some(w), now(), 30).unwrap(),
            TimeWindow::new(w, now())
        );
    }

    #[test]
    fn test_watermark_is_exclusive() {
        let w = now() - Duration::hours(2);
        let window = observation_window(Some(w), now(), 30).unwrap();
        let records = vec![
            record_at(w - Duration::hours(1)),
            record_at(w),
            record_at(w + Duration::hours(1)),
            record_at(now()),
            record_at(now() + Duration::hours(1)),
        ];

        let kept: Vec<_> = select_new_observations(records, Some(w), &window)
            .into_iter()
            .map(|r| r.timestamp)
            .collect();
        assert_eq!(kept, vec![w + Duration::hours(1), now()]);
    }

    #[test]
    fn test_backfill_start_is_inclusive() {
        let window = observation_window(None, now(), 1).unwrap();
        let records = vec![
            record_at(window.start - Duration::seconds(1)),
            record_at(window.start),
        ];
        let kept = select_new_observations(records, None, &window);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].timestamp, window.start);
    }

    #[test]
    fn test_duplicates_in_response_collapse() {
        let window = observation_window(None, now(), 1).unwrap();
        let ts = now() - Duration::hours(1);
        let mut first = record_at(ts);
        first.temperature = Some(1.0);
        let mut second = record_at(ts);
        second.temperature = Some(2.0);

        let kept = select_new_observations(vec![first, second], None, &window);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].temperature, Some(1.0));
    }
}
