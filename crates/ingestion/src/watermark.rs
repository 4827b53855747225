//! Latest stored timestamp per (station, dataset).

use chrono::{DateTime, Utc};
use storage::WeatherStore;
use tracing::{debug, warn};
use weather_common::{parse_utc, Dataset};

/// Reads watermarks from the store.
///
/// The watermark is never persisted on its own; it is the maximum
/// timestamp already stored, recomputed on every call.
#[derive(Clone)]
pub struct WatermarkTracker {
    store: WeatherStore,
}

impl WatermarkTracker {
    pub fn new(store: WeatherStore) -> Self {
        Self { store }
    }

    /// Latest stored timestamp, or `None` when nothing usable is stored.
    ///
    /// A failed read or an unparseable value is logged and reported as
    /// `None`, which sends the caller down the backfill path.
    pub async fn latest(&self, station_id: &str, dataset: Dataset) -> Option<DateTime<Utc>> {
        let raw = match self.store.latest_timestamp(station_id, dataset).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(
                    station = %station_id,
                    dataset = %dataset,
                    error = %e,
                    "Watermark read failed, falling back to backfill"
                );
                return None;
            }
        };

        match parse_utc(&raw) {
            Ok(ts) => {
                debug!(station = %station_id, dataset = %dataset, watermark = %ts, "Resolved watermark");
                Some(ts)
            }
            Err(e) => {
                warn!(
                    station = %station_id,
                    dataset = %dataset,
                    value = %raw,
                    error = %e,
                    "Stored watermark is not a timestamp, falling back to backfill"
                );
                None
            }
        }
    }
}
