//! Shared per-station loop for both engines.

use std::future::Future;

use futures::stream::{self, StreamExt};
use metrics::counter;
use tokio_util::sync::CancellationToken;
use weather_common::{Dataset, Station};

use crate::outcome::{RunSummary, StationOutcome, StationReport};

/// Run `ingest` for every station and collect the outcomes.
///
/// At most `max_concurrent` stations are in flight. Cancellation is checked
/// before each station starts; stations never started are reported as
/// cancelled. Reports keep the input order.
pub(crate) async fn run_stations<F, Fut>(
    dataset: Dataset,
    stations: Vec<Station>,
    max_concurrent: usize,
    cancel: &CancellationToken,
    ingest: F,
) -> RunSummary
where
    F: Fn(Station) -> Fut,
    Fut: Future<Output = StationOutcome>,
{
    let ingest = &ingest;
    let mut reports: Vec<(usize, StationReport)> = stream::iter(stations.into_iter().enumerate())
        .map(|(index, station)| async move {
            let station_id = station.id.clone();
            let outcome = if cancel.is_cancelled() {
                StationOutcome::Cancelled
            } else {
                ingest(station).await
            };
            (index, StationReport { station_id, outcome })
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    reports.sort_by_key(|(index, _)| *index);

    let mut summary = RunSummary::new(dataset);
    for (_, report) in reports {
        record_metrics(dataset, &report.outcome);
        summary.stations.push(report);
    }
    summary
}

fn record_metrics(dataset: Dataset, outcome: &StationOutcome) {
    match outcome {
        StationOutcome::Succeeded(rows) => {
            counter!("ingestion_rows_total", "dataset" => dataset.as_str()).increment(*rows);
        }
        StationOutcome::Failed(_) => {
            counter!("ingestion_station_failures_total", "dataset" => dataset.as_str())
                .increment(1);
        }
        StationOutcome::Skipped(_) | StationOutcome::Cancelled => {}
    }
}
