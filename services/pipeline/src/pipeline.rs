//! Stage ordering for one pipeline run.

use std::sync::Arc;

use anyhow::{Context, Result};
use brightsky::WeatherSource;
use chrono::{DateTime, Utc};
use ingestion::{
    ForecastEngine, IngestionConfig, IngestionError, ObservationEngine, RunSummary,
    StationDiscovery,
};
use serde::Serialize;
use storage::WeatherStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::transform::{run_transform, TransformConfig};

/// What happened to the transform stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TransformStatus {
    Completed,
    NotConfigured,
    /// Gating was requested and an engine did not complete.
    Gated,
    Cancelled,
    Failed(String),
}

/// Result of one run.
#[derive(Debug)]
pub struct PipelineReport {
    pub stations_discovered: usize,
    pub observations: std::result::Result<RunSummary, IngestionError>,
    pub forecasts: std::result::Result<RunSummary, IngestionError>,
    pub transform: TransformStatus,
}

impl PipelineReport {
    /// Both engines completed and the transform did not fail.
    ///
    /// Per-station failures do not count; they are retried next run.
    pub fn is_success(&self) -> bool {
        self.observations.is_ok()
            && self.forecasts.is_ok()
            && !matches!(self.transform, TransformStatus::Failed(_))
    }
}

/// init, discovery, observations with forecasts, transform.
pub struct Pipeline {
    source: Arc<dyn WeatherSource>,
    store: WeatherStore,
    config: IngestionConfig,
    transform: Option<TransformConfig>,
    gate_transform: bool,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn WeatherSource>,
        store: WeatherStore,
        config: IngestionConfig,
        transform: Option<TransformConfig>,
    ) -> Self {
        Self {
            source,
            store,
            config,
            transform,
            gate_transform: false,
        }
    }

    /// Only run the transform when both engines completed.
    pub fn with_gated_transform(mut self, gate: bool) -> Self {
        self.gate_transform = gate;
        self
    }

    /// Run every stage once.
    ///
    /// Errors only when schema init or station discovery fails; later
    /// stages report through [`PipelineReport`].
    pub async fn run(&self, now: DateTime<Utc>, cancel: &CancellationToken) -> Result<PipelineReport> {
        info!("Initializing database");
        self.store
            .migrate()
            .await
            .context("Database initialization failed")?;

        let discovery =
            StationDiscovery::new(self.source.clone(), self.store.clone(), self.config.clone());
        let stations_discovered = discovery.run().await.context("Station discovery failed")?;

        let observations =
            ObservationEngine::new(self.source.clone(), self.store.clone(), self.config.clone());
        let forecasts =
            ForecastEngine::new(self.source.clone(), self.store.clone(), self.config.clone());

        let (observations, forecasts) =
            tokio::join!(observations.run(now, cancel), forecasts.run(now, cancel));

        for (name, result) in [("observations", &observations), ("forecasts", &forecasts)] {
            match result {
                Ok(summary) => info!(engine = name, summary = %summary, "Engine finished"),
                Err(e) => error!(engine = name, error = %e, "Engine failed"),
            }
        }

        let transform = self
            .transform_stage(observations.is_ok() && forecasts.is_ok(), cancel)
            .await;

        Ok(PipelineReport {
            stations_discovered,
            observations,
            forecasts,
            transform,
        })
    }

    async fn transform_stage(&self, engines_ok: bool, cancel: &CancellationToken) -> TransformStatus {
        let Some(config) = &self.transform else {
            info!("No transform configured");
            return TransformStatus::NotConfigured;
        };
        if cancel.is_cancelled() {
            warn!("Run cancelled, skipping transform");
            return TransformStatus::Cancelled;
        }
        if self.gate_transform && !engines_ok {
            warn!("Ingestion incomplete, skipping gated transform");
            return TransformStatus::Gated;
        }

        match run_transform(config).await {
            Ok(()) => TransformStatus::Completed,
            Err(e) => {
                error!(error = %format!("{:#}", e), "Transform failed");
                TransformStatus::Failed(format!("{:#}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use test_utils::{fixed_now, hourly_records, source_descriptor, Reply, ScriptedSource};
    use weather_common::Dataset;

    fn transform(lines: &[&str]) -> Option<TransformConfig> {
        let lines: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        TransformConfig::from_command_lines(&lines, None).unwrap()
    }

    fn scripted() -> Arc<ScriptedSource> {
        let source = Arc::new(ScriptedSource::new());
        source.with_sources(vec![
            source_descriptor(1, Some("10384"), "historical"),
            source_descriptor(2, Some("10384"), "forecast"),
        ]);
        source
            .on_station("10384", Reply::Records(hourly_records(fixed_now() - Duration::hours(2), 5)));
        source
    }

    async fn pipeline(source: Arc<ScriptedSource>, transform: Option<TransformConfig>) -> Pipeline {
        let store = WeatherStore::open_memory().await.unwrap();
        let source: Arc<dyn WeatherSource> = source;
        Pipeline::new(source, store, IngestionConfig::default(), transform)
    }

    #[tokio::test]
    async fn test_full_run() {
        let pipeline = pipeline(scripted(), transform(&["true"])).await;
        let report = pipeline
            .run(fixed_now(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.stations_discovered, 1);
        assert_eq!(report.observations.as_ref().unwrap().total_rows(), 3);
        assert_eq!(report.forecasts.as_ref().unwrap().total_rows(), 2);
        assert_eq!(report.transform, TransformStatus::Completed);
        assert!(report.is_success());

        assert_eq!(pipeline.store.count(Dataset::Observations).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_discovery_failure_aborts_run() {
        let source = scripted();
        source.fail_station_search(Reply::Status(500));
        let pipeline = pipeline(source.clone(), transform(&["true"])).await;

        let err = pipeline
            .run(fixed_now(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Station discovery failed"));
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transform_runs_despite_station_failures() {
        let source = scripted();
        source.set_station("10384", Reply::Timeout);
        let pipeline = pipeline(source, transform(&["true"])).await.with_gated_transform(true);

        let report = pipeline
            .run(fixed_now(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.observations.as_ref().unwrap().failed(), 1);
        assert_eq!(report.transform, TransformStatus::Completed);
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_transform_failure_is_reported() {
        let pipeline = pipeline(scripted(), transform(&["false"])).await;
        let report = pipeline
            .run(fixed_now(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(report.transform, TransformStatus::Failed(_)));
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_gate_blocks_transform_when_engine_fails() {
        let pipeline = pipeline(scripted(), transform(&["true"])).await.with_gated_transform(true);
        assert_eq!(
            pipeline.transform_stage(false, &CancellationToken::new()).await,
            TransformStatus::Gated
        );

        let ungated = pipeline.with_gated_transform(false);
        assert_eq!(
            ungated.transform_stage(false, &CancellationToken::new()).await,
            TransformStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_cancelled_run_skips_transform() {
        let pipeline = pipeline(scripted(), transform(&["true"])).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = pipeline.run(fixed_now(), &cancel).await.unwrap();
        assert_eq!(report.observations.as_ref().unwrap().cancelled(), 1);
        assert_eq!(report.transform, TransformStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_without_transform() {
        let pipeline = pipeline(scripted(), None).await;
        let report = pipeline
            .run(fixed_now(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.transform, TransformStatus::NotConfigured);
    }
}
