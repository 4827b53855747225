//! Weather ingestion pipeline.
//!
//! One invocation is one run: schema init, station discovery, observation
//! and forecast ingestion in parallel, then the downstream transform.
//! Scheduling is left to cron, systemd timers or similar.

mod config;
mod pipeline;
mod transform;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use brightsky::{BrightSkyClient, WeatherSource};
use chrono::Utc;
use clap::Parser;
use serde_json::json;
use storage::WeatherStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::{ConfigArgs, Settings};
use pipeline::{Pipeline, PipelineReport};

#[derive(Parser, Debug)]
#[command(name = "weather-pipeline")]
#[command(about = "Incremental weather observation and forecast ingestion")]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,

    /// Only run the transform when both ingestion engines completed
    #[arg(long, env = "GATE_TRANSFORM")]
    gate_transform: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting weather pipeline");

    let settings = Settings::load(&args.config)?;
    info!(
        db = %settings.db_path.display(),
        lookback_days = settings.ingestion.lookback_days,
        horizon_days = settings.ingestion.forecast_horizon_days,
        transform = settings.transform.is_some(),
        "Loaded configuration"
    );

    let client = BrightSkyClient::new(&settings.client).context("Failed to create API client")?;
    info!(api = %client.base_url(), "API client ready");
    let source: Arc<dyn WeatherSource> = Arc::new(client);
    let store = WeatherStore::open(&settings.db_path)
        .await
        .with_context(|| format!("Failed to open database {:?}", settings.db_path))?;

    // Stop between stations on Ctrl-C; finished stations stay written
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after current stations");
            signal_token.cancel();
        }
    });

    let pipeline = Pipeline::new(source, store, settings.ingestion, settings.transform)
        .with_gated_transform(args.gate_transform);
    let report = pipeline.run(Utc::now(), &cancel).await?;

    println!("{}", report_json(&report));

    if !report.is_success() {
        bail!("Pipeline finished with errors");
    }
    info!("Pipeline finished");
    Ok(())
}

fn report_json(report: &PipelineReport) -> serde_json::Value {
    let engine = |result: &std::result::Result<ingestion::RunSummary, ingestion::IngestionError>| {
        match result {
            Ok(summary) => json!({
                "rows": summary.total_rows(),
                "succeeded": summary.succeeded(),
                "failed": summary.failed(),
                "skipped": summary.skipped(),
                "cancelled": summary.cancelled(),
                "stations": summary.stations,
            }),
            Err(e) => json!({ "error": e.to_string() }),
        }
    };

    json!({
        "stations_discovered": report.stations_discovered,
        "observations": engine(&report.observations),
        "forecasts": engine(&report.forecasts),
        "transform": report.transform,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "weather-pipeline",
            "--db-path",
            "/tmp/w.db",
            "--center-lat",
            "-33.9",
            "--transform-command",
            "dbt deps;dbt build",
            "--gate-transform",
        ])
        .unwrap();

        assert!(args.gate_transform);
        assert_eq!(args.config.center_lat, Some(-33.9));
        assert_eq!(args.config.transform_commands, vec!["dbt deps", "dbt build"]);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_report_json() {
        let report = PipelineReport {
            stations_discovered: 2,
            observations: Ok(ingestion::RunSummary::new(weather_common::Dataset::Observations)),
            forecasts: Err(ingestion::IngestionError::InvalidConfig("x".into())),
            transform: pipeline::TransformStatus::NotConfigured,
        };
        let value = report_json(&report);
        assert_eq!(value["stations_discovered"], 2);
        assert_eq!(value["observations"]["rows"], 0);
        assert!(value["forecasts"]["error"].is_string());
        assert_eq!(value["transform"]["status"], "not_configured");
    }
}
