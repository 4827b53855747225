//! Error types for the ingestion crate.

use thiserror::Error;
use weather_common::WeatherError;

/// Errors that end an engine or stage run.
///
/// Per-station failures never surface here; they are reported in the
/// run summary instead.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to read station registry: {0}")]
    Registry(#[source] WeatherError),

    #[error("Station discovery failed: {0}")]
    Discovery(#[source] WeatherError),

    #[error("Failed to store stations: {0}")]
    StationStore(#[source] WeatherError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
