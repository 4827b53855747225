//! Incremental weather ingestion.
//!
//! Decides per station and dataset which time window to request next,
//! reconciles fetched records with what is stored, and keeps repeated runs
//! idempotent:
//!
//! - [`ObservationEngine`] appends records newer than the stored watermark
//! - [`ForecastEngine`] replaces each station's future forecasts atomically
//! - [`StationDiscovery`] refreshes the station table both engines read
//!
//! Engines never fail because of a single station. Per-station results are
//! returned in a [`RunSummary`].

pub mod config;
pub mod discovery;
pub mod error;
pub mod forecasts;
pub mod observations;
pub mod outcome;
pub mod registry;
mod runner;
pub mod watermark;

// Re-exports
pub use config::IngestionConfig;
pub use discovery::{group_sources, StationDiscovery};
pub use error::{IngestionError, Result};
pub use forecasts::ForecastEngine;
pub use observations::ObservationEngine;
pub use outcome::{RunSummary, StationOutcome, StationReport};
pub use registry::StationRegistry;
pub use watermark::WatermarkTracker;
