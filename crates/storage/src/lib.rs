//! Persistent store for the weather pipeline.
//!
//! One SQLite database holds:
//! - the station table, replaced wholesale on each discovery run
//! - observations, append-only and unique per (station, timestamp)
//! - forecasts, replaced per station from "now" onwards

mod schema;
mod store;

pub use store::WeatherStore;
