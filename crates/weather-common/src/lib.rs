//! Common types and utilities shared across the weather pipeline crates.

pub mod error;
pub mod record;
pub mod station;
pub mod time;

pub use error::{WeatherError, WeatherResult};
pub use record::{dedup_by_timestamp, WeatherRecord};
pub use station::{Dataset, Station, StationKind};
pub use time::{parse_utc, to_db_timestamp, TimeWindow};
