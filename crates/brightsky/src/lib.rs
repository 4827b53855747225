//! BrightSky weather API adapter.
//!
//! Exposes the [`WeatherSource`] trait the ingestion engines are written
//! against, and [`BrightSkyClient`], its HTTP implementation. Two query
//! shapes are supported:
//!
//! - station discovery around a coordinate (`/sources`)
//! - records for a station or coordinate within a time window (`/weather`)
//!
//! Every request goes through a shared rate limiter and is bounded by the
//! configured timeout.

mod client;
pub mod models;
mod source;

pub use client::{BrightSkyClient, ClientConfig, DEFAULT_BASE_URL};
pub use models::{parse_sources_body, parse_weather_body, SourceDescriptor};
pub use source::{FetchTarget, WeatherSource};
