//! HTTP client for the BrightSky API.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use tracing::{debug, instrument};

use weather_common::{WeatherError, WeatherRecord, WeatherResult};

use crate::models::{parse_sources_body, parse_weather_body, SourceDescriptor};
use crate::source::{FetchTarget, WeatherSource};

pub const DEFAULT_BASE_URL: &str = "https://api.brightsky.dev";

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Connection settings for [`BrightSkyClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, without trailing slash
    pub base_url: String,
    /// Upper bound for a single request, including the body
    pub request_timeout: Duration,
    /// Requests allowed per second
    pub rate_limit_per_sec: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            rate_limit_per_sec: 10,
        }
    }
}

/// BrightSky API client.
#[derive(Clone)]
pub struct BrightSkyClient {
    client: Client,
    base_url: String,
    limiter: Arc<DirectRateLimiter>,
}

impl BrightSkyClient {
    pub fn new(config: &ClientConfig) -> WeatherResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(WeatherError::InvalidConfig("empty API base URL".into()));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| WeatherError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limiter: Arc::new(RateLimiter::direct(quota_per_second(
                config.rate_limit_per_sec,
            ))),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> WeatherResult<String> {
        self.limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url = %url, params = ?params, "Requesting");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WeatherError::Api {
                status: status.as_u16(),
                url,
                message: truncate(&message, 200),
            });
        }

        response.text().await.map_err(map_reqwest_error)
    }
}

#[async_trait]
impl WeatherSource for BrightSkyClient {
    #[instrument(skip(self))]
    async fn find_stations(
        &self,
        lat: f64,
        lon: f64,
        max_distance_m: u32,
    ) -> WeatherResult<Vec<SourceDescriptor>> {
        let body = self
            .get("/sources", &sources_params(lat, lon, max_distance_m))
            .await?;
        parse_sources_body(&body)
    }

    #[instrument(skip(self), fields(target = %target))]
    async fn fetch_weather(
        &self,
        target: &FetchTarget,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> WeatherResult<Vec<WeatherRecord>> {
        let body = self.get("/weather", &weather_params(target, from, to)).await?;
        let records = parse_weather_body(&body)?;
        debug!(count = records.len(), "Fetched weather records");
        Ok(records)
    }
}

pub(crate) fn sources_params(lat: f64, lon: f64, max_distance_m: u32) -> Vec<(&'static str, String)> {
    vec![
        ("lat", lat.to_string()),
        ("lon", lon.to_string()),
        ("max_dist", max_distance_m.to_string()),
    ]
}

pub(crate) fn weather_params(
    target: &FetchTarget,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<(&'static str, String)> {
    let mut params = match target {
        FetchTarget::Station(id) => vec![("wmo_station_id", id.clone())],
        FetchTarget::Coordinates { lat, lon } => {
            vec![("lat", lat.to_string()), ("lon", lon.to_string())]
        }
    };
    params.push(("date", from.to_rfc3339_opts(SecondsFormat::Secs, true)));
    params.push(("last_date", to.to_rfc3339_opts(SecondsFormat::Secs, true)));
    params
}

fn quota_per_second(limit: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN))
}

fn map_reqwest_error(e: reqwest::Error) -> WeatherError {
    if e.is_timeout() {
        WeatherError::Timeout
    } else if e.is_decode() {
        WeatherError::Decode(e.to_string())
    } else {
        WeatherError::Http(e.to_string())
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
