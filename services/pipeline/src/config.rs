//! Pipeline configuration.
//!
//! Values come from, lowest precedence first:
//! - built-in defaults
//! - an optional YAML file (`--config`)
//! - environment variables (including a `.env` file) and command-line flags

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use brightsky::ClientConfig;
use clap::Args;
use ingestion::IngestionConfig;
use serde::{Deserialize, Serialize};

use crate::transform::TransformConfig;

pub const DEFAULT_DB_PATH: &str = "data/weather_pipeline.db";

/// Configuration flags, each with an environment fallback.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// YAML configuration file
    #[arg(short, long, env = "PIPELINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// BrightSky API base URL
    #[arg(long, env = "BRIGHTSKY_API_URL")]
    pub api_url: Option<String>,

    /// SQLite database path
    #[arg(long, env = "WEATHER_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// API requests per second
    #[arg(long, env = "API_RATE_LIMIT")]
    pub rate_limit: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Days of history for stations without observations
    #[arg(long, env = "OBSERVATION_LOOKBACK_DAYS")]
    pub lookback_days: Option<u32>,

    /// Days of forecast to request
    #[arg(long, env = "FORECAST_HORIZON_DAYS")]
    pub forecast_horizon_days: Option<u32>,

    /// Station discovery center latitude
    #[arg(long, env = "CENTER_LAT", allow_negative_numbers = true)]
    pub center_lat: Option<f64>,

    /// Station discovery center longitude
    #[arg(long, env = "CENTER_LON", allow_negative_numbers = true)]
    pub center_lon: Option<f64>,

    /// Station discovery radius in meters
    #[arg(long, env = "MAX_DISTANCE_M")]
    pub max_distance_m: Option<u32>,

    /// Stations processed at once per engine
    #[arg(long, env = "MAX_CONCURRENT_STATIONS")]
    pub max_concurrent_stations: Option<usize>,

    /// Transform step to run after ingestion (repeat, or separate with ';')
    #[arg(long = "transform-command", env = "TRANSFORM_COMMAND", value_delimiter = ';')]
    pub transform_commands: Vec<String>,

    /// Working directory for transform steps
    #[arg(long, env = "TRANSFORM_DIR")]
    pub transform_dir: Option<PathBuf>,
}

/// YAML configuration file layout. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api: ApiSection,
    pub database_path: Option<PathBuf>,
    pub ingestion: IngestionConfig,
    pub transform: TransformSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    pub rate_limit_per_sec: u32,
    pub request_timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            base_url: client.base_url,
            rate_limit_per_sec: client.rate_limit_per_sec,
            request_timeout_secs: client.request_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSection {
    pub commands: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config from {:?}", path))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse pipeline config from {:?}", path))
    }
}

/// Fully resolved settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    pub db_path: PathBuf,
    pub ingestion: IngestionConfig,
    pub transform: Option<TransformConfig>,
}

impl Settings {
    /// Load the file named by `--config` (if any) and apply flag overrides.
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, args)
    }

    pub fn resolve(file: FileConfig, args: &ConfigArgs) -> Result<Self> {
        let mut ingestion = file.ingestion;
        if let Some(v) = args.lookback_days {
            ingestion.lookback_days = v;
        }
        if let Some(v) = args.forecast_horizon_days {
            ingestion.forecast_horizon_days = v;
        }
        if let Some(v) = args.center_lat {
            ingestion.center_lat = v;
        }
        if let Some(v) = args.center_lon {
            ingestion.center_lon = v;
        }
        if let Some(v) = args.max_distance_m {
            ingestion.max_distance_m = v;
        }
        if let Some(v) = args.max_concurrent_stations {
            ingestion.max_concurrent_stations = v;
        }
        ingestion.validate()?;

        let client = ClientConfig {
            base_url: args.api_url.clone().unwrap_or(file.api.base_url),
            request_timeout: Duration::from_secs(
                args.request_timeout_secs
                    .unwrap_or(file.api.request_timeout_secs)
                    .max(1),
            ),
            rate_limit_per_sec: args.rate_limit.unwrap_or(file.api.rate_limit_per_sec),
        };

        let db_path = args
            .db_path
            .clone()
            .or(file.database_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let commands = if args.transform_commands.is_empty() {
            file.transform.commands
        } else {
            args.transform_commands.clone()
        };
        let transform = TransformConfig::from_command_lines(
            &commands,
            args.transform_dir.clone().or(file.transform.working_dir),
        )?;

        Ok(Self {
            client,
            db_path,
            ingestion,
            transform,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(FileConfig::default(), &ConfigArgs::default()).unwrap();
        assert_eq!(settings.client.base_url, "https://api.brightsky.dev");
        assert_eq!(settings.client.rate_limit_per_sec, 10);
        assert_eq!(settings.client.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(settings.ingestion, IngestionConfig::default());
        assert!(settings.transform.is_none());
    }

    #[test]
    fn test_flags_override_file() {
        let file: FileConfig = serde_yaml::from_str(
            r#"
api:
  base_url: http://localhost:5000
  rate_limit_per_sec: 2
database_path: /var/lib/weather/file.db
ingestion:
  lookback_days: 14
  max_concurrent_stations: 2
transform:
  commands:
    - dbt deps
    - dbt build --profiles-dir .
  working_dir: transform
"#,
        )
        .unwrap();

        let args = ConfigArgs {
            db_path: Some(PathBuf::from("/tmp/flag.db")),
            lookback_days: Some(3),
            ..Default::default()
        };
        let settings = Settings::resolve(file, &args).unwrap();

        assert_eq!(settings.client.base_url, "http://localhost:5000");
        assert_eq!(settings.client.rate_limit_per_sec, 2);
        assert_eq!(settings.client.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.db_path, PathBuf::from("/tmp/flag.db"));
        assert_eq!(settings.ingestion.lookback_days, 3);
        assert_eq!(settings.ingestion.max_concurrent_stations, 2);
        assert_eq!(settings.ingestion.forecast_horizon_days, 10);

        let transform = settings.transform.unwrap();
        assert_eq!(transform.steps.len(), 2);
        assert_eq!(transform.steps[1].program, "dbt");
        assert_eq!(transform.working_dir, Some(PathBuf::from("transform")));
    }

    #[test]
    fn test_invalid_ingestion_values_rejected() {
        let args = ConfigArgs {
            max_concurrent_stations: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(FileConfig::default(), &args).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        fs::write(&path, "database_path: weather.db\n").unwrap();

        let args = ConfigArgs {
            config: Some(path),
            ..Default::default()
        };
        let settings = Settings::load(&args).unwrap();
        assert_eq!(settings.db_path, PathBuf::from("weather.db"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let args = ConfigArgs {
            config: Some(PathBuf::from("/nonexistent/pipeline.yaml")),
            ..Default::default()
        };
        let err = Settings::load(&args).unwrap_err();
        assert!(err.to_string().contains("Failed to read pipeline config"));
    }
}
