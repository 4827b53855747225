//! Table definitions for the weather store.
//!
//! Timestamp columns hold naive UTC text (`YYYY-MM-DD HH:MM:SS`).

pub(crate) const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS weather_stations (
    id TEXT PRIMARY KEY,
    dwd_station_id TEXT,
    wmo_station_id TEXT,
    station_name TEXT NOT NULL,
    station_kind TEXT NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    height REAL,
    first_record TEXT,
    last_record TEXT,
    distance REAL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_stations_kind ON weather_stations(station_kind);

CREATE TABLE IF NOT EXISTS weather_observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    station_id TEXT NOT NULL,
    wmo_station_id TEXT,
    source_id INTEGER,
    precipitation REAL,
    pressure_msl REAL,
    sunshine REAL,
    temperature REAL,
    wind_direction REAL,
    wind_speed REAL,
    cloud_cover REAL,
    dew_point REAL,
    relative_humidity REAL,
    visibility REAL,
    wind_gust_direction REAL,
    wind_gust_speed REAL,
    condition TEXT,
    precipitation_probability REAL,
    precipitation_probability_6h REAL,
    solar REAL,
    icon TEXT,
    fallback_source_ids TEXT,
    ingested_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_observations_station_ts
    ON weather_observations(station_id, timestamp);

CREATE TABLE IF NOT EXISTS weather_forecasts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    forecast_timestamp TEXT NOT NULL,
    station_id TEXT NOT NULL,
    wmo_station_id TEXT,
    source_id INTEGER,
    precipitation REAL,
    pressure_msl REAL,
    sunshine REAL,
    temperature REAL,
    wind_direction REAL,
    wind_speed REAL,
    cloud_cover REAL,
    dew_point REAL,
    relative_humidity REAL,
    visibility REAL,
    wind_gust_direction REAL,
    wind_gust_speed REAL,
    condition TEXT,
    precipitation_probability REAL,
    precipitation_probability_6h REAL,
    solar REAL,
    icon TEXT,
    fallback_source_ids TEXT,
    ingested_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_forecasts_station_ts
    ON weather_forecasts(station_id, forecast_timestamp)
"#;

/// Columns shared by both record tables, after the timestamp column.
pub(crate) const RECORD_COLUMNS: &str = "station_id, wmo_station_id, source_id, \
     precipitation, pressure_msl, sunshine, temperature, wind_direction, wind_speed, \
     cloud_cover, dew_point, relative_humidity, visibility, wind_gust_direction, \
     wind_gust_speed, condition, precipitation_probability, precipitation_probability_6h, \
     solar, icon, fallback_source_ids, ingested_at";

/// Placeholders for the timestamp column plus [`RECORD_COLUMNS`].
pub(crate) const RECORD_PLACEHOLDERS: &str =
    "?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?";
