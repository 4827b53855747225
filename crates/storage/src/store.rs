//! Weather store backed by SQLite.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use sqlx::{FromRow, Sqlite};
use tracing::{debug, info};

use weather_common::{
    parse_utc, to_db_timestamp, Dataset, Station, StationKind, WeatherError, WeatherRecord,
    WeatherResult,
};

use crate::schema::{RECORD_COLUMNS, RECORD_PLACEHOLDERS, SCHEMA_SQL};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Stations, observations and forecasts.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct WeatherStore {
    pool: SqlitePool,
}

impl WeatherStore {
    /// Open or create the database at the given path.
    pub async fn open(path: &Path) -> WeatherResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    WeatherError::DatabaseError(format!(
                        "Cannot create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| WeatherError::DatabaseError(format!("Connection failed: {}", e)))?;

        info!(path = %path.display(), "Opened weather store");

        Ok(Self { pool })
    }

    /// Open an in-memory database (for testing).
    ///
    /// The schema is not created; call [`WeatherStore::migrate`].
    pub async fn open_memory() -> WeatherResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);

        // A memory database lives as long as its single connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| WeatherError::DatabaseError(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> WeatherResult<()> {
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| WeatherError::DatabaseError(format!("Migration failed: {}", e)))?;
            }
        }

        debug!("Weather store schema is up to date");
        Ok(())
    }

    // ========================================================================
    // Stations
    // ========================================================================

    /// Replace the whole station table in one transaction.
    pub async fn replace_stations(&self, stations: &[Station]) -> WeatherResult<u64> {
        let now = to_db_timestamp(&Utc::now());
        let mut tx = self.pool.begin().await.map_err(db_error("Begin failed"))?;

        sqlx::query("DELETE FROM weather_stations")
            .execute(&mut *tx)
            .await
            .map_err(db_error("Delete failed"))?;

        let mut inserted = 0;
        for station in stations {
            let result = sqlx::query(
                r#"
                INSERT INTO weather_stations (
                    id, dwd_station_id, wmo_station_id, station_name, station_kind,
                    lat, lon, height, first_record, last_record, distance, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&station.id)
            .bind(station.dwd_station_id.as_deref())
            .bind(station.wmo_station_id.as_deref())
            .bind(&station.name)
            .bind(station.kind.as_str())
            .bind(station.lat)
            .bind(station.lon)
            .bind(station.height)
            .bind(station.first_record.as_ref().map(to_db_timestamp))
            .bind(station.last_record.as_ref().map(to_db_timestamp))
            .bind(station.distance)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Insert failed"))?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(db_error("Commit failed"))?;

        info!(stations = inserted, "Replaced station table");
        Ok(inserted)
    }

    /// Stations whose kind is one of `kinds`, ordered by id.
    pub async fn stations_by_kind(&self, kinds: &[StationKind]) -> WeatherResult<Vec<Station>> {
        if kinds.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; kinds.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM weather_stations WHERE station_kind IN ({}) ORDER BY id",
            STATION_COLUMNS, placeholders
        );

        let mut query = sqlx::query_as::<_, StationRow>(&sql);
        for kind in kinds {
            query = query.bind(kind.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Query failed"))?;

        rows.into_iter().map(StationRow::into_station).collect()
    }

    pub async fn all_stations(&self) -> WeatherResult<Vec<Station>> {
        self.stations_by_kind(&[StationKind::Observation, StationKind::Forecast, StationKind::Both])
            .await
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Latest stored timestamp for a station, as stored (no zone attached).
    pub async fn latest_timestamp(
        &self,
        station_id: &str,
        dataset: Dataset,
    ) -> WeatherResult<Option<String>> {
        let sql = format!(
            "SELECT MAX({}) FROM {} WHERE station_id = ?",
            timestamp_column(dataset),
            table(dataset)
        );

        let row: (Option<String>,) = sqlx::query_as(&sql)
            .bind(station_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Query failed"))?;

        Ok(row.0)
    }

    /// Append observations for a station in one transaction.
    ///
    /// Rows whose (station, timestamp) already exists are ignored. Returns
    /// the number of rows actually inserted.
    pub async fn append_observations(
        &self,
        station: &Station,
        records: &[WeatherRecord],
        ingested_at: DateTime<Utc>,
    ) -> WeatherResult<u64> {
        let sql = format!(
            "INSERT OR IGNORE INTO weather_observations (timestamp, {}) VALUES ({})",
            RECORD_COLUMNS, RECORD_PLACEHOLDERS
        );
        let ingested_at = to_db_timestamp(&ingested_at);

        let mut tx = self.pool.begin().await.map_err(db_error("Begin failed"))?;

        let mut inserted = 0;
        for record in records {
            let timestamp = to_db_timestamp(&record.timestamp);
            let result = bind_record(sqlx::query(&sql), &timestamp, station, record, &ingested_at)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Insert failed"))?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(db_error("Commit failed"))?;

        debug!(station = %station.id, inserted, offered = records.len(), "Appended observations");
        Ok(inserted)
    }

    /// Replace a station's forecasts from `from` onwards with `records`.
    ///
    /// The delete and the inserts share one transaction, so readers never
    /// see the station without forecasts.
    pub async fn replace_forecasts(
        &self,
        station: &Station,
        from: DateTime<Utc>,
        records: &[WeatherRecord],
        ingested_at: DateTime<Utc>,
    ) -> WeatherResult<u64> {
        let sql = format!(
            "INSERT OR REPLACE INTO weather_forecasts (forecast_timestamp, {}) VALUES ({})",
            RECORD_COLUMNS, RECORD_PLACEHOLDERS
        );
        let ingested_at = to_db_timestamp(&ingested_at);

        let mut tx = self.pool.begin().await.map_err(db_error("Begin failed"))?;

        let deleted = sqlx::query(
            "DELETE FROM weather_forecasts WHERE station_id = ? AND forecast_timestamp >= ?",
        )
        .bind(&station.id)
        .bind(to_db_timestamp(&from))
        .execute(&mut *tx)
        .await
        .map_err(db_error("Delete failed"))?
        .rows_affected();

        let mut inserted = 0;
        for record in records {
            let timestamp = to_db_timestamp(&record.timestamp);
            let result = bind_record(sqlx::query(&sql), &timestamp, station, record, &ingested_at)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Insert failed"))?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(db_error("Commit failed"))?;

        debug!(station = %station.id, deleted, inserted, "Replaced forecasts");
        Ok(inserted)
    }

    /// All observations for a station, oldest first.
    pub async fn observations_for(&self, station_id: &str) -> WeatherResult<Vec<WeatherRecord>> {
        self.records_for(Dataset::Observations, station_id).await
    }

    /// All forecasts for a station, earliest first.
    pub async fn forecasts_for(&self, station_id: &str) -> WeatherResult<Vec<WeatherRecord>> {
        self.records_for(Dataset::Forecasts, station_id).await
    }

    async fn records_for(
        &self,
        dataset: Dataset,
        station_id: &str,
    ) -> WeatherResult<Vec<WeatherRecord>> {
        let sql = format!(
            "SELECT {ts} AS timestamp, {cols} FROM {table} WHERE station_id = ? ORDER BY {ts}",
            ts = timestamp_column(dataset),
            cols = RECORD_COLUMNS,
            table = table(dataset),
        );

        let rows = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(station_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Query failed"))?;

        rows.into_iter().map(RecordRow::into_record).collect()
    }

    /// Number of rows in a dataset.
    pub async fn count(&self, dataset: Dataset) -> WeatherResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table(dataset));
        let row: (i64,) = sqlx::query_as(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Query failed"))?;
        Ok(row.0 as u64)
    }

    /// Drop a table, so reads and writes against it fail.
    #[cfg(any(test, feature = "test-hooks"))]
    pub async fn drop_table(&self, dataset: Dataset) -> WeatherResult<()> {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table(dataset)))
            .execute(&self.pool)
            .await
            .map_err(db_error("Drop failed"))?;
        Ok(())
    }
}

const STATION_COLUMNS: &str = "id, dwd_station_id, wmo_station_id, station_name, station_kind, \
     lat, lon, height, first_record, last_record, distance";

fn table(dataset: Dataset) -> &'static str {
    match dataset {
        Dataset::Observations => "weather_observations",
        Dataset::Forecasts => "weather_forecasts",
    }
}

fn timestamp_column(dataset: Dataset) -> &'static str {
    match dataset {
        Dataset::Observations => "timestamp",
        Dataset::Forecasts => "forecast_timestamp",
    }
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> WeatherError {
    move |e| WeatherError::DatabaseError(format!("{}: {}", context, e))
}

/// Bind the timestamp and every column in `RECORD_COLUMNS`, in order.
fn bind_record<'q>(
    query: SqliteQuery<'q>,
    timestamp: &'q str,
    station: &'q Station,
    record: &'q WeatherRecord,
    ingested_at: &'q str,
) -> SqliteQuery<'q> {
    query
        .bind(timestamp)
        .bind(station.id.as_str())
        .bind(station.wmo_station_id.as_deref())
        .bind(record.source_id)
        .bind(record.precipitation)
        .bind(record.pressure_msl)
        .bind(record.sunshine)
        .bind(record.temperature)
        .bind(record.wind_direction)
        .bind(record.wind_speed)
        .bind(record.cloud_cover)
        .bind(record.dew_point)
        .bind(record.relative_humidity)
        .bind(record.visibility)
        .bind(record.wind_gust_direction)
        .bind(record.wind_gust_speed)
        .bind(record.condition.as_deref())
        .bind(record.precipitation_probability)
        .bind(record.precipitation_probability_6h)
        .bind(record.solar)
        .bind(record.icon.as_deref())
        .bind(record.fallback_source_ids.as_deref())
        .bind(ingested_at)
}

#[derive(FromRow)]
struct StationRow {
    id: String,
    dwd_station_id: Option<String>,
    wmo_station_id: Option<String>,
    station_name: String,
    station_kind: String,
    lat: f64,
    lon: f64,
    height: Option<f64>,
    first_record: Option<String>,
    last_record: Option<String>,
    distance: Option<f64>,
}

impl StationRow {
    fn into_station(self) -> WeatherResult<Station> {
        let kind = StationKind::parse(&self.station_kind).ok_or_else(|| {
            WeatherError::DatabaseError(format!(
                "Unknown station kind '{}' for station {}",
                self.station_kind, self.id
            ))
        })?;

        Ok(Station {
            id: self.id,
            wmo_station_id: self.wmo_station_id,
            dwd_station_id: self.dwd_station_id,
            name: self.station_name,
            lat: self.lat,
            lon: self.lon,
            height: self.height,
            kind,
            first_record: self.first_record.as_deref().map(parse_utc).transpose()?,
            last_record: self.last_record.as_deref().map(parse_utc).transpose()?,
            distance: self.distance,
        })
    }
}

#[derive(FromRow)]
struct RecordRow {
    timestamp: String,
    source_id: Option<i64>,
    precipitation: Option<f64>,
    pressure_msl: Option<f64>,
    sunshine: Option<f64>,
    temperature: Option<f64>,
    wind_direction: Option<f64>,
    wind_speed: Option<f64>,
    cloud_cover: Option<f64>,
    dew_point: Option<f64>,
    relative_humidity: Option<f64>,
    visibility: Option<f64>,
    wind_gust_direction: Option<f64>,
    wind_gust_speed: Option<f64>,
    condition: Option<String>,
    precipitation_probability: Option<f64>,
    precipitation_probability_6h: Option<f64>,
    solar: Option<f64>,
    icon: Option<String>,
    fallback_source_ids: Option<String>,
}

impl RecordRow {
    fn into_record(self) -> WeatherResult<WeatherRecord> {
        Ok(WeatherRecord {
            timestamp: parse_utc(&self.timestamp)?,
            source_id: self.source_id,
            precipitation: self.precipitation,
            pressure_msl: self.pressure_msl,
            sunshine: self.sunshine,
            temperature: self.temperature,
            wind_direction: self.wind_direction,
            wind_speed: self.wind_speed,
            cloud_cover: self.cloud_cover,
            dew_point: self.dew_point,
            relative_humidity: self.relative_humidity,
            visibility: self.visibility,
            wind_gust_direction: self.wind_gust_direction,
            wind_gust_speed: self.wind_gust_speed,
            condition: self.condition,
            precipitation_probability: self.precipitation_probability,
            precipitation_probability_6h: self.precipitation_probability_6h,
            solar: self.solar,
            icon: self.icon,
            fallback_source_ids: self.fallback_source_ids,
        })
    }
}
