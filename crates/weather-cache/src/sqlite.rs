//! SQLite-based store implementation.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};
use weather_core::{Result, SeriesStore, WeatherError, WeatherSeries};

/// SQLite-based store for weather series.
///
/// Each series is kept as a JSON blob in a single table, one row per
/// station and year, so data survives application restarts.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a SQLite store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| WeatherError::Store(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| WeatherError::Store(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| WeatherError::Store(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS series_cache (
                key TEXT PRIMARY KEY NOT NULL,
                data_json TEXT NOT NULL,
                stored_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| WeatherError::Store(e.to_string()))?;

        debug!("SQLite store schema initialized");
        Ok(())
    }
}

#[async_trait]
impl SeriesStore for SqliteStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<WeatherSeries>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| WeatherError::Store(e.to_string()))?;

        let blob: Option<String> = conn
            .query_row(
                "SELECT data_json FROM series_cache WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| WeatherError::Store(e.to_string()))?;

        match blob {
            Some(blob) => {
                debug!("Store hit");
                serde_json::from_str(&blob)
                    .map(Some)
                    .map_err(|e| WeatherError::Parse(format!("stored blob {key}: {e}")))
            }
            None => {
                debug!("Store miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, series), fields(days = series.len()))]
    async fn put(&self, key: &str, series: &WeatherSeries) -> Result<()> {
        let blob = serde_json::to_string(series).map_err(|e| WeatherError::Store(e.to_string()))?;
        let stored_at = Utc::now().to_rfc3339();

        let conn = self
            .conn
            .lock()
            .map_err(|e| WeatherError::Store(e.to_string()))?;

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| WeatherError::Store(e.to_string()))?;
        tx.execute(
            "INSERT OR REPLACE INTO series_cache (key, data_json, stored_at)
             VALUES (?1, ?2, ?3)",
            params![key, blob, stored_at],
        )
        .map_err(|e| WeatherError::Store(e.to_string()))?;
        tx.commit().map_err(|e| WeatherError::Store(e.to_string()))?;

        debug!("Stored series");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| WeatherError::Store(e.to_string()))?;
        let removed = conn
            .execute("DELETE FROM series_cache WHERE key = ?1", params![key])
            .map_err(|e| WeatherError::Store(e.to_string()))?;
        Ok(removed > 0)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| WeatherError::Store(e.to_string()))?;
        conn.execute("DELETE FROM series_cache", [])
            .map_err(|e| WeatherError::Store(e.to_string()))?;
        debug!("Cleared SQLite store");
        Ok(())
    }
}
