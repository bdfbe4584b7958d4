//! Persistent store trait for cached weather series.
//!
//! This module defines the [`SeriesStore`] trait, the second tier of the cache.
//! Blobs are whole [`WeatherSeries`] keyed by [`store_key`].

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::Result, types::WeatherSeries};

/// Builds the persistent key `"<stationId>-<year>"`.
#[must_use]
pub fn store_key(station_id: &str, year: i32) -> String {
    format!("{station_id}-{year:04}")
}

/// Key-value store of serialized weather series.
///
/// Implementations can keep blobs in various backends (a plain key-string
/// map, SQLite, etc.). The store is independent of the in-memory station
/// cache: callers copy between the two, never share.
#[async_trait]
pub trait SeriesStore: Send + Sync + Debug {
    /// Returns the stored series for `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored under the key.
    async fn get(&self, key: &str) -> Result<Option<WeatherSeries>>;

    /// Stores `series` under `key`, replacing any previous blob.
    async fn put(&self, key: &str, series: &WeatherSeries) -> Result<()>;

    /// Removes the blob under `key`; returns true if one was stored.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Removes every blob.
    async fn clear(&self) -> Result<()>;
}
