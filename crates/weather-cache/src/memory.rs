//! In-memory store implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use weather_core::{Result, SeriesStore, WeatherError, WeatherSeries};

/// Key/string store kept in process memory.
///
/// Series are kept as serialized JSON text, the same shape a browser-style
/// key-value store would hold, so reads always hand out an independent copy.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw blob stored under `key`.
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.blobs.read().await.get(key).cloned()
    }

    /// Stores a raw blob under `key` without validating it.
    pub async fn put_raw(&self, key: impl Into<String>, blob: impl Into<String>) {
        self.blobs.write().await.insert(key.into(), blob.into());
    }

    /// Number of stored blobs.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl SeriesStore for MemoryStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<WeatherSeries>> {
        let blobs = self.blobs.read().await;
        match blobs.get(key) {
            Some(blob) => {
                debug!("Store hit");
                serde_json::from_str(blob)
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
        self.blobs.write().await.insert(key.to_string(), blob);
        debug!("Stored series");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.blobs.write().await.remove(key).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.blobs.write().await.clear();
        debug!("Cleared in-memory store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_core::{ShortDate, WeatherRecord, store_key};

    fn sample() -> WeatherSeries {
        let mut series = WeatherSeries::new();
        series.insert(
            ShortDate::new(1, 1).unwrap(),
            WeatherRecord::new(Some(5.2), Some(-1.0)),
        );
        series.insert(
            ShortDate::new(1, 2).unwrap(),
            WeatherRecord::new(None, Some(-3.5)),
        );
        series
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        let key = store_key("10637", 2023);

        assert!(store.get(&key).await.unwrap().is_none());

        store.put(&key, &sample()).await.unwrap();
        let loaded = store.get(&key).await.unwrap().unwrap();
        assert_eq!(loaded, sample());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_store_blob_shape() {
        let store = MemoryStore::new();
        store.put("X-2023", &sample()).await.unwrap();

        let raw = store.raw("X-2023").await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["01-01"]["tmax"], 5.2);
        assert!(value["01-02"].get("tmax").is_none());
    }

    #[tokio::test]
    async fn test_memory_store_put_replaces() {
        let store = MemoryStore::new();
        store.put("X-2023", &sample()).await.unwrap();
        store.put("X-2023", &WeatherSeries::new()).await.unwrap();

        assert!(store.get("X-2023").await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_corrupt_blob() {
        let store = MemoryStore::new();
        store.put_raw("X-2023", "not json").await;

        let err = store.get("X-2023").await.unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
    }

    #[tokio::test]
    async fn test_memory_store_remove_and_clear() {
        let store = MemoryStore::new();
        store.put("A-2022", &sample()).await.unwrap();
        store.put("A-2023", &sample()).await.unwrap();

        assert!(store.remove("A-2022").await.unwrap());
        assert!(!store.remove("A-2022").await.unwrap());

        store.clear().await.unwrap();
        assert!(store.is_empty().await);
    }
}
