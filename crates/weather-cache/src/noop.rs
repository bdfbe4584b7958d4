//! No-op store implementation.

use async_trait::async_trait;
use tracing::trace;
use weather_core::{Result, SeriesStore, WeatherSeries};

/// A store that doesn't keep anything.
///
/// `get` always returns `Ok(None)` and `put` always succeeds.
/// Useful for disabling persistence so every gap goes to the remote source.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

impl NoopStore {
    /// Create a new no-op store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SeriesStore for NoopStore {
    async fn get(&self, _key: &str) -> Result<Option<WeatherSeries>> {
        trace!("NoopStore: get called, returning None");
        Ok(None)
    }

    async fn put(&self, _key: &str, _series: &WeatherSeries) -> Result<()> {
        trace!("NoopStore: put called, doing nothing");
        Ok(())
    }

    async fn remove(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_store_never_hits() {
        let store = NoopStore::new();
        store.put("X-2023", &WeatherSeries::new()).await.unwrap();
        assert!(store.get("X-2023").await.unwrap().is_none());
        assert!(!store.remove("X-2023").await.unwrap());
    }
}
