//! Reconciler configuration.

use serde::{Deserialize, Serialize};
use weather_core::OutlierFilter;

/// Settings of a [`FetchReconciler`](crate::FetchReconciler).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Filter applied to a series after remote rows are merged into it.
    pub outliers: OutlierFilter,
    /// While filling from the persistent store, treat a gap that ends on the
    /// session window's last day as complete once memory holds that day.
    ///
    /// Only sound when every cached series is contiguous from the window
    /// start, which partial fetch failures can break. The in-memory check
    /// always scans.
    pub assume_contiguous_cache: bool,
}

impl ReconcilerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outlier filter.
    #[must_use]
    pub const fn with_outliers(mut self, outliers: OutlierFilter) -> Self {
        self.outliers = outliers;
        self
    }

    /// Enable or disable the completed-window shortcut.
    #[must_use]
    pub const fn with_assume_contiguous_cache(mut self, enabled: bool) -> Self {
        self.assume_contiguous_cache = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_core::{Grouping, OutlierMethod};

    #[test]
    fn test_defaults() {
        let config = ReconcilerConfig::new();
        assert!(!config.assume_contiguous_cache);
        assert_eq!(
            config.outliers.method,
            OutlierMethod::ZScore { threshold: 3.5 }
        );
        assert_eq!(config.outliers.grouping, Grouping::Window(30));
    }

    #[test]
    fn test_partial_json() {
        let config: ReconcilerConfig =
            serde_json::from_str(r#"{"assume_contiguous_cache": true}"#).unwrap();
        assert!(config.assume_contiguous_cache);
        assert_eq!(config.outliers, OutlierFilter::default());
    }
}
