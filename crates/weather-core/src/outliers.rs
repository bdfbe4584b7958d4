//! Statistical outlier removal for daily readings.
//!
//! Each method looks at one tracked parameter at a time across a group of
//! records and sets anomalous readings to `None` in place. Records that end up
//! with no readings at all are left for the caller to remove
//! (see [`WeatherSeries::remove_empty`]).
//!
//! [`OutlierFilter`] combines a method with a [`Grouping`] that partitions a
//! series before filtering, so that a seasonal trend does not dominate the
//! baseline of a whole year.

use serde::{Deserialize, Serialize};

use crate::types::{Parameter, WeatherRecord, WeatherSeries};

/// Default Z-score threshold for [`filter_outliers`].
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;

/// Default Z-score threshold when filtering grouped series.
pub const GROUPED_ZSCORE_THRESHOLD: f64 = 3.5;

/// Default threshold for the median-based modified Z-score.
pub const DEFAULT_MODIFIED_ZSCORE_THRESHOLD: f64 = 3.5;

/// Default interquartile range multiplier.
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Default number of consecutive entries per group.
pub const DEFAULT_WINDOW: usize = 30;

/// Scales the median absolute deviation to a standard normal.
const MAD_SCALE: f64 = 0.6745;

/// Method used to decide whether a reading is an outlier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum OutlierMethod {
    /// `|v - mean| / stddev > threshold`, population standard deviation.
    ZScore {
        /// Largest accepted score.
        threshold: f64,
    },
    /// `0.6745 * |v - median| / MAD > threshold`.
    ModifiedZScore {
        /// Largest accepted score.
        threshold: f64,
    },
    /// Outside `[q1 - k * iqr, q3 + k * iqr]`.
    Iqr {
        /// Interquartile range multiplier.
        k: f64,
    },
}

impl Default for OutlierMethod {
    fn default() -> Self {
        Self::ZScore {
            threshold: GROUPED_ZSCORE_THRESHOLD,
        }
    }
}

impl OutlierMethod {
    /// Median-based modified Z-score with the default threshold.
    #[must_use]
    pub const fn modified_zscore() -> Self {
        Self::ModifiedZScore {
            threshold: DEFAULT_MODIFIED_ZSCORE_THRESHOLD,
        }
    }

    /// Interquartile range with the default multiplier.
    #[must_use]
    pub const fn iqr() -> Self {
        Self::Iqr {
            k: DEFAULT_IQR_MULTIPLIER,
        }
    }

    /// Removes outliers from one group of records, for every tracked parameter.
    pub fn apply(&self, records: &mut [&mut WeatherRecord]) {
        for parameter in Parameter::ALL {
            match *self {
                Self::ZScore { threshold } => zscore(records, parameter, threshold),
                Self::ModifiedZScore { threshold } => {
                    modified_zscore(records, parameter, threshold);
                }
                Self::Iqr { k } => iqr(records, parameter, k),
            }
        }
    }
}

/// How a series is partitioned before filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// Consecutive groups of this many entries, in date order.
    Window(usize),
    /// One group per calendar month.
    Month,
    /// The whole series as one group.
    Whole,
}

impl Default for Grouping {
    fn default() -> Self {
        Self::Window(DEFAULT_WINDOW)
    }
}

/// An outlier method applied per group of a series.
///
/// The default is the Z-score with threshold 3.5 over windows of 30 entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlierFilter {
    /// Outlier test.
    #[serde(default)]
    pub method: OutlierMethod,
    /// Partitioning of the series.
    #[serde(default)]
    pub grouping: Grouping,
}

impl OutlierFilter {
    /// Creates a filter.
    #[must_use]
    pub const fn new(method: OutlierMethod, grouping: Grouping) -> Self {
        Self { method, grouping }
    }

    /// Removes outliers from `series` in place, group by group.
    ///
    /// Records emptied by the filter stay in the series.
    pub fn apply(&self, series: &mut WeatherSeries) {
        match self.grouping {
            Grouping::Window(size) => {
                let mut records: Vec<&mut WeatherRecord> =
                    series.iter_mut().map(|(_, record)| record).collect();
                for group in records.chunks_mut(size.max(1)) {
                    self.method.apply(group);
                }
            }
            Grouping::Month => {
                let mut group: Vec<&mut WeatherRecord> = Vec::new();
                let mut month = None;
                for (date, record) in series.iter_mut() {
                    if month.is_some_and(|m| m != date.month()) {
                        self.method.apply(&mut group);
                        group.clear();
                    }
                    month = Some(date.month());
                    group.push(record);
                }
                self.method.apply(&mut group);
            }
            Grouping::Whole => {
                let mut records: Vec<&mut WeatherRecord> =
                    series.iter_mut().map(|(_, record)| record).collect();
                self.method.apply(&mut records);
            }
        }
    }
}

/// Removes Z-score outliers from one group of records.
///
/// For each tracked parameter, a reading is dropped when its distance from the
/// group mean exceeds `threshold` population standard deviations. Nothing is
/// dropped from a group without variance.
pub fn filter_outliers(records: &mut [&mut WeatherRecord], threshold: f64) {
    OutlierMethod::ZScore { threshold }.apply(records);
}

fn defined_values(records: &[&mut WeatherRecord], parameter: Parameter) -> Vec<f64> {
    records.iter().filter_map(|r| r.get(parameter)).collect()
}

fn sorted_values(records: &[&mut WeatherRecord], parameter: Parameter) -> Vec<f64> {
    let mut values = defined_values(records, parameter);
    values.sort_by(f64::total_cmp);
    values
}

fn drop_where(
    records: &mut [&mut WeatherRecord],
    parameter: Parameter,
    is_outlier: impl Fn(f64) -> bool,
) {
    for record in records.iter_mut() {
        if record.get(parameter).is_some_and(&is_outlier) {
            record.set(parameter, None);
        }
    }
}

fn zscore(records: &mut [&mut WeatherRecord], parameter: Parameter, threshold: f64) {
    let values = defined_values(records, parameter);
    if values.is_empty() {
        return;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return;
    }
    drop_where(records, parameter, |v| (v - mean).abs() / std_dev > threshold);
}

fn modified_zscore(records: &mut [&mut WeatherRecord], parameter: Parameter, threshold: f64) {
    let sorted = sorted_values(records, parameter);
    if sorted.is_empty() {
        return;
    }
    let median = sorted[sorted.len() / 2];
    let mut deviations: Vec<f64> = sorted.iter().map(|v| (v - median).abs()).collect();
    deviations.sort_by(f64::total_cmp);
    let mad = deviations[deviations.len() / 2];
    if mad == 0.0 {
        return;
    }
    drop_where(records, parameter, |v| {
        MAD_SCALE * (v - median).abs() / mad > threshold
    });
}

fn iqr(records: &mut [&mut WeatherRecord], parameter: Parameter, k: f64) {
    let sorted = sorted_values(records, parameter);
    if sorted.is_empty() {
        return;
    }
    let n = sorted.len() as f64;
    let q1 = sorted[(n * 0.25).floor() as usize];
    let q3 = sorted[(n * 0.75).floor() as usize];
    let range = q3 - q1;
    let lower = q1 - k * range;
    let upper = q3 + k * range;
    drop_where(records, parameter, |v| v < lower || v > upper);
}
