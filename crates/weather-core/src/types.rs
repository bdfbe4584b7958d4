//! Core data types for daily weather observations.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Parameter`] - A tracked weather measurement
//! - [`WeatherRecord`] - Readings for one day
//! - [`WeatherSeries`] - Readings keyed by short date for one station and year
//! - [`StationYearData`] - Series keyed by year
//! - [`DailyObservation`] - A row as returned by a remote source

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::str::FromStr;

use crate::date::{ShortDate, parse_full_date};
use crate::error::{Result, WeatherError};

/// A tracked weather parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    /// Daily maximum air temperature.
    Tmax,
    /// Daily minimum air temperature.
    Tmin,
}

impl Parameter {
    /// Every tracked parameter, in storage order.
    pub const ALL: [Self; 2] = [Self::Tmax, Self::Tmin];

    /// The wire name of the parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tmax => "tmax",
            Self::Tmin => "tmin",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Parameter {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tmax" => Ok(Self::Tmax),
            "tmin" => Ok(Self::Tmin),
            other => Err(WeatherError::InvalidParameter(format!(
                "Unknown weather parameter: {other}"
            ))),
        }
    }
}

/// Readings of the tracked parameters for a single day.
///
/// `None` means "no reading", whether the source omitted the field or sent `null`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// Maximum temperature (°C).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmax: Option<f64>,
    /// Minimum temperature (°C).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmin: Option<f64>,
}

impl WeatherRecord {
    /// Creates a record from the two temperature readings.
    #[must_use]
    pub const fn new(tmax: Option<f64>, tmin: Option<f64>) -> Self {
        Self { tmax, tmin }
    }

    /// Returns the reading for a parameter.
    #[must_use]
    pub const fn get(&self, parameter: Parameter) -> Option<f64> {
        match parameter {
            Parameter::Tmax => self.tmax,
            Parameter::Tmin => self.tmin,
        }
    }

    /// Replaces the reading for a parameter.
    pub fn set(&mut self, parameter: Parameter, value: Option<f64>) {
        match parameter {
            Parameter::Tmax => self.tmax = value,
            Parameter::Tmin => self.tmin = value,
        }
    }

    /// Returns true if every tracked parameter is missing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Parameter::ALL.iter().all(|p| self.get(*p).is_none())
    }
}

/// Daily readings for one station and year, keyed by short date.
///
/// Iteration is always chronological. Empty records are never stored, and
/// are dropped when a serialized series is read back.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeatherSeries(BTreeMap<ShortDate, WeatherRecord>);

impl<'de> Deserialize<'de> for WeatherSeries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        BTreeMap::<ShortDate, WeatherRecord>::deserialize(deserializer)
            .map(|entries| entries.into_iter().collect())
    }
}

impl WeatherSeries {
    /// Creates an empty series.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored days.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no days are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if a record is stored for `date`.
    #[must_use]
    pub fn contains(&self, date: &ShortDate) -> bool {
        self.0.contains_key(date)
    }

    /// Returns the record stored for `date`.
    #[must_use]
    pub fn get(&self, date: &ShortDate) -> Option<&WeatherRecord> {
        self.0.get(date)
    }

    /// Stores a record, replacing any previous one.
    ///
    /// Empty records are not stored; any previous record for that day is
    /// removed instead. Returns true if the record was stored.
    pub fn insert(&mut self, date: ShortDate, record: WeatherRecord) -> bool {
        if record.is_empty() {
            self.0.remove(&date);
            return false;
        }
        self.0.insert(date, record);
        true
    }

    /// Removes the record for `date`.
    pub fn remove(&mut self, date: &ShortDate) -> Option<WeatherRecord> {
        self.0.remove(date)
    }

    /// Stored dates in chronological order.
    pub fn dates(&self) -> impl Iterator<Item = &ShortDate> + '_ {
        self.0.keys()
    }

    /// Entries in chronological order.
    pub fn iter(&self) -> btree_map::Iter<'_, ShortDate, WeatherRecord> {
        self.0.iter()
    }

    /// Mutable entries in chronological order.
    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, ShortDate, WeatherRecord> {
        self.0.iter_mut()
    }

    /// Removes every record whose tracked parameters are all missing.
    ///
    /// Returns the removed dates.
    pub fn remove_empty(&mut self) -> Vec<ShortDate> {
        let empty: Vec<ShortDate> = self
            .0
            .iter()
            .filter(|(_, record)| record.is_empty())
            .map(|(date, _)| *date)
            .collect();
        for date in &empty {
            self.0.remove(date);
        }
        empty
    }
}

impl<'a> IntoIterator for &'a WeatherSeries {
    type Item = (&'a ShortDate, &'a WeatherRecord);
    type IntoIter = btree_map::Iter<'a, ShortDate, WeatherRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(ShortDate, WeatherRecord)> for WeatherSeries {
    fn from_iter<I: IntoIterator<Item = (ShortDate, WeatherRecord)>>(iter: I) -> Self {
        let mut series = Self::new();
        for (date, record) in iter {
            series.insert(date, record);
        }
        series
    }
}

/// Series for each year of one station.
pub type StationYearData = BTreeMap<i32, WeatherSeries>;

/// One row of a daily observation response.
///
/// Fields other than the tracked parameters are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyObservation {
    /// Observation date as sent by the source (`YYYY-mm-dd`, possibly with a time part).
    pub date: String,
    /// Maximum temperature, `null` when not measured.
    #[serde(default)]
    pub tmax: Option<f64>,
    /// Minimum temperature, `null` when not measured.
    #[serde(default)]
    pub tmin: Option<f64>,
}

impl DailyObservation {
    /// The tracked readings of this row.
    #[must_use]
    pub const fn record(&self) -> WeatherRecord {
        WeatherRecord::new(self.tmax, self.tmin)
    }

    /// Calendar year of the observation.
    pub fn year(&self) -> Result<i32> {
        use chrono::Datelike;
        parse_full_date(&self.date).map(|d| d.year())
    }

    /// Short date key of the observation.
    pub fn short_date(&self) -> Result<ShortDate> {
        ShortDate::from_full_date(&self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> ShortDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_record_empty() {
        assert!(WeatherRecord::default().is_empty());
        assert!(!WeatherRecord::new(Some(1.0), None).is_empty());

        let mut record = WeatherRecord::new(Some(20.0), Some(10.0));
        record.set(Parameter::Tmax, None);
        record.set(Parameter::Tmin, None);
        assert!(record.is_empty());
    }

    #[test]
    fn test_series_rejects_empty_records() {
        let mut series = WeatherSeries::new();
        assert!(series.insert(date("03-14"), WeatherRecord::new(Some(12.0), None)));
        assert!(!series.insert(date("03-15"), WeatherRecord::new(None, None)));
        assert!(!series.contains(&date("03-15")));

        // An empty replacement removes the previous record.
        assert!(!series.insert(date("03-14"), WeatherRecord::default()));
        assert!(series.is_empty());
    }

    #[test]
    fn test_series_remove_empty_after_mutation() {
        let mut series: WeatherSeries = [
            (date("01-01"), WeatherRecord::new(Some(5.0), Some(-1.0))),
            (date("01-02"), WeatherRecord::new(Some(6.0), None)),
        ]
        .into_iter()
        .collect();

        for (_, record) in series.iter_mut() {
            record.set(Parameter::Tmax, None);
        }

        let removed = series.remove_empty();
        assert_eq!(removed, vec![date("01-02")]);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_series_json_shape() {
        let mut series = WeatherSeries::new();
        series.insert(date("02-01"), WeatherRecord::new(Some(3.5), None));
        series.insert(date("01-31"), WeatherRecord::new(Some(2.0), Some(-4.0)));

        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(
            json,
            r#"{"01-31":{"tmax":2.0,"tmin":-4.0},"02-01":{"tmax":3.5}}"#
        );

        let parsed: WeatherSeries =
            serde_json::from_str(r#"{"02-01":{"tmax":3.5,"tmin":null},"02-02":{}}"#).unwrap();
        assert_eq!(
            parsed.get(&date("02-01")),
            Some(&WeatherRecord::new(Some(3.5), None))
        );
        assert!(!parsed.contains(&date("02-02")));
    }

    #[test]
    fn test_observation_parsing() {
        let row: DailyObservation = serde_json::from_str(
            r#"{"date":"2021-03-15","tavg":4.1,"tmin":null,"tmax":9.0,"prcp":0.2}"#,
        )
        .unwrap();
        assert_eq!(row.short_date().unwrap(), date("03-15"));
        assert_eq!(row.year().unwrap(), 2021);
        assert_eq!(row.record(), WeatherRecord::new(Some(9.0), None));
    }

    #[test]
    fn test_parameter_names() {
        assert_eq!("tmax".parse::<Parameter>().unwrap(), Parameter::Tmax);
        assert!("prcp".parse::<Parameter>().is_err());
        assert_eq!(Parameter::Tmin.to_string(), "tmin");
    }
}
