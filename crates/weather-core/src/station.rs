//! Stations and the in-memory per-station, per-year cache.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::sync::LazyLock;

use crate::date::ShortDate;
use crate::types::{Parameter, StationYearData, WeatherSeries};

/// Everything from the first punctuation or separator character onward.
static NAME_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{P}\p{Z}]+.*$").unwrap_or_else(|e| panic!("invalid name pattern: {e}"))
});

/// A weather station and its cached observations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Short display name.
    pub name: String,
    /// ISO country code.
    pub country: String,
    /// Region code, if the source provides one.
    pub region: Option<String>,
    /// Whether the station still reports.
    pub active: bool,
    /// Cached series keyed by year.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: StationYearData,
}

impl Station {
    /// Creates a station without cached data.
    ///
    /// The name is shortened to the text before its first punctuation or
    /// whitespace character, e.g. `"Tokyo / Haneda"` becomes `"Tokyo"`.
    #[must_use]
    pub fn new(
        name: &str,
        country: impl Into<String>,
        region: Option<String>,
        active: bool,
    ) -> Self {
        Self {
            name: short_name(name),
            country: country.into(),
            region,
            active,
            data: StationYearData::new(),
        }
    }

    /// Placeholder for a station referenced only by id.
    #[must_use]
    pub fn unnamed(id: &str) -> Self {
        Self {
            name: id.to_string(),
            ..Default::default()
        }
    }
}

fn short_name(name: &str) -> String {
    NAME_TAIL.replace(name, "").into_owned()
}

/// Field used to order [`Stations::sorted_by`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StationSortKey {
    /// Station name.
    Name,
    /// Country code.
    Country,
    /// Region code; stations without a region sort first.
    Region,
    /// Active flag; inactive stations sort first.
    Active,
}

/// In-memory cache of stations keyed by station id.
///
/// This is the authoritative first tier of the cache: series obtained through
/// [`Stations::station_year_data_mut`] are stored in place and later reads see
/// every mutation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stations {
    stations: BTreeMap<String, Station>,
}

impl Stations {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of known stations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Returns true if no station is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Inserts or replaces a station.
    pub fn upsert(&mut self, id: impl Into<String>, station: Station) {
        self.stations.insert(id.into(), station);
    }

    /// Removes a station; returns true if it was present.
    pub fn delete(&mut self, id: &str) -> bool {
        self.stations.remove(id).is_some()
    }

    /// Returns a station by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Station> {
        self.stations.get(id)
    }

    /// `(id, station)` pairs ordered by id.
    pub fn entries(&self) -> btree_map::Iter<'_, String, Station> {
        self.stations.iter()
    }

    /// `(id, station)` pairs ordered by the given field, ties broken by id.
    #[must_use]
    pub fn sorted_by(&self, key: StationSortKey) -> Vec<(&str, &Station)> {
        let mut entries: Vec<(&str, &Station)> = self
            .stations
            .iter()
            .map(|(id, station)| (id.as_str(), station))
            .collect();
        entries.sort_by(|(_, a), (_, b)| match key {
            StationSortKey::Name => a.name.cmp(&b.name),
            StationSortKey::Country => a.country.cmp(&b.country),
            StationSortKey::Region => a.region.cmp(&b.region),
            StationSortKey::Active => a.active.cmp(&b.active),
        });
        entries
    }

    /// A copy restricted to the listed ids; an empty filter copies everything.
    ///
    /// Unknown ids are skipped.
    #[must_use]
    pub fn filtered<'a, I>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut ids = ids.into_iter().peekable();
        if ids.peek().is_none() {
            return self.clone();
        }
        let stations = ids
            .filter_map(|id| {
                self.stations
                    .get(id)
                    .map(|station| (id.to_string(), station.clone()))
            })
            .collect();
        Self { stations }
    }

    /// All cached years of a station.
    #[must_use]
    pub fn station_data(&self, id: &str) -> Option<&StationYearData> {
        self.stations.get(id).map(|station| &station.data)
    }

    /// Returns true if the station has at least one cached day in `year`.
    #[must_use]
    pub fn has_station_year_data(&self, id: &str, year: i32) -> bool {
        self.station_year_data(id, year)
            .is_some_and(|series| !series.is_empty())
    }

    /// Cached series of a station and year, without creating it.
    #[must_use]
    pub fn station_year_data(&self, id: &str, year: i32) -> Option<&WeatherSeries> {
        self.stations.get(id)?.data.get(&year)
    }

    /// Cached series of a station and year, created empty on first access.
    ///
    /// An unknown station is registered under its id as a placeholder.
    pub fn station_year_data_mut(&mut self, id: &str, year: i32) -> &mut WeatherSeries {
        self.stations
            .entry(id.to_string())
            .or_insert_with(|| Station::unnamed(id))
            .data
            .entry(year)
            .or_default()
    }

    /// Cached dates of a station and year in chronological order.
    #[must_use]
    pub fn station_year_dates(&self, id: &str, year: i32) -> Vec<ShortDate> {
        self.station_year_data(id, year)
            .map(|series| series.dates().copied().collect())
            .unwrap_or_default()
    }

    /// A single cached reading.
    #[must_use]
    pub fn weather_parameter(
        &self,
        id: &str,
        year: i32,
        date: &ShortDate,
        parameter: Parameter,
    ) -> Option<f64> {
        self.station_year_data(id, year)?
            .get(date)?
            .get(parameter)
    }

    /// The station's name, or its id when unknown.
    #[must_use]
    pub fn name_or_id<'a>(&'a self, id: &'a str) -> &'a str {
        self.stations.get(id).map_or(id, |station| station.name.as_str())
    }

    /// The station's country code.
    #[must_use]
    pub fn country(&self, id: &str) -> Option<&str> {
        self.stations.get(id).map(|station| station.country.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WeatherRecord;

    fn date(s: &str) -> ShortDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_station_name_is_shortened() {
        let station = Station::new("New Tokyo Inter-National Airport", "JP", None, true);
        assert_eq!(station.name, "New");

        let station = Station::new("Zürich/Fluntern", "CH", Some("ZH".into()), true);
        assert_eq!(station.name, "Zürich");

        let station = Station::new("Tokyo", "JP", None, true);
        assert_eq!(station.name, "Tokyo");
    }

    #[test]
    fn test_get_or_create_shares_series() {
        let mut stations = Stations::new();
        stations
            .station_year_data_mut("10637", 2023)
            .insert(date("06-01"), WeatherRecord::new(Some(24.0), Some(12.0)));

        // A second access sees the first mutation.
        let series = stations.station_year_data_mut("10637", 2023);
        assert_eq!(series.len(), 1);
        series.insert(date("06-02"), WeatherRecord::new(Some(25.0), None));

        assert_eq!(
            stations.station_year_dates("10637", 2023),
            vec![date("06-01"), date("06-02")]
        );
        assert_eq!(
            stations.weather_parameter("10637", 2023, &date("06-02"), Parameter::Tmax),
            Some(25.0)
        );
        assert!(stations.has_station_year_data("10637", 2023));
        assert!(!stations.has_station_year_data("10637", 2022));
        assert_eq!(stations.name_or_id("10637"), "10637");
    }

    #[test]
    fn test_upsert_replaces_and_delete_removes() {
        let mut stations = Stations::new();
        stations.station_year_data_mut("47662", 2024);
        stations.upsert("47662", Station::new("Tokyo", "JP", None, true));

        assert_eq!(stations.name_or_id("47662"), "Tokyo");
        assert_eq!(stations.country("47662"), Some("JP"));
        assert!(stations.station_data("47662").unwrap().is_empty());

        assert!(stations.delete("47662"));
        assert!(!stations.delete("47662"));
        assert!(stations.get("47662").is_none());
    }

    #[test]
    fn test_sorted_and_filtered() {
        let mut stations = Stations::new();
        stations.upsert("3", Station::new("Berlin", "DE", None, true));
        stations.upsert("1", Station::new("Oslo", "NO", None, false));
        stations.upsert("2", Station::new("Athens", "GR", None, true));

        let by_name: Vec<&str> = stations
            .sorted_by(StationSortKey::Name)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(by_name, vec!["2", "3", "1"]);

        let ids: Vec<&String> = stations.entries().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        let subset = stations.filtered(["3", "9"]);
        assert_eq!(subset.len(), 1);
        assert!(subset.get("3").is_some());

        let all = stations.filtered(std::iter::empty());
        assert_eq!(all.len(), 3);
    }
}
