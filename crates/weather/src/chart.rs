//! Chart datasets built from the in-memory cache.
//!
//! Charts compare the same days across years, so every dataset of a chart
//! shares one label list: the dates present in every selected year
//! ([`common_dates`]).

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::{Column, DataFrame};
use serde::Serialize;
use weather_core::{Parameter, Result, ShortDate, Stations, WeatherError};

use crate::session::Session;

/// Station id used to colour single-station charts, so a year keeps its
/// colour whichever station is shown.
pub const SINGLE_STATION_COLOR_SEED: &str = "27500";

/// Dates present in every selected year.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommonDates {
    /// Per station, the sorted dates cached for all selected years.
    pub per_station: BTreeMap<String, Vec<ShortDate>>,
    /// Sorted dates common to every selected station.
    pub all_stations: Vec<ShortDate>,
}

/// Intersects cached dates across the session's years, then across stations.
#[must_use]
pub fn common_dates(stations: &Stations, session: &Session) -> CommonDates {
    let mut result = CommonDates::default();
    let mut across: Option<BTreeSet<ShortDate>> = None;

    for id in session.stations() {
        let mut dates: Option<BTreeSet<ShortDate>> = None;
        for year in session.years() {
            let year_dates: BTreeSet<ShortDate> =
                stations.station_year_dates(id, year).into_iter().collect();
            dates = Some(match dates {
                Some(acc) => acc.intersection(&year_dates).copied().collect(),
                None => year_dates,
            });
        }
        let dates = dates.unwrap_or_default();

        across = Some(match across {
            Some(acc) => acc.intersection(&dates).copied().collect(),
            None => dates.clone(),
        });
        result
            .per_station
            .insert(id.clone(), dates.into_iter().collect());
    }

    result.all_stations = across.unwrap_or_default().into_iter().collect();
    result
}

/// One line of a chart: a parameter of a station in a year.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    /// Legend text.
    pub label: String,
    /// One value per chart label; `None` where nothing is cached.
    pub data: Vec<Option<f64>>,
    /// Line colour (`#RRGGBB`).
    pub border_color: String,
    /// Fill colour (`#RRGGBB`).
    pub background_color: String,
    /// Station id.
    pub station_id: String,
    /// Station name at the time the dataset was built.
    pub station_name: String,
    /// Year.
    pub year: i32,
    /// Parameter.
    pub weather_parameter: Parameter,
}

impl ChartDataset {
    fn build(
        stations: &Stations,
        station_id: &str,
        year: i32,
        parameter: Parameter,
        dates: &[ShortDate],
        combined: bool,
    ) -> Self {
        let station_name = stations.name_or_id(station_id).to_string();
        let year_parameter = format!("{year} {}", parameter_label(parameter));
        let (label, color) = if combined {
            (
                format!("{station_name} {year_parameter}"),
                series_color(station_id, &year_parameter),
            )
        } else {
            (
                year_parameter.clone(),
                series_color(SINGLE_STATION_COLOR_SEED, &year_parameter),
            )
        };

        Self {
            label,
            data: dates
                .iter()
                .map(|date| stations.weather_parameter(station_id, year, date, parameter))
                .collect(),
            border_color: color.clone(),
            background_color: color,
            station_id: station_id.to_string(),
            station_name,
            year,
            weather_parameter: parameter,
        }
    }

    /// Column name used by [`ChartData::to_frame`].
    #[must_use]
    pub fn column_name(&self) -> String {
        format!("{}-{}-{}", self.station_id, self.year, self.weather_parameter)
    }
}

fn parameter_label(parameter: Parameter) -> &'static str {
    match parameter {
        Parameter::Tmax => "High",
        Parameter::Tmin => "Low",
    }
}

/// Labels and datasets of one chart.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChartData {
    /// Sorted short dates shared by every dataset.
    pub labels: Vec<ShortDate>,
    /// One dataset per parameter and year (and station, when combined).
    pub datasets: Vec<ChartDataset>,
}

impl ChartData {
    /// Chart of one station: a dataset per selected parameter and year.
    #[must_use]
    pub fn for_station(
        stations: &Stations,
        session: &Session,
        station_id: &str,
        dates: &[ShortDate],
    ) -> Self {
        let datasets = session
            .parameters()
            .iter()
            .flat_map(|&parameter| {
                session.years().map(move |year| {
                    ChartDataset::build(stations, station_id, year, parameter, dates, false)
                })
            })
            .collect();
        Self {
            labels: dates.to_vec(),
            datasets,
        }
    }

    /// Chart of every selected station; labels carry the station name.
    #[must_use]
    pub fn combined(stations: &Stations, session: &Session, dates: &[ShortDate]) -> Self {
        let mut datasets = Vec::new();
        for station_id in session.stations() {
            for &parameter in session.parameters() {
                for year in session.years() {
                    datasets.push(ChartDataset::build(
                        stations, station_id, year, parameter, dates, true,
                    ));
                }
            }
        }
        Self {
            labels: dates.to_vec(),
            datasets,
        }
    }

    /// True if the chart's last label is one of `dates`.
    #[must_use]
    pub fn is_last_date(&self, dates: &[ShortDate]) -> bool {
        self.labels.last().is_some_and(|last| dates.contains(last))
    }

    /// Exports the chart as a frame: a `date` column plus one column per dataset.
    ///
    /// # Errors
    /// Returns an error if the frame cannot be assembled.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.datasets.len() + 1);
        columns.push(Column::new(
            "date".into(),
            self.labels.iter().map(ToString::to_string).collect::<Vec<_>>(),
        ));
        for dataset in &self.datasets {
            columns.push(Column::new(
                dataset.column_name().into(),
                dataset.data.clone(),
            ));
        }
        DataFrame::new(columns).map_err(|e| WeatherError::Other(e.to_string()))
    }
}

/// Deterministic `#RRGGBB` colour for a station and a `"<year> <label>"` string.
///
/// A djb2-style hash of `"<station>-<label>"` is bit-mixed and split into
/// channels; the year shifts red and green and the station id length shifts
/// blue, so neighbouring years get clearly different colours.
#[must_use]
pub fn series_color(station_id: &str, label: &str) -> String {
    let key = format!("{station_id}-{label}");
    let mut hash: i32 = 0;
    for unit in key.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }

    hash = ((hash >> 16) ^ hash).wrapping_mul(0x045d_9f3b);
    hash = ((hash >> 16) ^ hash).wrapping_mul(0x045d_9f3b);
    hash ^= hash >> 16;

    let year = leading_number(label);
    let id_len = i64::try_from(station_id.encode_utf16().count()).unwrap_or(0);
    let r = (i64::from((hash & 0x00FF_0000) >> 16) + year.rem_euclid(256)) % 256;
    let g = (i64::from((hash & 0x0000_FF00) >> 8) + (year * 2).rem_euclid(256)) % 256;
    let b = (i64::from(hash & 0x0000_00FF) + (id_len * 5).rem_euclid(256)) % 256;

    format!("#{r:02X}{g:02X}{b:02X}")
}

fn leading_number(text: &str) -> i64 {
    let digits: String = text
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}
