//! Request context for one fetch-and-render cycle.

use std::collections::BTreeSet;

use chrono::{Datelike, Local, NaiveDate};
use weather_core::{DateRange, Parameter, ShortDate};

const ALL_PARAMETERS: &[Parameter] = &Parameter::ALL;

/// Stations, years and parameters selected for one fetch cycle.
///
/// Stations keep their selection order and are deduplicated. Years are kept
/// in ascending order. When no parameter is selected, every tracked
/// parameter is used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    stations: Vec<String>,
    years: BTreeSet<i32>,
    parameters: Vec<Parameter>,
    today: NaiveDate,
}

impl Session {
    /// Creates an empty session evaluated as of `today`.
    #[must_use]
    pub const fn new(today: NaiveDate) -> Self {
        Self {
            stations: Vec::new(),
            years: BTreeSet::new(),
            parameters: Vec::new(),
            today,
        }
    }

    /// Creates an empty session evaluated as of the local date.
    #[must_use]
    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }

    /// Adds a station.
    #[must_use]
    pub fn with_station(mut self, id: impl Into<String>) -> Self {
        self.add_station(id);
        self
    }

    /// Adds several stations.
    #[must_use]
    pub fn with_stations<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            self.add_station(id);
        }
        self
    }

    /// Adds a year.
    #[must_use]
    pub fn with_year(mut self, year: i32) -> Self {
        self.years.insert(year);
        self
    }

    /// Adds several years.
    #[must_use]
    pub fn with_years(mut self, years: impl IntoIterator<Item = i32>) -> Self {
        self.years.extend(years);
        self
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        if !self.parameters.contains(&parameter) {
            self.parameters.push(parameter);
        }
        self
    }

    /// Adds several parameters.
    #[must_use]
    pub fn with_parameters(self, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        parameters
            .into_iter()
            .fold(self, |session, parameter| session.with_parameter(parameter))
    }

    fn add_station(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !self.stations.contains(&id) {
            self.stations.push(id);
        }
    }

    /// Selected station ids in selection order.
    #[must_use]
    pub fn stations(&self) -> &[String] {
        &self.stations
    }

    /// Selected years in ascending order.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.iter().copied()
    }

    /// Selected parameters, or every tracked parameter when none is selected.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        if self.parameters.is_empty() {
            ALL_PARAMETERS
        } else {
            self.parameters.as_slice()
        }
    }

    /// The date the session is evaluated at.
    #[must_use]
    pub const fn today_date(&self) -> NaiveDate {
        self.today
    }

    /// Every selected (station, year) pair, station-major.
    pub fn station_years(&self) -> impl Iterator<Item = (&str, i32)> + '_ {
        self.stations
            .iter()
            .flat_map(move |id| self.years().map(move |year| (id.as_str(), year)))
    }

    /// The short-date window requested for every year.
    ///
    /// Starts on `01-01`. Ends today when the current year is selected, so all
    /// years cover the same span; otherwise ends on `12-31`.
    #[must_use]
    pub fn request_window(&self) -> DateRange {
        let end = if self.years.contains(&self.today.year()) {
            ShortDate::from(self.today)
        } else {
            ShortDate::LAST
        };
        DateRange {
            start: ShortDate::FIRST,
            end,
        }
    }
}
