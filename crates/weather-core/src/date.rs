//! Calendar keys and inclusive day ranges.
//!
//! Weather series are keyed by [`ShortDate`] (`"mm-dd"`), a day within an
//! implicit year. [`DateRange`] is an inclusive pair of short dates that is
//! resolved against a concrete year when the individual days are needed.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, WeatherError};

/// A calendar day within an implicit year, written as `"mm-dd"`.
///
/// Ordering is chronological, which matches the lexicographic order of the
/// string form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortDate {
    month: u8,
    day: u8,
}

impl ShortDate {
    /// January 1st.
    pub const FIRST: Self = Self { month: 1, day: 1 };
    /// December 31st.
    pub const LAST: Self = Self { month: 12, day: 31 };

    /// Creates a short date, validating it against a leap year so that
    /// `02-29` is accepted.
    pub fn new(month: u32, day: u32) -> Result<Self> {
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(WeatherError::InvalidDate(format!("{month:02}-{day:02}")));
        }
        Ok(Self {
            month: month as u8,
            day: day as u8,
        })
    }

    /// Extracts the short date from a full `YYYY-mm-dd` string.
    ///
    /// Anything after the first ten characters (e.g. a time part) is ignored.
    pub fn from_full_date(date: &str) -> Result<Self> {
        parse_full_date(date).map(Self::from)
    }

    /// Month number (1-12).
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month as u32
    }

    /// Day of the month (1-31).
    #[must_use]
    pub const fn day(&self) -> u32 {
        self.day as u32
    }

    /// Resolves this day in the given year, `None` for `02-29` outside leap years.
    #[must_use]
    pub fn in_year(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month(), self.day())
    }
}

impl From<NaiveDate> for ShortDate {
    fn from(date: NaiveDate) -> Self {
        Self {
            month: date.month() as u8,
            day: date.day() as u8,
        }
    }
}

impl fmt::Display for ShortDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

impl FromStr for ShortDate {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || WeatherError::InvalidDate(s.to_string());
        let (month, day) = s.split_once('-').ok_or_else(invalid)?;
        if month.len() != 2 || day.len() != 2 {
            return Err(invalid());
        }
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        let day = day.parse::<u32>().map_err(|_| invalid())?;
        Self::new(month, day)
    }
}

impl TryFrom<String> for ShortDate {
    type Error = WeatherError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ShortDate> for String {
    fn from(date: ShortDate) -> Self {
        date.to_string()
    }
}

/// Parses the `YYYY-mm-dd` prefix of a date or datetime string.
pub fn parse_full_date(date: &str) -> Result<NaiveDate> {
    let prefix = date
        .get(..10)
        .ok_or_else(|| WeatherError::InvalidDate(date.to_string()))?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
        .map_err(|e| WeatherError::InvalidDate(format!("{date}: {e}")))
}

/// An inclusive range of short dates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range.
    pub start: ShortDate,
    /// Last day of the range (inclusive).
    pub end: ShortDate,
}

impl DateRange {
    /// Creates a range, rejecting a start after the end.
    pub fn new(start: ShortDate, end: ShortDate) -> Result<Self> {
        if start > end {
            return Err(WeatherError::InvalidParameter(format!(
                "Range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parses a range from two `"mm-dd"` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(start.parse()?, end.parse()?)
    }

    /// A range covering one day.
    #[must_use]
    pub const fn single(date: ShortDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// `01-01` through `12-31`.
    #[must_use]
    pub const fn full_year() -> Self {
        Self {
            start: ShortDate::FIRST,
            end: ShortDate::LAST,
        }
    }

    /// Returns true if `date` lies within the range.
    #[must_use]
    pub fn contains(&self, date: ShortDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Resolves the range bounds in a concrete year.
    ///
    /// `02-29` outside a leap year moves to `03-01` as a start and to `02-28`
    /// as an end. Returns `None` when nothing of the range exists in that year.
    #[must_use]
    pub fn resolve(&self, year: i32) -> Option<(NaiveDate, NaiveDate)> {
        let start = match self.start.in_year(year) {
            Some(date) => date,
            None => NaiveDate::from_ymd_opt(year, 3, 1)?,
        };
        let end = match self.end.in_year(year) {
            Some(date) => date,
            None => NaiveDate::from_ymd_opt(year, 2, 28)?,
        };
        (start <= end).then_some((start, end))
    }

    /// Every day of the range in the given year, in chronological order.
    #[must_use]
    pub fn days(&self, year: i32) -> Vec<ShortDate> {
        match self.resolve(year) {
            Some((start, end)) => start
                .iter_days()
                .take_while(|day| *day <= end)
                .map(ShortDate::from)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of days in the range for the given year.
    #[must_use]
    pub fn len_in(&self, year: i32) -> usize {
        self.resolve(year)
            .map_or(0, |(start, end)| (end - start).num_days() as usize + 1)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
