//! Detection of missing day ranges in a cached series.
//!
//! [`find_missing_ranges`] walks a requested range day by day and returns the
//! maximal runs of days absent from a series. When given a second series it
//! also copies every day it finds into it, which is how a lower cache tier
//! fills a higher one.

use crate::date::{DateRange, ShortDate};
use crate::types::WeatherSeries;

/// Returns the gaps of `range` in `available`, in chronological order.
///
/// A day is present when `available` has a record keyed by it. Consecutive
/// missing days are coalesced into one [`DateRange`]. When `copy_into` is
/// given, the record of every present day is copied into it.
///
/// An empty `available` yields the whole requested range as a single gap.
pub fn find_missing_ranges(
    year: i32,
    range: DateRange,
    available: &WeatherSeries,
    mut copy_into: Option<&mut WeatherSeries>,
) -> Vec<DateRange> {
    if available.is_empty() {
        return vec![range];
    }

    let mut gaps = Vec::new();
    let mut open: Option<(ShortDate, ShortDate)> = None;

    for day in range.days(year) {
        match available.get(&day) {
            Some(record) => {
                if let Some(target) = copy_into.as_deref_mut() {
                    target.insert(day, *record);
                }
                if let Some((start, end)) = open.take() {
                    gaps.push(DateRange { start, end });
                }
            }
            None => {
                open = Some(match open {
                    Some((start, _)) => (start, day),
                    None => (day, day),
                });
            }
        }
    }

    if let Some((start, end)) = open {
        gaps.push(DateRange { start, end });
    }
    gaps
}

/// Like [`find_missing_ranges`], but trusts a completed window.
///
/// When `copy_into` already holds `range.end` and that end is the window
/// `boundary` (today for the current year, `12-31` otherwise), the range is
/// reported complete without scanning. This is only sound when the data cached
/// in `copy_into` is contiguous from the start of the window.
pub fn find_missing_ranges_bounded(
    year: i32,
    range: DateRange,
    available: &WeatherSeries,
    copy_into: Option<&mut WeatherSeries>,
    boundary: ShortDate,
) -> Vec<DateRange> {
    if range.end == boundary
        && copy_into
            .as_deref()
            .is_some_and(|target| target.contains(&range.end))
    {
        return Vec::new();
    }
    find_missing_ranges(year, range, available, copy_into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WeatherRecord;
    use std::collections::BTreeSet;

    fn date(s: &str) -> ShortDate {
        s.parse().unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::parse(start, end).unwrap()
    }

    fn series_with(dates: &[&str]) -> WeatherSeries {
        dates
            .iter()
            .enumerate()
            .map(|(i, d)| (date(d), WeatherRecord::new(Some(i as f64), None)))
            .collect()
    }

    #[test]
    fn test_empty_series_is_one_gap() {
        let gaps = find_missing_ranges(2023, range("01-01", "12-31"), &WeatherSeries::new(), None);
        assert_eq!(gaps, vec![range("01-01", "12-31")]);
    }

    #[test]
    fn test_coalesces_missing_runs() {
        let series = series_with(&["01-01", "01-02", "01-05", "01-08"]);
        let gaps = find_missing_ranges(2023, range("01-01", "01-10"), &series, None);
        assert_eq!(
            gaps,
            vec![
                range("01-03", "01-04"),
                range("01-06", "01-07"),
                range("01-09", "01-10"),
            ]
        );
    }

    #[test]
    fn test_single_missing_day() {
        let series = series_with(&["03-01", "03-03"]);
        let gaps = find_missing_ranges(2023, range("03-01", "03-03"), &series, None);
        assert_eq!(gaps, vec![DateRange::single(date("03-02"))]);
    }

    #[test]
    fn test_fully_covered() {
        let series = series_with(&["12-30", "12-31"]);
        assert!(find_missing_ranges(2023, range("12-30", "12-31"), &series, None).is_empty());
    }

    #[test]
    fn test_copy_into_receives_every_present_day() {
        let store = series_with(&["01-01", "01-02", "01-04", "02-01"]);
        let mut memory = WeatherSeries::new();

        let gaps = find_missing_ranges(2023, range("01-01", "01-05"), &store, Some(&mut memory));

        assert_eq!(gaps, vec![range("01-03", "01-03"), range("01-05", "01-05")]);
        let copied: Vec<ShortDate> = memory.dates().copied().collect();
        assert_eq!(copied, vec![date("01-01"), date("01-02"), date("01-04")]);
        assert_eq!(memory.get(&date("01-04")), store.get(&date("01-04")));
    }

    #[test]
    fn test_gaps_and_present_days_partition_range() {
        let series = series_with(&["02-03", "02-04", "02-10", "02-27", "02-28"]);
        let requested = range("02-01", "02-28");
        let gaps = find_missing_ranges(2023, requested, &series, None);

        let mut covered = BTreeSet::new();
        for gap in &gaps {
            for day in gap.days(2023) {
                // No overlap between gaps, and no gap day is present.
                assert!(covered.insert(day));
                assert!(!series.contains(&day));
            }
        }
        for day in series.dates() {
            if requested.contains(*day) {
                assert!(covered.insert(*day));
            }
        }
        let expected: BTreeSet<ShortDate> = requested.days(2023).into_iter().collect();
        assert_eq!(covered, expected);

        // Idempotent on an unchanged series.
        assert_eq!(gaps, find_missing_ranges(2023, requested, &series, None));
    }

    #[test]
    fn test_leap_day_only_in_leap_years() {
        let series = series_with(&["02-28", "03-01"]);
        assert!(find_missing_ranges(2023, range("02-28", "03-01"), &series, None).is_empty());
        assert_eq!(
            find_missing_ranges(2024, range("02-28", "03-01"), &series, None),
            vec![DateRange::single(date("02-29"))]
        );
    }

    #[test]
    fn test_bounded_trusts_completed_window() {
        let store = series_with(&["01-01"]);
        let mut memory = series_with(&["12-31"]);
        let gaps = find_missing_ranges_bounded(
            2022,
            range("06-01", "12-31"),
            &store,
            Some(&mut memory),
            ShortDate::LAST,
        );
        assert!(gaps.is_empty());

        // A different boundary falls back to a full scan.
        let gaps = find_missing_ranges_bounded(
            2022,
            range("06-01", "12-31"),
            &store,
            Some(&mut memory),
            date("10-16"),
        );
        assert_eq!(gaps, vec![range("06-01", "12-31")]);
    }
}
