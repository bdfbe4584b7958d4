#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for historic weather caches.
//!
//! This crate provides the foundational pieces:
//!
//! - [`ShortDate`](date::ShortDate) and [`DateRange`](date::DateRange) - Calendar keys
//! - [`WeatherSeries`](types::WeatherSeries) - Daily readings of one station and year
//! - [`Stations`](station::Stations) - In-memory station cache
//! - [`find_missing_ranges`](gaps::find_missing_ranges) - Gap detection
//! - [`OutlierFilter`](outliers::OutlierFilter) - Outlier removal
//! - [`SeriesStore`](store::SeriesStore) - Persistent store abstraction
//! - [`DailyDataSource`](source::DailyDataSource) - Remote source abstraction

/// Short dates, ranges and calendar helpers.
pub mod date;
/// Error types for weather operations.
pub mod error;
/// Detection of missing day ranges.
pub mod gaps;
/// Outlier filtering methods and grouping.
pub mod outliers;
/// Source traits for observations and station metadata.
pub mod source;
/// Stations and the in-memory cache.
pub mod station;
/// Persistent store trait.
pub mod store;
/// URL template formatting.
pub mod template;
/// Core data types (Parameter, WeatherRecord, WeatherSeries, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use date::{DateRange, ShortDate, parse_full_date};
pub use error::{Result, WeatherError};
pub use gaps::{find_missing_ranges, find_missing_ranges_bounded};
pub use outliers::{Grouping, OutlierFilter, OutlierMethod, filter_outliers};
pub use source::{
    DailyDataSource, DataSource, Location, NearbyStation, PlaceSummary, SearchResults,
    StationDirectory, StationSummary,
};
pub use station::{Station, StationSortKey, Stations};
pub use store::{SeriesStore, store_key};
pub use template::format_template;
pub use types::{DailyObservation, Parameter, StationYearData, WeatherRecord, WeatherSeries};
