//! Source traits for fetching observations and station metadata.
//!
//! This module defines the remote collaborators of the cache:
//!
//! - [`DataSource`] - Base trait for all sources
//! - [`DailyDataSource`] - Daily observations for a station and date span
//! - [`StationDirectory`] - Station and place lookup

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::{error::Result, types::DailyObservation};

/// Base trait for all remote sources.
pub trait DataSource: Send + Sync + Debug {
    /// Returns the name of this source (e.g., "Meteostat").
    fn name(&self) -> &str;

    /// Returns a description of this source.
    fn description(&self) -> &str;
}

/// Source of daily observations.
#[async_trait]
pub trait DailyDataSource: DataSource {
    /// Fetches the daily rows of a station between two dates, inclusive.
    ///
    /// Rows may carry `null` readings; an empty list means the source has no
    /// data for the span.
    async fn fetch_daily(
        &self,
        station_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyObservation>>;
}

/// A named place returned by a search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaceSummary {
    /// Place identifier (e.g., "tokyo").
    pub id: String,
    /// Display name.
    pub name: String,
    /// ISO country code.
    pub country: String,
    /// Region code.
    #[serde(default)]
    pub region: Option<String>,
}

/// A station returned by a search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationSummary {
    /// Station identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// ISO country code.
    pub country: String,
    /// Region code.
    #[serde(default)]
    pub region: Option<String>,
    /// Whether the station still reports.
    #[serde(default)]
    pub active: bool,
}

/// Places and stations matching a search.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Matching places.
    #[serde(default)]
    pub places: Vec<PlaceSummary>,
    /// Matching stations.
    #[serde(default)]
    pub stations: Vec<StationSummary>,
}

/// Geographic position of a place.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Elevation in metres.
    #[serde(default)]
    pub elevation: Option<f64>,
}

/// The station closest to a position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NearbyStation {
    /// Station identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Elevation in metres.
    #[serde(default)]
    pub elevation: Option<f64>,
    /// Whether the station still reports.
    #[serde(default)]
    pub active: bool,
    /// Distance from the requested position in metres.
    #[serde(default)]
    pub distance: Option<f64>,
}

/// Lookup of stations and places.
#[async_trait]
pub trait StationDirectory: DataSource {
    /// Searches places and stations by free text.
    async fn search(&self, query: &str) -> Result<SearchResults>;

    /// Returns the position of a place.
    async fn place_location(&self, country: &str, place_id: &str) -> Result<Location>;

    /// Returns the station nearest to a position, if any.
    async fn nearest_station(&self, latitude: f64, longitude: f64)
    -> Result<Option<NearbyStation>>;
}
