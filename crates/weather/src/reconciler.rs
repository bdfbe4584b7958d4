//! Cache reconciliation for station-year series.
//!
//! Each requested station and year walks the states of [`FetchState`]:
//! the in-memory cache is checked first, then the persistent store, and only
//! the days still missing are requested from the remote source.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, instrument, warn};

use weather_core::{
    DailyDataSource, DailyObservation, DateRange, OutlierFilter, Result, SeriesStore, ShortDate,
    Station, Stations, WeatherError, WeatherSeries, find_missing_ranges,
    find_missing_ranges_bounded, store_key,
};

use crate::config::ReconcilerConfig;
use crate::session::Session;

/// Steps of a station-year fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchState {
    /// Gap-detect the in-memory series.
    CheckMemory,
    /// Fill gaps from the persistent store.
    CheckPersistent,
    /// Request every remaining gap from the remote source.
    FetchRemote,
    /// Merge rows, filter outliers and write the blob back.
    MergeAndPersist,
    /// Finished.
    Done,
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CheckMemory => "check-memory",
            Self::CheckPersistent => "check-persistent",
            Self::FetchRemote => "fetch-remote",
            Self::MergeAndPersist => "merge-and-persist",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// A station-year or gap that could not be filled.
#[derive(Debug)]
pub struct FetchFailure {
    /// Station id.
    pub station_id: String,
    /// Requested year.
    pub year: i32,
    /// The gap whose request failed; `None` when the whole station-year was
    /// rejected (persistent store failure).
    pub gap: Option<DateRange>,
    /// Cause.
    pub error: WeatherError,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.gap {
            Some(gap) => write!(f, "{}-{} [{gap}]: {}", self.station_id, self.year, self.error),
            None => write!(f, "{}-{}: {}", self.station_id, self.year, self.error),
        }
    }
}

/// A station-year rejected by the persistent store, with the gap failures
/// recorded before the rejection.
#[derive(Debug)]
struct Rejection {
    error: WeatherError,
    failures: Vec<FetchFailure>,
}

impl From<WeatherError> for Rejection {
    fn from(error: WeatherError) -> Self {
        Self {
            error,
            failures: Vec::new(),
        }
    }
}

/// What a station-year fetch did.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Station id.
    pub station_id: String,
    /// Requested year.
    pub year: i32,
    /// Gaps found in the in-memory series.
    pub memory_gaps: Vec<DateRange>,
    /// Days copied from the persistent store into memory.
    pub copied_from_store: usize,
    /// Gaps requested from the remote source.
    pub remote_gaps: Vec<DateRange>,
    /// Rows returned by successful remote requests.
    pub rows_received: usize,
    /// Whether the blob was written back.
    pub persisted: bool,
    /// Days cached in memory when the fetch finished.
    pub cached_days: usize,
    /// Gap requests that failed.
    pub failures: Vec<FetchFailure>,
}

impl FetchOutcome {
    fn new(station_id: &str, year: i32) -> Self {
        Self {
            station_id: station_id.to_string(),
            year,
            ..Default::default()
        }
    }

    /// True when the series was already complete in memory.
    #[must_use]
    pub fn from_memory(&self) -> bool {
        self.memory_gaps.is_empty()
    }
}

/// Outcomes and failures of a whole session.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// One outcome per station-year that was not rejected.
    pub outcomes: Vec<FetchOutcome>,
    /// Rejected station-years and failed gap requests.
    pub failures: Vec<FetchFailure>,
}

impl FetchReport {
    /// True if nothing failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the outcomes, or the first failure's error.
    ///
    /// # Errors
    /// Returns the error of the first recorded failure.
    pub fn into_result(self) -> Result<Vec<FetchOutcome>> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(failure.error),
            None => Ok(self.outcomes),
        }
    }
}

/// Fills station-year series from memory, the persistent store and a remote
/// source, in that order.
///
/// The in-memory cache is shared behind a [`RwLock`]; the lock is only held
/// while a state works on the cache and never across a store or network call.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use weather::{FetchReconciler, MeteostatClient, MemoryStore, Session};
///
/// let reconciler = FetchReconciler::new(
///     Arc::new(MeteostatClient::new()),
///     Arc::new(MemoryStore::new()),
/// );
/// let session = Session::today().with_station("10637").with_year(2023);
/// let report = reconciler.fetch_session(&session).await;
/// ```
pub struct FetchReconciler {
    source: Arc<dyn DailyDataSource>,
    store: Arc<dyn SeriesStore>,
    stations: RwLock<Stations>,
    config: ReconcilerConfig,
}

impl fmt::Debug for FetchReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchReconciler")
            .field("source", &self.source.name())
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FetchReconciler {
    /// Create a reconciler with an empty in-memory cache and default settings.
    #[must_use]
    pub fn new(source: Arc<dyn DailyDataSource>, store: Arc<dyn SeriesStore>) -> Self {
        Self {
            source,
            store,
            stations: RwLock::new(Stations::new()),
            config: ReconcilerConfig::default(),
        }
    }

    /// Create a reconciler backed by Meteostat.
    #[cfg(feature = "meteostat")]
    #[must_use]
    pub fn meteostat(store: Arc<dyn SeriesStore>) -> Self {
        Self::new(Arc::new(weather_meteostat::MeteostatClient::new()), store)
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the outlier filter applied after merges.
    #[must_use]
    pub fn with_outliers(mut self, outliers: OutlierFilter) -> Self {
        self.config.outliers = outliers;
        self
    }

    /// Enable or disable the completed-window shortcut.
    #[must_use]
    pub fn with_assume_contiguous_cache(mut self, enabled: bool) -> Self {
        self.config.assume_contiguous_cache = enabled;
        self
    }

    /// Start from an existing in-memory cache.
    #[must_use]
    pub fn with_stations(mut self, stations: Stations) -> Self {
        self.stations = RwLock::new(stations);
        self
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Read access to the in-memory cache.
    pub async fn stations(&self) -> RwLockReadGuard<'_, Stations> {
        self.stations.read().await
    }

    /// Add or replace a station's metadata and cached data.
    pub async fn register_station(&self, id: impl Into<String>, station: Station) {
        let id = id.into();
        debug!(station = %id, "Registering station");
        self.stations.write().await.upsert(id, station);
    }

    /// Fill every station-year of `session` over its request window.
    ///
    /// All station-years run concurrently and every fetch settles before this
    /// returns; failures are collected in the report. With
    /// `assume_contiguous_cache`, gaps ending on the window's last day are
    /// trusted once memory holds that day.
    pub async fn fetch_session(&self, session: &Session) -> FetchReport {
        let window = session.request_window();
        let boundary = self.config.assume_contiguous_cache.then_some(window.end);
        debug!(
            stations = session.stations().len(),
            window = %window,
            "Fetching session"
        );

        let tasks = session.station_years().map(|(station_id, year)| async move {
            let result = self.fill(station_id, year, window, boundary).await;
            (station_id, year, result)
        });

        let mut report = FetchReport::default();
        for (station_id, year, result) in join_all(tasks).await {
            match result {
                Ok(mut outcome) => {
                    report.failures.append(&mut outcome.failures);
                    report.outcomes.push(outcome);
                }
                Err(Rejection {
                    error,
                    mut failures,
                }) => {
                    warn!(station = station_id, year, error = %error, "Station-year rejected");
                    report.failures.append(&mut failures);
                    report.failures.push(FetchFailure {
                        station_id: station_id.to_string(),
                        year,
                        gap: None,
                        error,
                    });
                }
            }
        }
        report
    }

    /// Fill one station-year over `range`, scanning every day of it.
    ///
    /// # Errors
    /// Returns an error if the persistent store cannot be read or written.
    /// Failed remote requests do not fail the call; they are listed in
    /// [`FetchOutcome::failures`] and leave their gap for a later retry.
    pub async fn fetch_station_year(
        &self,
        station_id: &str,
        year: i32,
        range: DateRange,
    ) -> Result<FetchOutcome> {
        self.fill(station_id, year, range, None)
            .await
            .map_err(|rejection| rejection.error)
    }

    /// `boundary` is the window's last day when the contiguous-cache shortcut
    /// is enabled.
    #[instrument(skip(self, range, boundary), fields(range = %range))]
    async fn fill(
        &self,
        station_id: &str,
        year: i32,
        range: DateRange,
        boundary: Option<ShortDate>,
    ) -> std::result::Result<FetchOutcome, Rejection> {
        let key = store_key(station_id, year);
        let mut outcome = FetchOutcome::new(station_id, year);
        let mut gaps: Vec<DateRange> = Vec::new();
        let mut blob = WeatherSeries::new();
        let mut rows: Vec<DailyObservation> = Vec::new();
        let mut state = FetchState::CheckMemory;

        loop {
            debug!(state = %state, gaps = gaps.len(), "Fetch state");
            state = match state {
                FetchState::CheckMemory => {
                    let mut stations = self.stations.write().await;
                    let memory = stations.station_year_data_mut(station_id, year);
                    gaps = find_missing_ranges(year, range, memory, None);
                    outcome.memory_gaps.clone_from(&gaps);
                    if gaps.is_empty() {
                        debug!("Memory hit");
                        FetchState::Done
                    } else {
                        FetchState::CheckPersistent
                    }
                }
                FetchState::CheckPersistent => {
                    blob = self.store.get(&key).await?.unwrap_or_default();
                    if blob.is_empty() {
                        debug!("Store miss");
                        FetchState::FetchRemote
                    } else {
                        let mut stations = self.stations.write().await;
                        let memory = stations.station_year_data_mut(station_id, year);
                        let before = memory.len();
                        let mut remaining = Vec::new();
                        for gap in &gaps {
                            remaining.extend(fill_from_store(year, *gap, &blob, memory, boundary));
                        }
                        outcome.copied_from_store = memory.len() - before;
                        gaps = remaining;
                        debug!(copied = outcome.copied_from_store, "Filled from store");
                        if gaps.is_empty() {
                            FetchState::Done
                        } else {
                            FetchState::FetchRemote
                        }
                    }
                }
                FetchState::FetchRemote => {
                    outcome.remote_gaps.clone_from(&gaps);
                    rows = self.fetch_gaps(station_id, year, &gaps, &mut outcome).await;
                    outcome.rows_received = rows.len();
                    if rows.is_empty() {
                        FetchState::Done
                    } else {
                        FetchState::MergeAndPersist
                    }
                }
                FetchState::MergeAndPersist => {
                    self.merge(station_id, year, &rows, &mut blob).await;
                    if let Err(error) = self.store.put(&key, &blob).await {
                        return Err(Rejection {
                            error,
                            failures: std::mem::take(&mut outcome.failures),
                        });
                    }
                    outcome.persisted = true;
                    FetchState::Done
                }
                FetchState::Done => break,
            };
        }

        outcome.cached_days = self
            .stations
            .read()
            .await
            .station_year_data(station_id, year)
            .map_or(0, WeatherSeries::len);
        Ok(outcome)
    }

    /// Requests all gaps concurrently and returns the rows of the successful ones.
    async fn fetch_gaps(
        &self,
        station_id: &str,
        year: i32,
        gaps: &[DateRange],
        outcome: &mut FetchOutcome,
    ) -> Vec<DailyObservation> {
        let requests = gaps.iter().filter_map(|gap| {
            let (start, end) = gap.resolve(year)?;
            Some(async move {
                debug!(gap = %gap, "Requesting gap");
                (*gap, self.source.fetch_daily(station_id, start, end).await)
            })
        });

        let mut rows = Vec::new();
        for (gap, result) in join_all(requests).await {
            match result {
                Ok(mut received) => rows.append(&mut received),
                Err(error) => {
                    warn!(gap = %gap, error = %error, "Gap request failed");
                    outcome.failures.push(FetchFailure {
                        station_id: station_id.to_string(),
                        year,
                        gap: Some(gap),
                        error,
                    });
                }
            }
        }
        rows
    }

    /// Merges remote rows into memory, filters outliers and syncs `blob`.
    async fn merge(
        &self,
        station_id: &str,
        year: i32,
        rows: &[DailyObservation],
        blob: &mut WeatherSeries,
    ) {
        let mut stations = self.stations.write().await;
        let memory = stations.station_year_data_mut(station_id, year);

        for row in rows {
            match (row.year(), row.short_date()) {
                (Ok(row_year), Ok(date)) if row_year == year => {
                    memory.insert(date, row.record());
                }
                (Ok(_), Ok(_)) => {
                    debug!(date = %row.date, "Ignoring row outside the requested year");
                }
                (Err(error), _) | (_, Err(error)) => {
                    warn!(date = %row.date, error = %error, "Ignoring malformed row");
                }
            }
        }

        self.config.outliers.apply(memory);
        for date in memory.remove_empty() {
            blob.remove(&date);
        }
        for (date, record) in memory.iter() {
            blob.insert(*date, *record);
        }
        debug!(days = memory.len(), "Merged remote rows");
    }
}

fn fill_from_store(
    year: i32,
    gap: DateRange,
    blob: &WeatherSeries,
    memory: &mut WeatherSeries,
    boundary: Option<ShortDate>,
) -> Vec<DateRange> {
    match boundary {
        Some(boundary) => find_missing_ranges_bounded(year, gap, blob, Some(memory), boundary),
        None => find_missing_ranges(year, gap, blob, Some(memory)),
    }
}
