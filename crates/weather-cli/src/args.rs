//! Command-line argument definitions.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use weather::outliers::{
    DEFAULT_IQR_MULTIPLIER, DEFAULT_MODIFIED_ZSCORE_THRESHOLD, DEFAULT_WINDOW,
    GROUPED_ZSCORE_THRESHOLD,
};
use weather::{
    Grouping, MemoryStore, NoopStore, OutlierFilter, OutlierMethod, Parameter, ReconcilerConfig,
    SeriesStore, SqliteStore,
};

/// Historic daily weather for Meteostat stations, cached locally.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "weather-history",
    version,
    about = "Fetch, cache and compare historic daily temperatures of weather stations"
)]
pub(crate) struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub(crate) verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub(crate) quiet: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

impl Args {
    /// Default log level for the weather crates.
    pub(crate) const fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available subcommands.
#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Command {
    /// Fill the cache for stations and years, then print the series
    Fetch(FetchArgs),
    /// Search places and stations by name
    Search(SearchArgs),
    /// Find the station nearest to a place
    Nearest(NearestArgs),
}

/// Arguments of the `fetch` command.
#[derive(Debug, Clone, ClapArgs)]
pub(crate) struct FetchArgs {
    /// Station ids (comma-separated)
    #[arg(
        short,
        long,
        value_delimiter = ',',
        required = true,
        env = "WEATHER_STATIONS"
    )]
    pub(crate) stations: Vec<String>,

    /// Years (comma-separated)
    #[arg(
        short,
        long,
        value_delimiter = ',',
        required = true,
        env = "WEATHER_YEARS"
    )]
    pub(crate) years: Vec<i32>,

    /// Parameters to print (tmax, tmin); all when omitted
    #[arg(short, long, value_delimiter = ',')]
    pub(crate) parameters: Vec<Parameter>,

    /// Persistent store: `sqlite:<path>`, `memory` or `none`
    #[arg(long, default_value = "sqlite:weather.db", env = "WEATHER_STORE")]
    pub(crate) store: StoreSpec,

    /// Outlier test applied to fetched data
    #[arg(long, value_enum, default_value_t = MethodArg::Zscore)]
    pub(crate) outliers: MethodArg,

    /// Threshold of the outlier test (IQR multiplier for `iqr`)
    #[arg(long)]
    pub(crate) threshold: Option<f64>,

    /// How the series is partitioned for the outlier test
    #[arg(long, value_enum, default_value_t = GroupingArg::Window)]
    pub(crate) grouping: GroupingArg,

    /// Entries per group when grouping by window
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    pub(crate) window: usize,

    /// Trust cached series that already reach the end of the window
    #[arg(long)]
    pub(crate) contiguous_cache: bool,

    /// One chart for all stations instead of one per station
    #[arg(long)]
    pub(crate) combined: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub(crate) format: OutputFormat,

    /// Meteostat base URL
    #[arg(long, env = "METEOSTAT_URL")]
    pub(crate) base_url: Option<String>,
}

impl FetchArgs {
    /// The outlier filter selected by the arguments.
    pub(crate) fn outlier_filter(&self) -> OutlierFilter {
        let method = match self.outliers {
            MethodArg::Zscore => OutlierMethod::ZScore {
                threshold: self.threshold.unwrap_or(GROUPED_ZSCORE_THRESHOLD),
            },
            MethodArg::ModifiedZscore => OutlierMethod::ModifiedZScore {
                threshold: self.threshold.unwrap_or(DEFAULT_MODIFIED_ZSCORE_THRESHOLD),
            },
            MethodArg::Iqr => OutlierMethod::Iqr {
                k: self.threshold.unwrap_or(DEFAULT_IQR_MULTIPLIER),
            },
        };
        let grouping = match self.grouping {
            GroupingArg::Window => Grouping::Window(self.window),
            GroupingArg::Month => Grouping::Month,
            GroupingArg::Whole => Grouping::Whole,
        };
        OutlierFilter::new(method, grouping)
    }

    /// Reconciler settings selected by the arguments.
    pub(crate) fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig::new()
            .with_outliers(self.outlier_filter())
            .with_assume_contiguous_cache(self.contiguous_cache)
    }
}

/// Arguments of the `search` command.
#[derive(Debug, Clone, ClapArgs)]
pub(crate) struct SearchArgs {
    /// Free-text query
    pub(crate) query: String,

    /// Result language
    #[arg(long, default_value = "en", env = "WEATHER_LOCALE")]
    pub(crate) locale: String,
}

/// Arguments of the `nearest` command.
#[derive(Debug, Clone, ClapArgs)]
pub(crate) struct NearestArgs {
    /// Country code of the place (e.g. `jp`)
    pub(crate) country: String,

    /// Place id (e.g. `tokyo`)
    pub(crate) place: String,
}

/// Outlier tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum MethodArg {
    /// Z-score
    Zscore,
    /// Median-based modified Z-score
    ModifiedZscore,
    /// Interquartile range
    Iqr,
}

/// Outlier groupings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum GroupingArg {
    /// Fixed-size windows of consecutive entries
    Window,
    /// Calendar months
    Month,
    /// The whole series
    Whole,
}

/// Output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Table per chart
    Table,
    /// Chart data as JSON
    Json,
}

/// Persistent store selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreSpec {
    /// SQLite database file.
    Sqlite(PathBuf),
    /// Process-local store.
    Memory,
    /// No persistence.
    None,
}

impl StoreSpec {
    /// Opens the selected store.
    pub(crate) fn open(&self) -> weather::Result<Arc<dyn SeriesStore>> {
        Ok(match self {
            Self::Sqlite(path) => Arc::new(SqliteStore::new(path)?),
            Self::Memory => Arc::new(MemoryStore::new()),
            Self::None => Arc::new(NoopStore::new()),
        })
    }
}

impl FromStr for StoreSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "none" => Ok(Self::None),
            _ => match s.strip_prefix("sqlite:") {
                Some(path) if !path.is_empty() => Ok(Self::Sqlite(PathBuf::from(path))),
                _ => Err(format!(
                    "invalid store '{s}': expected 'sqlite:<path>', 'memory' or 'none'"
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_spec() {
        assert_eq!(
            "sqlite:/tmp/w.db".parse::<StoreSpec>(),
            Ok(StoreSpec::Sqlite(PathBuf::from("/tmp/w.db")))
        );
        assert_eq!("memory".parse::<StoreSpec>(), Ok(StoreSpec::Memory));
        assert_eq!("none".parse::<StoreSpec>(), Ok(StoreSpec::None));
        assert!("sqlite:".parse::<StoreSpec>().is_err());
        assert!("redis".parse::<StoreSpec>().is_err());
    }

    #[test]
    fn test_fetch_defaults() {
        let args = Args::parse_from(["weather-history", "fetch", "-s", "10637,10382", "-y", "2023"]);
        let Command::Fetch(fetch) = &args.command else {
            panic!("expected fetch");
        };
        assert_eq!(fetch.stations, vec!["10637", "10382"]);
        assert_eq!(fetch.years, vec![2023]);
        assert!(fetch.parameters.is_empty());
        assert_eq!(fetch.outlier_filter(), OutlierFilter::default());
        assert!(!fetch.reconciler_config().assume_contiguous_cache);
        assert_eq!(args.log_level(), "info");
    }

    #[test]
    fn test_fetch_outlier_options() {
        let args = Args::parse_from([
            "weather-history",
            "-v",
            "fetch",
            "-s",
            "X",
            "-y",
            "2022,2023",
            "-p",
            "tmax",
            "--outliers",
            "iqr",
            "--threshold",
            "2",
            "--grouping",
            "month",
            "--store",
            "memory",
        ]);
        assert_eq!(args.log_level(), "debug");
        let Command::Fetch(fetch) = args.command else {
            panic!("expected fetch");
        };
        assert_eq!(fetch.parameters, vec![Parameter::Tmax]);
        assert_eq!(fetch.store, StoreSpec::Memory);
        assert_eq!(
            fetch.outlier_filter(),
            OutlierFilter::new(OutlierMethod::Iqr { k: 2.0 }, Grouping::Month)
        );
    }
}
