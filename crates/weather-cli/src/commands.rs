//! Command implementations.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use weather::{
    ChartData, FetchReconciler, MeteostatClient, Session, StationDirectory, common_dates,
};

use crate::args::{Args, Command, FetchArgs, NearestArgs, OutputFormat, SearchArgs};

/// Exit code when some station-years could not be filled.
const EXIT_PARTIAL: i32 = 2;

/// Runs the selected command and returns the process exit code.
pub(crate) async fn run(args: Args) -> Result<i32> {
    setup_logging(args.log_level(), args.quiet);

    match args.command {
        Command::Fetch(fetch_args) => fetch(fetch_args).await,
        Command::Search(search_args) => search(search_args).await,
        Command::Nearest(nearest_args) => nearest(nearest_args).await,
    }
}

/// Structured logging on stderr; `RUST_LOG` overrides the level.
fn setup_logging(level: &str, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "weather={level},weather_core={level},weather_cache={level},\
             weather_meteostat={level},weather_history={level}"
        ))
    });

    let layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr);

    if quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.compact())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

async fn fetch(args: FetchArgs) -> Result<i32> {
    let store = args
        .store
        .open()
        .with_context(|| format!("failed to open store {:?}", args.store))?;

    let mut client = MeteostatClient::new();
    if let Some(base_url) = &args.base_url {
        client = client.with_base_url(base_url.clone());
    }
    let reconciler =
        FetchReconciler::new(Arc::new(client), store).with_config(args.reconciler_config());

    let session = Session::today()
        .with_stations(args.stations.iter().cloned())
        .with_years(args.years.iter().copied())
        .with_parameters(args.parameters.iter().copied());

    info!(
        stations = session.stations().len(),
        years = session.years().count(),
        window = %session.request_window(),
        "Filling cache"
    );

    let report = reconciler.fetch_session(&session).await;
    for outcome in &report.outcomes {
        debug!(
            station = %outcome.station_id,
            year = outcome.year,
            from_memory = outcome.from_memory(),
            copied_from_store = outcome.copied_from_store,
            remote_gaps = outcome.remote_gaps.len(),
            rows = outcome.rows_received,
            persisted = outcome.persisted,
            days = outcome.cached_days,
            "Station-year ready"
        );
    }
    for failure in &report.failures {
        warn!("Fetch failed: {failure}");
    }

    let stations = reconciler.stations().await;
    let dates = common_dates(&stations, &session);

    let charts: Vec<(String, ChartData)> = if args.combined {
        vec![(
            "all stations".to_string(),
            ChartData::combined(&stations, &session, &dates.all_stations),
        )]
    } else {
        session
            .stations()
            .iter()
            .map(|id| {
                let station_dates = dates
                    .per_station
                    .get(id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                (
                    stations.name_or_id(id).to_string(),
                    ChartData::for_station(&stations, &session, id, station_dates),
                )
            })
            .collect()
    };

    match args.format {
        OutputFormat::Table => {
            for (title, chart) in &charts {
                println!("{title}");
                println!("{}", chart.to_frame()?);
            }
        }
        OutputFormat::Json => {
            let mut out = serde_json::Map::new();
            for (title, chart) in &charts {
                out.insert(title.clone(), serde_json::to_value(chart)?);
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    if report.is_complete() {
        Ok(0)
    } else {
        warn!(
            failures = report.failures.len(),
            "Some station-years are incomplete"
        );
        Ok(EXIT_PARTIAL)
    }
}

async fn search(args: SearchArgs) -> Result<i32> {
    let client = MeteostatClient::new().with_locale(args.locale);
    let results = client
        .search(&args.query)
        .await
        .with_context(|| format!("search for '{}' failed", args.query))?;

    if results.places.is_empty() && results.stations.is_empty() {
        println!("No matches for '{}'", args.query);
        return Ok(0);
    }

    if !results.places.is_empty() {
        println!("Places:");
        for place in &results.places {
            println!(
                "  {:<24} {} ({}{})",
                place.id,
                place.name,
                place.country,
                place
                    .region
                    .as_deref()
                    .map(|r| format!(", {r}"))
                    .unwrap_or_default()
            );
        }
    }
    if !results.stations.is_empty() {
        println!("Stations:");
        for station in &results.stations {
            println!(
                "  {:<8} {} ({}){}",
                station.id,
                station.name,
                station.country,
                if station.active { "" } else { " inactive" }
            );
        }
    }
    Ok(0)
}

async fn nearest(args: NearestArgs) -> Result<i32> {
    let client = MeteostatClient::new();
    let location = client
        .place_location(&args.country, &args.place)
        .await
        .with_context(|| format!("failed to locate {}/{}", args.country, args.place))?;
    debug!(
        latitude = location.latitude,
        longitude = location.longitude,
        "Place located"
    );

    let Some(station) = client
        .nearest_station(location.latitude, location.longitude)
        .await?
    else {
        println!("No station near {}/{}", args.country, args.place);
        return Ok(1);
    };

    let distance = station
        .distance
        .map(|d| format!(" {d:.0} m away"))
        .unwrap_or_default();
    println!("{} {}{distance}", station.id, station.name);
    Ok(0)
}
