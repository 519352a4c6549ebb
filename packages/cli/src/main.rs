#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Regional earthquake forecasts from the command line.
//!
//! ```text
//! quake_forecast regions
//! quake_forecast recent <region>
//! quake_forecast analyze <region>
//! quake_forecast forecast <region> [--seed 42]
//! ```
//!
//! Running with no subcommand enters interactive mode. Unless `--offline`
//! is given, the historical catalog is topped up from the USGS feed first.

mod interactive;
mod progress;
mod render;
mod settings;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use quake_forecast_analytics::config::ForecastConfig;
use quake_forecast_analytics::session::ForecastSession;
use quake_forecast_catalog::live::{LiveRefresh, UsgsFeed};
use quake_forecast_catalog::load::load_csv;
use quake_forecast_catalog::registry::RegionRegistry;
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "quake_forecast",
    about = "Statistical earthquake forecasts for seismic regions"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Historical catalog CSV (overrides `QUAKE_FORECAST_CATALOG`)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Region registry TOML replacing the built-in regions
    #[arg(long, global = true)]
    regions: Option<PathBuf>,

    /// Forecast tuning TOML
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip the live feed and use the historical catalog only
    #[arg(long, global = true)]
    offline: bool,

    /// Print records as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the known regions
    Regions,
    /// Summarize the last year of activity in a region
    Recent {
        /// Region id (case-insensitive)
        region: String,
    },
    /// Run pattern analysis for a region
    Analyze {
        /// Region id (case-insensitive)
        region: String,
    },
    /// Analyze a region and forecast its next significant earthquake
    Forecast {
        /// Region id (case-insensitive)
        region: String,
        /// Seed for the location and depth sampling
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_registry(path: Option<&Path>) -> Result<RegionRegistry, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => {
            let registry = RegionRegistry::from_file(path)?;
            log::info!("Loaded {} regions from {}", registry.len(), path.display());
            registry
        }
        None => RegionRegistry::builtin(),
    })
}

fn load_config(path: Option<&Path>) -> Result<ForecastConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => ForecastConfig::from_file(path)?,
        None => ForecastConfig::default(),
    })
}

fn log_freshness(session: &ForecastSession, now: DateTime<Utc>) {
    match session.data_age_days(now) {
        Some(days) if days > 365 => log::warn!(
            "Newest cataloged earthquake is {days} days old; forecasts may not reflect recent activity"
        ),
        Some(days) => log::info!("Newest cataloged earthquake is {days} days old"),
        None => log::warn!("Catalog is empty; every region will report insufficient data"),
    }
}

async fn refresh_live(
    session: &mut ForecastSession,
    settings: &Settings,
    multi: &indicatif::MultiProgress,
    now: DateTime<Utc>,
) {
    let feed = match UsgsFeed::new(settings.feed_url.clone(), settings.feed_timeout) {
        Ok(feed) => feed,
        Err(e) => {
            log::warn!("Live feed disabled: {e}");
            return;
        }
    };

    let bar = progress::spinner(multi, "Fetching recent earthquakes...");
    let outcome = session.refresh_live(&feed, now).await;
    bar.finish_and_clear();

    if outcome.is_degraded() {
        log::warn!("Using historical data only");
    } else if let LiveRefresh::Merged {
        fetched,
        malformed,
        stale,
        added,
    } = outcome
    {
        log::info!(
            "Live feed: {fetched} fetched, {added} added, {stale} already cataloged, {malformed} malformed"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = progress::init_logger();
    let cli = Cli::parse();
    let now = Utc::now();

    let settings = Settings::resolve(cli.catalog.clone());
    let registry = load_registry(cli.regions.as_deref())?;
    let config = load_config(cli.config.as_deref())?;

    if matches!(cli.command, Some(Commands::Regions)) {
        if cli.json {
            print_json(&registry.regions())?;
        } else {
            render::regions(&registry);
        }
        return Ok(());
    }

    let (catalog, report) = load_csv(&settings.catalog_path)?;
    log::info!(
        "Loaded {} earthquakes from {} ({} rows rejected, {} duplicates)",
        catalog.len(),
        settings.catalog_path.display(),
        report.rejected(),
        report.duplicates
    );

    let mut session = ForecastSession::new(catalog, registry, config);
    if !cli.offline {
        refresh_live(&mut session, &settings, &multi, now).await;
    }
    log_freshness(&session, now);

    let Some(command) = cli.command else {
        let mut rng = StdRng::from_os_rng();
        return interactive::run(&mut session, now, &mut rng);
    };

    match command {
        Commands::Regions => {}
        Commands::Recent { region } => {
            let activity = session.recent_activity(&region, now)?;
            if cli.json {
                print_json(&activity)?;
            } else {
                render::recent(&activity);
            }
        }
        Commands::Analyze { region } => {
            let outcome = session.analyze(&region, now)?;
            if cli.json {
                print_json(&outcome)?;
            } else {
                render::analysis(&outcome);
            }
        }
        Commands::Forecast { region, seed } => {
            let mut rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
            let result = session.forecast(&region, now, &mut rng)?;
            if cli.json {
                print_json(&result)?;
            } else {
                render::region_forecast(&result);
            }
        }
    }

    Ok(())
}
