#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `wardwatch`: terminal front end for the air-quality dashboard.
//!
//! Loads the country-wide station set, then optionally locates the device
//! or searches for a station, and prints what the map would show: the
//! overview, the most polluted stations, the selected station and the
//! camera move. With `--analyze` the selected station is also sent to the
//! configured LLM provider.

mod report;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use wardwatch_ai::LlmAnalyzer;
use wardwatch_dashboard::{
    DashboardConfig, DashboardError, Event, FixedGeolocator, Geolocator, IpGeolocator, Session,
};
use wardwatch_focus::FocusAction;
use wardwatch_source::StationSource;
use wardwatch_source::sample::SampleSource;
use wardwatch_source::waqi::{WaqiConfig, WaqiSource};
use wardwatch_station_models::{Coordinate, UserRole};

#[derive(Parser)]
#[command(name = "wardwatch", about = "Air-quality ward dashboard")]
struct Cli {
    /// Use the bundled sample wards instead of the WAQI feed
    #[arg(long, global = true)]
    sample: bool,
    /// Path to a TOML dashboard config
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Viewer role ("citizen" or "official")
    #[arg(long, global = true, default_value = "citizen")]
    role: UserRole,
    /// Analyse the selected station with the configured AI provider
    #[arg(long, global = true)]
    analyze: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the country overview and the most polluted stations
    Overview,
    /// Locate the device and show the nearest station
    Locate {
        /// Latitude to use instead of an IP lookup
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Longitude to use instead of an IP lookup
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
    },
    /// Search stations by city or station name
    Search {
        /// City or station name
        query: String,
        /// Select the N-th result (1-based)
        #[arg(long)]
        pick: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();
    run(cli).await?;

    Ok(())
}

async fn run(cli: Cli) -> Result<(), DashboardError> {
    let config = match &cli.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };

    let source: Arc<dyn StationSource> = if cli.sample {
        Arc::new(SampleSource::default())
    } else {
        Arc::new(WaqiSource::new(WaqiConfig::from_env()?))
    };

    let geolocator: Arc<dyn Geolocator> = match cli.command {
        Some(Commands::Locate {
            lat: Some(lat),
            lng: Some(lng),
        }) => Arc::new(FixedGeolocator(Coordinate::new(lat, lng))),
        _ => Arc::new(IpGeolocator::default()),
    };

    let mut session = Session::new(config, source, geolocator);
    if cli.analyze {
        session = session.with_analyzer(Arc::new(LlmAnalyzer::from_env()?));
    }

    // Set before any station is known so only one analysis is requested.
    session.set_role(cli.role);

    session.load();
    let mut camera = FocusAction::None;
    if let Some(Event::Loaded { camera: initial }) = session.next_event().await {
        camera = initial;
    }

    match cli.command.unwrap_or(Commands::Overview) {
        Commands::Overview => {}
        Commands::Locate { .. } => {
            session.locate();
            for event in drain(&mut session).await {
                match event {
                    Event::Located {
                        camera: located, ..
                    } => camera = located,
                    Event::LocateFailed(e) => return Err(e.into()),
                    _ => {}
                }
            }
        }
        Commands::Search { query, pick } => {
            if !session.search(&query) {
                println!(
                    "Query \"{query}\" is too short (minimum {} characters)",
                    session.dashboard().config().min_search_query_len
                );
                return Ok(());
            }
            drain(&mut session).await;
            report::print_search_results(session.dashboard().search_results());

            if let Some(pick) = pick {
                match pick
                    .checked_sub(1)
                    .and_then(|index| session.choose_search_result(index))
                {
                    Some(chosen) => camera = chosen,
                    None => println!("No search result #{pick}"),
                }
            }
        }
    }

    drain(&mut session).await;

    let dashboard = session.dashboard();
    report::print_overview(dashboard);
    if let Some(station) = dashboard.active_station() {
        report::print_station(station);
    }
    report::print_camera(dashboard, &camera);
    if cli.analyze {
        report::print_analysis(dashboard.analysis());
    }

    Ok(())
}

async fn drain(session: &mut Session) -> Vec<Event> {
    let events = session.run_until_idle().await;
    log::debug!("Applied {} completions", events.len());
    events
}
