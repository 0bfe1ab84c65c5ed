mod config;
mod extract;
mod fetch;
mod model;
mod race_ids;
mod store;

use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::config::ScrapeConfig;
use crate::extract::ExtractError;

#[derive(Parser)]
#[command(name = "keiba_scraper", about = "netkeiba race data scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape shutuba pages and merge them into the race store
    Scrape {
        /// Max races to fetch
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        /// Take race ids from the results listing instead of the built-in
        /// G1 calendar
        #[arg(long)]
        discover: bool,
    },
    /// Fetch real race ids from the results listing and write the manifest
    FetchIds {
        /// Max ids to keep per year
        #[arg(short = 'n', long, default_value = "12")]
        per_year: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = ScrapeConfig::load();

    match cli.command {
        Commands::Scrape { limit, discover } => run_scrape(&cfg, limit, discover),
        Commands::FetchIds { per_year } => run_fetch_ids(&cfg, per_year),
    }
}

fn run_scrape(cfg: &ScrapeConfig, limit: usize, discover: bool) -> Result<()> {
    let client = fetch::build_client(cfg)?;

    println!("Fetching race data from netkeiba...");
    let ids = if discover {
        let mut ids = race_ids::discover_ids(&client, cfg, limit);
        ids.truncate(limit);
        ids
    } else {
        race_ids::calendar_ids(limit)
    };
    println!("Target races: {}", ids.len());

    let mut fresh = Vec::new();
    for (i, race_id) in ids.iter().enumerate() {
        println!(
            "\n[{}/{}] fetching race {}{}...",
            i + 1,
            ids.len(),
            race_id,
            venue_suffix(race_id)
        );

        match extract::scrape_race(&client, cfg, race_id) {
            Ok(race) => {
                println!("  + got {}", race.name);
                fresh.push(race);
            }
            Err(ExtractError::Request(e)) => {
                warn!("race {race_id}: request failed: {e}");
                println!("  x request failed");
            }
            Err(ExtractError::MissingField(field)) => {
                warn!("race {race_id}: page is missing the {field} block");
                println!("  x page structure not recognized");
            }
        }

        // Courtesy pause between fetches, skipped after the last one.
        if i + 1 < ids.len() {
            thread::sleep(Duration::from_secs(cfg.request_delay_secs));
        }
    }

    let existing = store::load_races(&cfg.store_path)?;
    println!("\nExisting races in store: {}", existing.len());

    let outcome = store::merge_races(existing, fresh);
    store::save_races(&cfg.store_path, &outcome.races)?;

    println!("Saved {}", cfg.store_path.display());
    println!("  newly added: {}", outcome.added);
    println!("  total:       {}", outcome.races.len());
    Ok(())
}

fn run_fetch_ids(cfg: &ScrapeConfig, per_year: usize) -> Result<()> {
    let client = fetch::build_client(cfg)?;

    println!(
        "Searching netkeiba race listings for G1 races ({:?})...",
        cfg.discovery_years
    );
    let ids = race_ids::discover_ids(&client, cfg, per_year);
    println!("Found {} race ids", ids.len());

    race_ids::write_manifest(cfg, &ids)?;
    println!("Saved {}", cfg.manifest_path.display());

    for (i, id) in ids.iter().take(10).enumerate() {
        println!("{}. {}{}", i + 1, id, venue_suffix(id));
    }
    if ids.len() > 10 {
        println!("... and {} more", ids.len() - 10);
    }
    Ok(())
}

/// " (中山)" style decoration for progress lines, when the id carries a
/// known course code.
fn venue_suffix(race_id: &str) -> String {
    race_id
        .get(8..10)
        .and_then(crate::config::racecourse_name)
        .map(|name| format!(" ({name})"))
        .unwrap_or_default()
}
