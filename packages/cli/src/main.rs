#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the geowatch geofence watcher.
//!
//! Loads the safe-zone table, checks the tracked device's latest location
//! report against it, and texts recipients when a zone is violated.

mod config;
mod watch;

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use geowatch_alert::{Notifier, TextbeltNotifier, summarize};
use geowatch_evaluate::{activation, evaluate, sort_by_zone_id};
use geowatch_zone::ZoneStore;
use geowatch_zone_models::Sample;

use crate::config::Config;
use crate::watch::{AlertTarget, Outcome};

#[derive(Parser)]
#[command(name = "geowatch", about = "Geofence watcher for a tracked device")]
struct Cli {
    /// Path to the TOML configuration file (default: `geowatch.toml` if present)
    #[arg(long, global = true, env = "GEOWATCH_CONFIG")]
    config: Option<PathBuf>,
    /// Zone table to use instead of the configured `geofences_url`
    #[arg(long, global = true)]
    source: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured zones and whether each is active now
    Zones,
    /// Evaluate a single position against the zones without alerting
    Check {
        /// Latitude (WGS84)
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude (WGS84)
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Observation time as RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Check the latest location report once and alert on violations
    Run {
        /// Report dump to read (overrides `reports_path`)
        #[arg(long)]
        reports: Option<PathBuf>,
        /// Evaluate and log, but send no messages
        #[arg(long, env = "GEOWATCH_DRY_RUN")]
        dry_run: bool,
    },
    /// Re-check periodically, reloading zones on every tick
    Watch {
        /// Seconds between checks
        #[arg(long, default_value = "300")]
        interval: u64,
        /// Report dump to read (overrides `reports_path`)
        #[arg(long)]
        reports: Option<PathBuf>,
        /// Evaluate and log, but send no messages
        #[arg(long, env = "GEOWATCH_DRY_RUN")]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(source) = cli.source {
        config.geofences_url = source;
    }

    geowatch_cli_utils::init_logger(geowatch_cli_utils::redaction_requested(
        config.redact_logs,
    ));
    if let Some(path) = &cli.config {
        log::debug!("Using config {}", path.display());
    }

    let store = ZoneStore::new(config.zone_store_config());

    match cli.command {
        Commands::Zones => {
            let snapshot = store.reload().await?;
            let now = Utc::now();

            println!(
                "{:<20} {:<9} {:<18} {:<20} {:<7} DESCRIPTION",
                "ID", "STATUS", "SCHEDULE", "TIMEZONE", "ACTIVE"
            );
            for zone in snapshot.zones() {
                let schedule = match (zone.schedule_start, zone.schedule_stop) {
                    (Some(start), Some(stop)) => format!("{start}-{stop}"),
                    _ => "-".to_string(),
                };
                println!(
                    "{:<20} {:<9} {:<18} {:<20} {:<7} {}",
                    zone.id,
                    zone.status.to_string(),
                    schedule,
                    zone.timezone.to_string(),
                    if activation::is_active(zone, now) { "yes" } else { "no" },
                    zone.description
                );
            }
            println!();
            println!("{} zones from {}", snapshot.len(), snapshot.source());
        }
        Commands::Check { lat, lon, at } => {
            let snapshot = store.reload().await?;
            let sample = Sample::new(lat, lon, at.unwrap_or_else(Utc::now));

            let mut violations = evaluate(&snapshot, &sample);
            sort_by_zone_id(&mut violations);

            if violations.is_empty() {
                println!("No violations ({} zones checked)", snapshot.len());
            } else {
                for violation in &violations {
                    println!("violated: {}", violation.zone.id);
                }
                println!("{}", summarize(&violations)?);
            }
        }
        Commands::Run { reports, dry_run } => {
            let reports = reports.unwrap_or_else(|| config.reports_path.clone());
            let notifier = textbelt(&config, dry_run)?;
            let target = AlertTarget {
                notifier: notifier.as_ref().map(|n| n as &dyn Notifier),
                recipients: &config.phone_numbers,
            };

            store.reload().await?;
            match watch::check_latest(&store, &reports, &target).await? {
                Outcome::NoReports => println!("No location reports"),
                Outcome::Clear => println!("No violations"),
                Outcome::Violated {
                    violations,
                    message,
                } => println!("{violations} zone(s) violated: {message}"),
            }
        }
        Commands::Watch {
            interval,
            reports,
            dry_run,
        } => {
            let reports = reports.unwrap_or_else(|| config.reports_path.clone());
            let notifier = textbelt(&config, dry_run)?;
            let target = AlertTarget {
                notifier: notifier.as_ref().map(|n| n as &dyn Notifier),
                recipients: &config.phone_numbers,
            };

            log::info!("Watching every {interval}s");
            watch::watch(&store, &reports, &target, Duration::from_secs(interval)).await?;
        }
    }

    Ok(())
}

/// The SMS notifier, or `None` in dry-run mode.
fn textbelt(
    config: &Config,
    dry_run: bool,
) -> Result<Option<TextbeltNotifier>, config::ConfigError> {
    if dry_run {
        return Ok(None);
    }
    let api_key = config.require_textbelt_api_key()?;
    Ok(Some(TextbeltNotifier::with_endpoint(
        api_key,
        &config.textbelt_url,
    )))
}
