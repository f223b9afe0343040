//! balanceboard - Daily balance dashboard

mod cli;

use anyhow::{Context, Result};
use balanceboard_core::analytics::{DEFAULT_HISTORY_DAYS, compute_history};
use balanceboard_core::models::{BalanceSnapshot, Observation, parse_utc_offset};
use balanceboard_core::parsers::{day_start_for, latest_day, observations_for_day};
use balanceboard_core::{DayReport, LoadReport, Settings, SettingsParser, SnapshotParser};
use chrono::{FixedOffset, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "balanceboard",
    version,
    about = "Daily balance dashboard",
    long_about = "Forecasts how a daily-reset API balance will evolve until midnight.\n\
                  \n\
                  Reads the snapshot file written by the collector (a JSON array of\n\
                  {timestamp, balance, payAsYouGoBalance, dailyBudget} entries, one every\n\
                  5 minutes) and reports on one billing day.\n\
                  \n\
                  Examples:\n\
                    balanceboard forecast snapshots.json              # Latest day, table\n\
                    balanceboard forecast snapshots.json --json       # Raw forecast\n\
                    balanceboard stats snapshots.json --date 2026-10-18\n\
                    balanceboard alerts snapshots.json                # Replay usage alerts\n\
                    balanceboard history snapshots.json --days 7      # Usage per day\n\
                  \n\
                  Environment Variables:\n\
                    BALANCEBOARD_SETTINGS            # Settings file (default: ~/.balanceboard/settings.json)\n\
                    BALANCEBOARD_UTC_OFFSET          # Billing day offset, e.g. +08:00\n\
                    RUST_LOG                         # Log filter (default: warn)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to settings file (default: ~/.balanceboard/settings.json)
    #[arg(long, global = true, env = "BALANCEBOARD_SETTINGS")]
    settings: Option<PathBuf>,

    /// UTC offset of the billing day (overrides settings)
    #[arg(long, global = true, env = "BALANCEBOARD_UTC_OFFSET")]
    utc_offset: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Forecast the balance until midnight
    Forecast {
        /// Snapshot file (JSON array)
        snapshots: PathBuf,
        /// Day to report: YYYY-MM-DD (default: day of the latest snapshot)
        #[arg(long, short = 'd')]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show consumption statistics of a day
    Stats {
        /// Snapshot file (JSON array)
        snapshots: PathBuf,
        /// Day to report: YYYY-MM-DD (default: day of the latest snapshot)
        #[arg(long, short = 'd')]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay the usage threshold alerts of a day
    Alerts {
        /// Snapshot file (JSON array)
        snapshots: PathBuf,
        /// Day to report: YYYY-MM-DD (default: day of the latest snapshot)
        #[arg(long, short = 'd')]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show usage per day over a window ending at a date
    History {
        /// Snapshot file (JSON array)
        snapshots: PathBuf,
        /// Last day of the window: YYYY-MM-DD (default: day of the latest snapshot)
        #[arg(long, short = 'd')]
        date: Option<String>,
        /// Number of days
        #[arg(long, short = 'n', default_value_t = DEFAULT_HISTORY_DAYS)]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Command {
    fn snapshots_path(&self) -> &Path {
        match self {
            Command::Forecast { snapshots, .. }
            | Command::Stats { snapshots, .. }
            | Command::Alerts { snapshots, .. }
            | Command::History { snapshots, .. } => snapshots,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let (settings, mut load_report) = load_settings(cli.settings.as_deref()).await;
    let offset = match cli.utc_offset.as_deref() {
        Some(value) => parse_utc_offset(value)?,
        None => settings.offset()?,
    };

    let snapshots_path = cli.command.snapshots_path().to_path_buf();
    let snapshots = load_snapshots(&snapshots_path, &mut load_report).await;

    let messages = cli::format_load_report(&load_report);
    if !messages.is_empty() {
        eprint!("{}", messages);
    }
    if load_report.errors.iter().any(|e| e.source == "snapshots") {
        anyhow::bail!("Failed to load snapshots from {}", snapshots_path.display());
    }

    match cli.command {
        Command::Forecast { date, json, .. } => {
            let day = load_day(&snapshots, date.as_deref(), offset, &settings)?;
            let stride = cli::rows_per_hour(settings.forecast.step_minutes);
            println!("{}", cli::format_forecast(&day.report, stride, json)?);
        }
        Command::Stats { date, json, .. } => {
            let day = load_day(&snapshots, date.as_deref(), offset, &settings)?;
            println!("{}", cli::format_stats(&day.report, json)?);
        }
        Command::Alerts { date, json, .. } => {
            let day = load_day(&snapshots, date.as_deref(), offset, &settings)?;
            let alerts = cli::replay_alerts(&day.observations, &settings.alerts, offset);
            println!("{}", cli::format_alerts(&alerts, json)?);
        }
        Command::History {
            date, days, json, ..
        } => {
            let end = resolve_date(&snapshots, date.as_deref(), offset)?;
            let history = compute_history(&snapshots, end, days, offset);
            println!("{}", cli::format_history(&history, json)?);
        }
    }

    Ok(())
}

/// Report plus the observations it was computed from
struct LoadedDay {
    observations: Vec<Observation>,
    report: DayReport,
}

/// Settings with the report of their loading; never fails
async fn load_settings(path: Option<&Path>) -> (Settings, LoadReport) {
    let mut report = LoadReport::new();
    let Some(path) = cli::settings_path(path, SettingsParser::default_path(), &mut report) else {
        return (Settings::default(), report);
    };

    let settings = SettingsParser::new().parse_graceful(&path, &mut report).await;
    (settings, report)
}

async fn load_snapshots(path: &Path, report: &mut LoadReport) -> Vec<BalanceSnapshot> {
    let mut snapshot_report = LoadReport::new();
    let snapshots = SnapshotParser::new()
        .parse_graceful(path, &mut snapshot_report)
        .await;
    report.merge(snapshot_report);
    snapshots
}

/// `--date` if given, else the day of the latest snapshot
fn resolve_date(
    snapshots: &[BalanceSnapshot],
    date: Option<&str>,
    offset: FixedOffset,
) -> Result<NaiveDate> {
    match date {
        Some(value) => cli::parse_date(value),
        None => latest_day(snapshots, offset).context("Snapshot file is empty"),
    }
}

fn load_day(
    snapshots: &[BalanceSnapshot],
    date: Option<&str>,
    offset: FixedOffset,
    settings: &Settings,
) -> Result<LoadedDay> {
    let date = resolve_date(snapshots, date, offset)?;
    let day_start = day_start_for(date, offset);
    let day = observations_for_day(snapshots, day_start);

    tracing::debug!(
        %date,
        observations = day.observations.len(),
        "Loaded billing day"
    );

    let report = DayReport::compute(&day, day_start, settings);
    Ok(LoadedDay {
        observations: day.observations,
        report,
    })
}
