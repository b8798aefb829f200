//! Planboard sweeper binary.
//!
//! Applies time-driven status corrections to tasks, assignments, and
//! events, either once (`sweep`) or on a fixed interval (`watch`).

use anyhow::Result;
use clap::Parser;
use planboard::cli::{Cli, Command};
use planboard::config::Config;
use planboard::db::Database;
use planboard::sweep;
use std::fs::OpenOptions;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new().create(true).append(true).open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    // Load configuration and apply CLI overrides
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(),
    };
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }

    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path)?;

    match cli.command.unwrap_or(Command::Sweep {
        dry_run: false,
        json: false,
    }) {
        Command::Sweep { dry_run, json } => {
            let report = sweep::run(
                &db,
                config.sweep.overdue_cutoff_hour,
                chrono::Utc::now(),
                dry_run,
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }
        Command::Watch { interval } => {
            let interval = interval.unwrap_or(config.sweep.interval_seconds);
            info!(
                interval_seconds = interval,
                db = %config.server.db_path.display(),
                "starting sweep watcher"
            );

            // One failed run must not stop the loop; the next tick simply
            // tries again.
            loop {
                let report = sweep::run(
                    &db,
                    config.sweep.overdue_cutoff_hour,
                    chrono::Utc::now(),
                    false,
                );
                if report.failures > 0 {
                    error!(
                        failures = report.failures,
                        changes = report.total_changes(),
                        "sweep finished with failures"
                    );
                } else {
                    info!(changes = report.total_changes(), "sweep finished");
                }

                std::thread::sleep(std::time::Duration::from_secs(interval));
            }
        }
    }

    Ok(())
}
