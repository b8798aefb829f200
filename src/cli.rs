//! CLI command definitions for planboard.
//!
//! The sweeper is the external-facing entry point: `sweep` runs one pass
//! (optionally dry-run), `watch` keeps sweeping on an interval.

use clap::{Parser, Subcommand};

/// Planboard status sweeper
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one status sweep (default if no subcommand given)
    Sweep {
        /// Report intended changes without writing them
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Sweep repeatedly on a fixed interval
    Watch {
        /// Seconds between sweeps (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },
}
