//! Configuration loading and management.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".planboard/planboard.db")
}

/// Sweeper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Hour of day (0-23) before which tasks due today are not yet marked
    /// overdue. Keeps a task from flipping to overdue moments after
    /// midnight server time.
    #[serde(default = "default_overdue_cutoff_hour")]
    pub overdue_cutoff_hour: u32,

    /// Seconds between sweeps in watch mode.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            overdue_cutoff_hour: default_overdue_cutoff_hour(),
            interval_seconds: default_interval_seconds(),
        }
    }
}

fn default_overdue_cutoff_hour() -> u32 {
    23
}

fn default_interval_seconds() -> u64 {
    60
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the default location or return defaults.
    pub fn load_or_default() -> Self {
        // Try .planboard/config.yaml
        if let Ok(config) = Self::load(".planboard/config.yaml") {
            return config;
        }

        // Try environment variables
        let mut config = Self::default();

        if let Ok(db_path) = std::env::var("PLANBOARD_DB_PATH") {
            config.server.db_path = PathBuf::from(db_path);
        }

        if let Ok(hour) = std::env::var("PLANBOARD_OVERDUE_CUTOFF_HOUR") {
            if let Ok(hour) = hour.parse() {
                config.sweep.overdue_cutoff_hour = hour;
            }
        }

        if let Ok(interval) = std::env::var("PLANBOARD_SWEEP_INTERVAL") {
            if let Ok(interval) = interval.parse() {
                config.sweep.interval_seconds = interval;
            }
        }

        config
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
