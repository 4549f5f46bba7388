//! Configuration management system for TreeSync
//!
//! This crate provides layered configuration for the TreeSync engine and its
//! command-line front end.
//!
//! # Features
//!
//! - **Multiple formats**: YAML, TOML and JSON configuration files
//! - **Validation**: Range checks on every tunable before a run starts
//! - **Environment overrides**: `TREESYNC_SYNC__IDLE_WAIT_MS=25` style variables
//! - **Defaults**: Every field has a default, an empty file is a valid configuration
//!
//! # Examples
//!
//! ```rust
//! use treesync_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_source_file("treesync.yaml")
//!     .add_env_prefix("TREESYNC")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Idle wait: {:?}", config.sync.idle_wait());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Main configuration structure for TreeSync
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Scan and transfer behaviour
    #[serde(default)]
    pub sync: SyncConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Progress display configuration
    #[serde(default)]
    pub progress: ProgressConfig,
}

/// Scan and transfer behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How long the transfer worker blocks on an empty queue before re-checking
    /// whether the scan has finished (milliseconds)
    #[serde(default = "default_idle_wait_ms")]
    pub idle_wait_ms: u64,
    /// Bound on queued folder fingerprints; unbounded when absent
    #[serde(default)]
    pub queue_capacity: Option<usize>,
    /// Copy modification and access times onto copied files
    #[serde(default = "default_true")]
    pub preserve_timestamps: bool,
    /// Copy permission bits onto copied files
    #[serde(default = "default_true")]
    pub preserve_permissions: bool,
    /// Write a hash marker into destination folders that hold no files
    #[serde(default = "default_true")]
    pub write_empty_markers: bool,
    /// Cancel the run automatically after this many seconds
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

impl SyncConfig {
    /// Idle wait as a [`Duration`]
    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    /// Run timeout as a [`Duration`], if configured
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            idle_wait_ms: default_idle_wait_ms(),
            queue_capacity: None,
            preserve_timestamps: true,
            preserve_permissions: true,
            write_empty_markers: true,
            run_timeout_secs: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_level")]
    pub level: String,
    /// Enable JSON formatting
    #[serde(default)]
    pub json_format: bool,
    /// Enable colored output
    #[serde(default = "default_true")]
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json_format: false,
            colored_output: true,
        }
    }
}

/// Progress display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Show live progress while a run is active
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Polling cadence of the progress display (milliseconds)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl ProgressConfig {
    /// Polling interval as a [`Duration`]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_interval_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_idle_wait_ms() -> u64 {
    10
}

fn default_level() -> String {
    "info".to_string()
}

fn default_interval_ms() -> u64 {
    100
}
