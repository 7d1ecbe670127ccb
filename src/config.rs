//! Configuration for TinyDB
//!
//! All paths are relative to the working directory unless rebased with
//! `TINYDB_HOME`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default data root
pub const DEFAULT_DATA_DIR: &str = "tinydb/databases";
/// Default audit log directory
pub const DEFAULT_LOG_DIR: &str = "logs";
/// Default transaction buffer file
pub const DEFAULT_TRANSACTION_BUFFER: &str = "transaction_buffer.txt";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding one subdirectory per database
    pub data_dir: PathBuf,
    /// Directory for the audit log files
    pub log_dir: PathBuf,
    /// File holding buffered statements of the open transaction
    pub transaction_buffer: PathBuf,
    /// Snapshot the active database before COMMIT and restore it on failure
    pub atomic_commit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            transaction_buffer: PathBuf::from(DEFAULT_TRANSACTION_BUFFER),
            atomic_commit: false,
        }
    }
}

impl Config {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Default layout under a single home directory
    pub fn with_home(home: impl AsRef<Path>) -> Self {
        let home = home.as_ref();
        Self {
            data_dir: home.join(DEFAULT_DATA_DIR),
            log_dir: home.join(DEFAULT_LOG_DIR),
            transaction_buffer: home.join(DEFAULT_TRANSACTION_BUFFER),
            atomic_commit: false,
        }
    }

    /// Set the data directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the audit log directory
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Set the transaction buffer file
    pub fn transaction_buffer(mut self, path: impl Into<PathBuf>) -> Self {
        self.transaction_buffer = path.into();
        self
    }

    /// Enable or disable snapshot-restore on failed COMMIT
    pub fn atomic_commit(mut self, enabled: bool) -> Self {
        self.atomic_commit = enabled;
        self
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Defaults, adjusted by `TINYDB_HOME` and `TINYDB_ATOMIC_COMMIT`
    pub fn from_env() -> Result<Self> {
        let config = match env::var_os("TINYDB_HOME") {
            Some(home) => Self::with_home(PathBuf::from(home)),
            None => Self::default(),
        };
        match env::var("TINYDB_ATOMIC_COMMIT") {
            Ok(value) => Ok(config.atomic_commit(parse_flag(&value)?)),
            Err(_) => Ok(config),
        }
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(format!(
            "TINYDB_ATOMIC_COMMIT must be a boolean, got '{}'",
            other
        ))),
    }
}
