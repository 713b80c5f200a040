//! Configuration loaded from `config.toml`.
//!
//! Lookup order: an explicit `--config` path, then
//! `<config dir>/nimvault/config.toml`, then built-in defaults. Every field is
//! optional in the file.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Width of the worker pool used by both pipelines.
    pub workers: usize,
    /// Default log level when neither `-v`/`-q` nor `RUST_LOG` is given.
    pub log_level: String,
    pub cleanup: CleanupConfig,
    pub convert: ConvertConfig,
    pub converter: ConverterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 8,
            log_level: "warn".to_string(),
            cleanup: CleanupConfig::default(),
            convert: ConvertConfig::default(),
            converter: ConverterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Print a progress line every N completed files.
    pub progress_interval: usize,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            progress_interval: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Print a progress line every N completed notes.
    pub progress_interval: usize,
    /// How many failed notes the final summary lists.
    pub max_failures_listed: usize,
    /// Maximum length (in characters) of a sanitized file or folder name.
    pub max_filename_length: usize,
    /// Asset file extensions copied next to the note (lowercase, no dot).
    pub asset_extensions: Vec<String>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            progress_interval: 100,
            max_failures_listed: 20,
            max_filename_length: 200,
            asset_extensions: [
                "png", "jpg", "jpeg", "gif", "webp", "svg", "pdf", "mp4", "mp3", "wav",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// External HTML-to-Markdown converter invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Program to run (looked up on `PATH` when not absolute).
    pub program: PathBuf,
    /// Arguments placed before the format flags.
    pub args: Vec<String>,
    /// Wall-clock limit per note.
    pub timeout_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pandoc"),
            args: Vec::new(),
            timeout_secs: 60,
        }
    }
}

impl ConverterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from an explicit path, the default location, or defaults.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::ConfigError(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(path)
            }
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Default config location: `<config dir>/nimvault/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nimvault").join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::ConfigError("workers must be at least 1".to_string()));
        }
        if self.converter.timeout_secs == 0 {
            return Err(Error::ConfigError(
                "converter.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.convert.max_filename_length == 0 {
            return Err(Error::ConfigError(
                "convert.max_filename_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
