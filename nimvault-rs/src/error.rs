//! Error types and exit codes for nimvault.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Process exit codes.
///
/// Only setup-level failures change the exit code; a batch in which some
/// notes or files failed still exits with `SUCCESS`.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
}

/// Main error type for nimvault operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Converter unavailable: {0}")]
    ConverterUnavailable(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Returns the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        exit_code::GENERAL_ERROR
    }
}

/// Result type alias for nimvault operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single HTML-to-Markdown conversion.
///
/// These are always recoverable: the note is recorded as failed and the
/// batch moves on.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("failed to start converter: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("converter timed out after {0:?}")]
    Timeout(Duration),

    #[error("converter exited with {status}: {stderr}")]
    NonZeroExit { status: String, stderr: String },

    #[error("converter produced invalid UTF-8 output")]
    InvalidOutput,

    #[error("converter I/O error: {0}")]
    Io(#[from] std::io::Error),
}
