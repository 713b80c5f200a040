//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nimvault")]
#[command(
    author,
    version,
    about = "Convert Nimbus Note exports into a Markdown vault and scrub leftover HTML",
    long_about = None
)]
pub struct Cli {
    /// Path to a config file (default: <config dir>/nimvault/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the final summary as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scrub leftover HTML from every Markdown file under a directory
    Cleanup(CleanupArgs),

    /// Convert an export (directory or .zip) into a Markdown vault
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Vault directory to clean in place
    pub root: PathBuf,

    /// Report what would change without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Number of worker threads
    #[arg(long, value_parser = parse_positive)]
    pub workers: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Export directory or .zip archive
    pub input: PathBuf,

    /// Output vault directory (created if missing)
    pub output: PathBuf,

    /// Number of worker threads
    #[arg(long, value_parser = parse_positive)]
    pub workers: Option<usize>,

    /// Per-note converter timeout in seconds
    #[arg(long, value_parser = parse_positive)]
    pub timeout: Option<usize>,

    /// Converter program to run instead of the configured one
    #[arg(long)]
    pub pandoc: Option<PathBuf>,

    /// Also run the cleanup pass on every written note
    #[arg(long)]
    pub clean: bool,
}

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
