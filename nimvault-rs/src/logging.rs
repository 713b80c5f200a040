//! Diagnostic logging setup.
//!
//! Diagnostics go to stderr through `tracing`; progress reports and
//! summaries are printed to stdout by the CLI and are not affected by the
//! log level.

use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install the global subscriber.
///
/// `verbose` raises the level one step per occurrence, `quiet` lowers it to
/// errors only. `RUST_LOG` directives take precedence over both.
pub fn init(configured: &str, verbose: u8, quiet: bool) {
    let level = effective_level(configured, verbose, quiet);

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::registry().with(layer).try_init();
}

fn effective_level(configured: &str, verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    let base = parse_level(configured).unwrap_or(LevelFilter::WARN);
    (0..verbose).fold(base, |level, _| raise(level))
}

fn raise(level: LevelFilter) -> LevelFilter {
    match level {
        LevelFilter::OFF => LevelFilter::ERROR,
        LevelFilter::ERROR => LevelFilter::WARN,
        LevelFilter::WARN => LevelFilter::INFO,
        LevelFilter::INFO => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.to_lowercase().as_str() {
        "off" => Some(LevelFilter::OFF),
        "error" => Some(LevelFilter::ERROR),
        "warn" => Some(LevelFilter::WARN),
        "info" => Some(LevelFilter::INFO),
        "debug" => Some(LevelFilter::DEBUG),
        "trace" => Some(LevelFilter::TRACE),
        _ => None,
    }
}
