//! `nimvault cleanup`: scrub leftover HTML from a vault in place.

use crate::cleanup::{CleanupOptions, Outcome, Pipeline, clean_files, discover};
use crate::cli::args::CleanupArgs;
use crate::cli::output::{Output, group_thousands, progress_due};
use crate::config::Config;
use crate::error::Result;

pub fn run(args: &CleanupArgs, config: &Config, output: &Output) -> Result<()> {
    output.info(&format!("Scanning: {}", args.root.display()));
    let files = discover(&args.root)?;
    output.info(&format!("Found {} markdown files\n", files.len()));

    if args.dry_run {
        output.info("Cleaning HTML artifacts (dry run, nothing is written)...");
    } else {
        output.info("Cleaning HTML artifacts...");
    }

    let options = CleanupOptions {
        workers: args.workers.unwrap_or(config.workers),
        dry_run: args.dry_run,
    };
    let interval = config.cleanup.progress_interval;

    let summary = clean_files(files, Pipeline::cleanup(), options, |done, report, running| {
        if let Outcome::Error { message } = &report.outcome {
            output.info(&format!("  ERROR: {}: {}", report.path.display(), message));
        }
        if progress_due(done, running.total, interval) {
            output.info(&format!(
                "Progress: {}/{} ({} modified, {} unchanged)",
                done, running.total, running.modified, running.unchanged
            ));
        }
    })?;

    let verb = if summary.dry_run { "Would modify" } else { "Modified" };
    let lines = vec![
        if summary.dry_run {
            "Dry run complete!".to_string()
        } else {
            "Cleanup complete!".to_string()
        },
        format!("  {}: {} files", verb, summary.modified),
        format!("  Unchanged: {} files", summary.unchanged),
        format!("  Errors: {} files", summary.errors),
        format!("  Total bytes changed: ~{}", group_thousands(summary.bytes_changed)),
    ];
    output.summary(&summary, &lines)
}
