//! `nimvault convert`: build a Markdown vault from an export.

use crate::cli::args::ConvertArgs;
use crate::cli::output::{Output, progress_due};
use crate::config::Config;
use crate::convert::{
    ConvertOptions, ConvertSummary, ExportSource, ExternalConverter, NoteOutcome, VaultWriter,
    discover_bundles,
};
use crate::error::Result;
use std::fs;

pub fn run(args: &ConvertArgs, config: &Config, output: &Output) -> Result<()> {
    let mut converter_config = config.converter.clone();
    if let Some(program) = &args.pandoc {
        converter_config.program = program.clone();
    }
    if let Some(timeout) = args.timeout {
        converter_config.timeout_secs = timeout as u64;
    }
    let converter = ExternalConverter::from_config(&converter_config);
    converter.check_available()?;

    if args.input.is_file() {
        output.info(&format!("Extracting {}...", args.input.display()));
    }
    let source = ExportSource::open(&args.input)?;

    fs::create_dir_all(&args.output)?;

    output.info("Finding notes...");
    let bundles = discover_bundles(source.root())?;
    output.info(&format!("Found {} notes to convert", bundles.len()));

    let options = ConvertOptions {
        workers: args.workers.unwrap_or(config.workers),
        clean: args.clean,
        ..ConvertOptions::from_config(config)
    };
    let interval = config.convert.progress_interval;
    let writer = VaultWriter::new(&args.output, &converter, options);

    output.info("Converting notes...");
    let summary = writer.convert_all(bundles, |done, _, running| {
        if progress_due(done, running.total, interval) {
            output.info(&format!(
                "Progress: {}/{} ({} success, {} failed)",
                done, running.total, running.converted, running.failed
            ));
        }
    })?;

    let lines = summary_lines(&summary, config.convert.max_failures_listed);
    output.summary(&summary, &lines)
}

fn summary_lines(summary: &ConvertSummary, max_failures: usize) -> Vec<String> {
    let mut lines = vec![
        "Conversion complete!".to_string(),
        format!("  Total:   {}", summary.total),
        format!("  Success: {}", summary.converted),
        format!("  Failed:  {}", summary.failed),
        format!("  Assets:  {}", summary.assets_copied),
        format!("  Output:  {}", summary.output.display()),
    ];

    if !summary.failures.is_empty() {
        lines.push(String::new());
        lines.push("Failed notes:".to_string());
        for report in summary.failures.iter().take(max_failures) {
            if let NoteOutcome::Failed { message } = &report.outcome {
                lines.push(format!("  - {}", message));
            }
        }
        if summary.failures.len() > max_failures {
            lines.push(format!(
                "  ... and {} more",
                summary.failures.len() - max_failures
            ));
        }
    }
    lines
}
