//! Concurrent cleanup of every note under a root directory.

use crate::cleanup::pipeline::Pipeline;
use crate::error::{Error, Result};
use crate::pool::for_each_completed;
use glob::glob;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Content changed and was written back (or would be, in a dry run).
    Modified { bytes_changed: usize },
    /// The pipeline produced identical text; nothing written.
    Unchanged,
    /// Read, transform or write failed; the file was left as-is.
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Aggregate counts for a cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub total: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub errors: usize,
    /// Sum of absolute length differences; a rough measure only.
    pub bytes_changed: usize,
    pub dry_run: bool,
    pub failures: Vec<FileReport>,
}

impl CleanupSummary {
    fn record(&mut self, report: &FileReport) {
        match &report.outcome {
            Outcome::Modified { bytes_changed } => {
                self.modified += 1;
                self.bytes_changed += bytes_changed;
            }
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Error { .. } => {
                self.errors += 1;
                self.failures.push(report.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CleanupOptions {
    pub workers: usize,
    pub dry_run: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            workers: 8,
            dry_run: false,
        }
    }
}

/// Enumerate every `.md` file under `root`, skipping hidden paths.
///
/// This is a single snapshot: files created afterwards are not picked up.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(Error::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }

    let escaped = glob::Pattern::escape(&root.to_string_lossy());
    let pattern = format!("{}/**/*.md", escaped.trim_end_matches('/'));

    let mut files = Vec::new();
    for entry in glob(&pattern)? {
        match entry {
            Ok(path) => {
                let hidden = path
                    .strip_prefix(root)
                    .map(|relative| {
                        relative
                            .components()
                            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
                    })
                    .unwrap_or(false);
                if !hidden && path.is_file() {
                    files.push(path);
                }
            }
            Err(e) => warn!("skipping unreadable path: {}", e),
        }
    }

    files.sort();
    Ok(files)
}

/// Clean one file in place.
///
/// Never returns an error: every failure becomes [`Outcome::Error`] and the
/// file keeps its original bytes.
pub fn clean_file(path: &Path, pipeline: &Pipeline, dry_run: bool) -> Outcome {
    let original = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            return Outcome::Error {
                message: format!("read failed: {}", e),
            };
        }
    };

    let cleaned = match panic::catch_unwind(AssertUnwindSafe(|| pipeline.apply(&original))) {
        Ok(cleaned) => cleaned,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            return Outcome::Error {
                message: format!("transform failed: {}", reason),
            };
        }
    };

    if cleaned == original {
        return Outcome::Unchanged;
    }

    if pipeline_debug_enabled() {
        for ambiguity in pipeline.ambiguities(&original) {
            debug!(
                path = %path.display(),
                first = ambiguity.first,
                second = ambiguity.second,
                span = ?ambiguity.span,
                "rules overlap"
            );
        }
    }

    let bytes_changed = original.len().abs_diff(cleaned.len());
    if !dry_run {
        if let Err(e) = std::fs::write(path, &cleaned) {
            return Outcome::Error {
                message: format!("write failed: {}", e),
            };
        }
    }

    Outcome::Modified { bytes_changed }
}

fn pipeline_debug_enabled() -> bool {
    tracing::enabled!(tracing::Level::DEBUG)
}

/// Clean every file in `files` on a bounded pool.
///
/// `on_report` runs on the calling thread for each finished file, with the
/// number of files finished so far.
pub fn clean_files<F>(
    files: Vec<PathBuf>,
    pipeline: &Pipeline,
    options: CleanupOptions,
    mut on_report: F,
) -> Result<CleanupSummary>
where
    F: FnMut(usize, &FileReport, &CleanupSummary),
{
    let mut summary = CleanupSummary {
        total: files.len(),
        dry_run: options.dry_run,
        ..CleanupSummary::default()
    };

    for_each_completed(
        files,
        options.workers,
        |path| {
            let outcome = clean_file(&path, pipeline, options.dry_run);
            debug!(path = %path.display(), ?outcome, "cleaned");
            FileReport { path, outcome }
        },
        |done, report| {
            if let Outcome::Error { message } = &report.outcome {
                warn!("{}: {}", report.path.display(), message);
            }
            summary.record(&report);
            on_report(done, &report, &summary);
        },
    )?;

    Ok(summary)
}

/// Discover and clean every note under `root`.
pub fn clean_tree(root: &Path, pipeline: &Pipeline, options: CleanupOptions) -> Result<CleanupSummary> {
    let files = discover(root)?;
    clean_files(files, pipeline, options, |_, _, _| {})
}
