//! Export-to-vault conversion.
//!
//! Each note bundle becomes one Markdown file at
//! `<output>/<parents...>/<title>.md` with a YAML preamble, and its
//! attachments are copied into the sibling `assets/` folder.

pub mod allocator;
pub mod bundle;
pub mod converter;
pub mod metadata;
pub mod sanitize;

pub use allocator::PathAllocator;
pub use bundle::{ExportSource, NoteBundle, discover_bundles};
pub use converter::{Converter, ExternalConverter};
pub use metadata::{NoteMetadata, Preamble};
pub use sanitize::sanitize_filename;

use crate::cleanup::pipeline::Pipeline;
use crate::config::Config;
use crate::error::Result;
use crate::pool::for_each_completed;
use sanitize::sanitize_segments;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub workers: usize,
    pub max_filename_length: usize,
    /// Lowercase extensions, without the dot.
    pub asset_extensions: Vec<String>,
    /// Run the full cleanup pipeline over every written note.
    pub clean: bool,
}

impl ConvertOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.workers,
            max_filename_length: config.convert.max_filename_length,
            asset_extensions: config.convert.asset_extensions.clone(),
            clean: false,
        }
    }

    fn is_asset(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.asset_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NoteOutcome {
    Converted { path: PathBuf, assets: usize },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteReport {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub outcome: NoteOutcome,
}

impl NoteReport {
    fn failed(id: &str, title: &str, message: String) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            outcome: NoteOutcome::Failed { message },
        }
    }
}

/// Aggregate counts for a conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConvertSummary {
    pub total: usize,
    pub converted: usize,
    pub failed: usize,
    pub assets_copied: usize,
    pub output: PathBuf,
    pub failures: Vec<NoteReport>,
}

impl ConvertSummary {
    fn record(&mut self, report: &NoteReport) {
        match &report.outcome {
            NoteOutcome::Converted { assets, .. } => {
                self.converted += 1;
                self.assets_copied += assets;
            }
            NoteOutcome::Failed { .. } => {
                self.failed += 1;
                self.failures.push(report.clone());
            }
        }
    }
}

/// Writes converted notes into an output vault.
pub struct VaultWriter<'a, C: Converter> {
    output: PathBuf,
    converter: &'a C,
    allocator: PathAllocator,
    options: ConvertOptions,
}

impl<'a, C: Converter> VaultWriter<'a, C> {
    pub fn new(output: impl Into<PathBuf>, converter: &'a C, options: ConvertOptions) -> Self {
        Self {
            output: output.into(),
            converter,
            allocator: PathAllocator::new(),
            options,
        }
    }

    /// Convert one bundle. Failures are reported, never returned.
    pub fn convert_note(&self, bundle: &NoteBundle) -> NoteReport {
        let html_path = bundle.html_path();
        if !html_path.is_file() {
            return NoteReport::failed(
                &bundle.id,
                "",
                format!("No note.html in {}", bundle.id),
            );
        }

        let metadata = NoteMetadata::load(&bundle.id, &bundle.metadata_path());
        let fail = |message: String| NoteReport::failed(&bundle.id, &metadata.title, message);

        let folder = self.folder_for(&metadata);
        if let Err(e) = fs::create_dir_all(&folder) {
            return fail(format!("Cannot create {}: {}", folder.display(), e));
        }

        let stem = sanitize_filename(&metadata.title, self.options.max_filename_length);
        let path = match self.allocator.reserve(&folder, &stem) {
            Ok(path) => path,
            Err(e) => return fail(format!("Cannot reserve {}.md: {}", stem, e)),
        };

        let document = match self.render(&html_path, &metadata) {
            Ok(document) => document,
            Err(message) => {
                release(&path);
                return fail(message);
            }
        };

        if let Err(e) = fs::write(&path, document) {
            release(&path);
            return fail(format!("Write error for {}: {}", bundle.id, e));
        }

        let assets = match self.copy_assets(&bundle.assets_dir(), &folder) {
            Ok(count) => count,
            Err(e) => return fail(format!("Asset copy failed for {}: {}", bundle.id, e)),
        };

        debug!(id = %bundle.id, path = %path.display(), assets, "converted");
        NoteReport {
            id: bundle.id.clone(),
            title: metadata.title.clone(),
            outcome: NoteOutcome::Converted { path, assets },
        }
    }

    fn folder_for(&self, metadata: &NoteMetadata) -> PathBuf {
        sanitize_segments(&metadata.parents, self.options.max_filename_length)
            .into_iter()
            .fold(self.output.clone(), |folder, segment| folder.join(segment))
    }

    fn render(&self, html_path: &Path, metadata: &NoteMetadata) -> std::result::Result<String, String> {
        let raw = fs::read(html_path).map_err(|e| format!("Cannot read note.html: {}", e))?;
        let raw = String::from_utf8(raw)
            .map_err(|e| format!("note.html of {} is not valid UTF-8: {}", metadata.id, e))?;
        let html = Pipeline::preprocess().apply(&raw);

        let markdown = self
            .converter
            .convert(&html)
            .map_err(|e| format!("Conversion failed for {}: {}", metadata.id, e))?;
        let body = Pipeline::postprocess().apply(&markdown);

        let preamble = metadata
            .preamble()
            .render()
            .map_err(|e| format!("Cannot render preamble for {}: {}", metadata.id, e))?;

        let document = compose(&preamble, &body);
        if self.options.clean {
            Ok(Pipeline::cleanup().apply(&document))
        } else {
            Ok(document)
        }
    }

    fn copy_assets(&self, assets_dir: &Path, folder: &Path) -> std::io::Result<usize> {
        if !assets_dir.is_dir() {
            return Ok(0);
        }

        let target = folder.join("assets");
        let mut copied = 0;
        for entry in fs::read_dir(assets_dir)? {
            let source = entry?.path();
            if !source.is_file() || !self.options.is_asset(&source) {
                continue;
            }
            if let Some(name) = source.file_name() {
                fs::create_dir_all(&target)?;
                fs::copy(&source, target.join(name))?;
                copied += 1;
            }
        }
        Ok(copied)
    }

    /// Convert every bundle on the worker pool.
    ///
    /// `on_report` runs on the calling thread after each note, with the
    /// number of notes finished so far.
    pub fn convert_all<F>(&self, bundles: Vec<NoteBundle>, mut on_report: F) -> Result<ConvertSummary>
    where
        F: FnMut(usize, &NoteReport, &ConvertSummary),
    {
        let mut summary = ConvertSummary {
            total: bundles.len(),
            output: self.output.clone(),
            ..ConvertSummary::default()
        };

        for_each_completed(
            bundles,
            self.options.workers,
            |bundle| self.convert_note(&bundle),
            |done, report| {
                if let NoteOutcome::Failed { message } = &report.outcome {
                    warn!("{}", message);
                }
                summary.record(&report);
                on_report(done, &report, &summary);
            },
        )?;

        Ok(summary)
    }
}

/// Preamble, blank line, body. An empty body leaves the preamble alone.
fn compose(preamble: &str, body: &str) -> String {
    if body.is_empty() {
        preamble.to_string()
    } else {
        format!("{}\n{}\n", preamble, body)
    }
}

/// Drop a reserved but unwritten output file.
fn release(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Cannot remove {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Echoes the HTML back, or fails for inputs containing "FAIL".
    struct FakeConverter {
        calls: AtomicUsize,
    }

    impl FakeConverter {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Converter for FakeConverter {
        fn convert(&self, html: &str) -> std::result::Result<String, ConversionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if html.contains("FAIL") {
                return Err(ConversionError::NonZeroExit {
                    status: "exit status: 1".to_string(),
                    stderr: "boom".to_string(),
                });
            }
            Ok(html.to_string())
        }
    }

    fn make_bundle(root: &Path, id: &str, html: &str, metadata: Option<&str>) -> NoteBundle {
        let dir = root.join(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("note.html"), html).unwrap();
        if let Some(json) = metadata {
            fs::write(dir.join("metadata.json"), json).unwrap();
        }
        NoteBundle {
            id: id.to_string(),
            dir,
        }
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_convert_note_writes_preamble_and_body() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let bundle = make_bundle(
            input.path(),
            "n1",
            "Hello ./assets/pic.png<script>x()</script>",
            Some(r#"{"title": "Greeting", "tags": ["a"], "parents": ["Work", "Q1"]}"#),
        );

        let converter = FakeConverter::new();
        let writer = VaultWriter::new(output.path(), &converter, ConvertOptions::default());
        let report = writer.convert_note(&bundle);

        let expected = output.path().join("Work").join("Q1").join("Greeting.md");
        assert_eq!(
            report.outcome,
            NoteOutcome::Converted {
                path: expected.clone(),
                assets: 0
            }
        );
        assert_eq!(
            read(&expected),
            "---\ntitle: Greeting\ntags:\n- a\nnimbus-id: n1\n---\n\nHello assets/pic.png\n"
        );
    }

    #[test]
    fn test_duplicate_titles_get_suffixes() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let meta = r#"{"title": "Same"}"#;
        let bundles = vec![
            make_bundle(input.path(), "a", "one", Some(meta)),
            make_bundle(input.path(), "b", "two", Some(meta)),
            make_bundle(input.path(), "c", "three", Some(meta)),
        ];

        let converter = FakeConverter::new();
        let writer = VaultWriter::new(output.path(), &converter, ConvertOptions::default());
        let summary = writer.convert_all(bundles, |_, _, _| {}).unwrap();

        assert_eq!(summary.converted, 3);
        for name in ["Same.md", "Same-1.md", "Same-2.md"] {
            assert!(output.path().join(name).is_file(), "missing {}", name);
        }
        let bodies: Vec<String> = ["Same.md", "Same-1.md", "Same-2.md"]
            .iter()
            .map(|n| read(&output.path().join(n)))
            .collect();
        for body in ["one", "two", "three"] {
            assert!(bodies.iter().any(|b| b.ends_with(&format!("\n{}\n", body))));
        }
    }

    #[test]
    fn test_failed_conversion_releases_reservation() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let bundle = make_bundle(input.path(), "bad", "FAIL", Some(r#"{"title": "Broken"}"#));

        let converter = FakeConverter::new();
        let writer = VaultWriter::new(output.path(), &converter, ConvertOptions::default());
        let report = writer.convert_note(&bundle);

        match &report.outcome {
            NoteOutcome::Failed { message } => assert!(message.contains("boom")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(report.title, "Broken");
        assert!(!output.path().join("Broken.md").exists());
    }

    #[test]
    fn test_missing_note_html() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let bundle = NoteBundle {
            id: "ghost".to_string(),
            dir: input.path().join("ghost"),
        };

        let converter = FakeConverter::new();
        let writer = VaultWriter::new(output.path(), &converter, ConvertOptions::default());
        let report = writer.convert_note(&bundle);

        assert_eq!(
            report.outcome,
            NoteOutcome::Failed {
                message: "No note.html in ghost".to_string()
            }
        );
        assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_utf8_html_fails_note() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let bundle = make_bundle(input.path(), "latin", "", Some(r#"{"title": "Latin"}"#));
        fs::write(bundle.html_path(), b"<p>caf\xe9</p>").unwrap();

        let converter = FakeConverter::new();
        let writer = VaultWriter::new(output.path(), &converter, ConvertOptions::default());
        let report = writer.convert_note(&bundle);

        match report.outcome {
            NoteOutcome::Failed { message } => assert!(message.contains("not valid UTF-8")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
        assert!(!output.path().join("Latin.md").exists());
    }

    #[test]
    fn test_batch_continues_past_failures() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let mut bundles: Vec<NoteBundle> = (0..10)
            .map(|i| make_bundle(input.path(), &format!("ok{}", i), "fine", None))
            .collect();
        bundles.push(make_bundle(input.path(), "bad", "FAIL", None));

        let converter = FakeConverter::new();
        let writer = VaultWriter::new(output.path(), &converter, ConvertOptions::default());
        let mut progress = Vec::new();
        let summary = writer
            .convert_all(bundles, |done, _, _| progress.push(done))
            .unwrap();

        assert_eq!(summary.total, 11);
        assert_eq!(summary.converted, 10);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].id, "bad");
        assert_eq!(progress.len(), 11);
        assert!(output.path().join("Untitled ok3.md").is_file());
        assert!(!output.path().join("Untitled bad.md").exists());
    }

    #[test]
    fn test_assets_filtered_by_extension() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let bundle = make_bundle(input.path(), "n", "<img src=\"./assets/a.PNG\">", None);
        let assets = bundle.assets_dir();
        fs::create_dir_all(&assets).unwrap();
        fs::write(assets.join("a.PNG"), b"png").unwrap();
        fs::write(assets.join("clip.mp3"), b"mp3").unwrap();
        fs::write(assets.join("theme.css"), b"css").unwrap();
        fs::write(assets.join("font.woff2"), b"font").unwrap();

        let converter = FakeConverter::new();
        let writer = VaultWriter::new(output.path(), &converter, ConvertOptions::default());
        let report = writer.convert_note(&bundle);

        assert!(matches!(report.outcome, NoteOutcome::Converted { assets: 2, .. }));
        let copied = output.path().join("assets");
        assert!(copied.join("a.PNG").is_file());
        assert!(copied.join("clip.mp3").is_file());
        assert!(!copied.join("theme.css").exists());
        assert!(!copied.join("font.woff2").exists());
    }

    #[test]
    fn test_clean_option_runs_cleanup_pipeline() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let bundle = make_bundle(
            input.path(),
            "n",
            "<b>bold</b> and <span>plain</span>",
            Some(r#"{"title": "Styled"}"#),
        );

        let converter = FakeConverter::new();
        let options = ConvertOptions {
            clean: true,
            ..ConvertOptions::default()
        };
        let writer = VaultWriter::new(output.path(), &converter, options);
        writer.convert_note(&bundle);

        assert_eq!(
            read(&output.path().join("Styled.md")),
            "---\ntitle: Styled\nnimbus-id: n\n---\n**bold** and plain\n"
        );
    }

    #[test]
    fn test_empty_body_leaves_preamble_only() {
        assert_eq!(compose("---\na: 1\n---\n", ""), "---\na: 1\n---\n");
        assert_eq!(compose("---\na: 1\n---\n", "x"), "---\na: 1\n---\n\nx\n");
    }
}
