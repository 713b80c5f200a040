//! Export input: a directory of note bundles, or a zip archive of one.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Folder some exports wrap their bundles in.
pub const COMBINED_EXTRACT: &str = "combined-extract";

/// One exported note: `<id>/note.html`, `<id>/metadata.json`, `<id>/assets/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteBundle {
    pub id: String,
    pub dir: PathBuf,
}

impl NoteBundle {
    pub fn html_path(&self) -> PathBuf {
        self.dir.join("note.html")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join("metadata.json")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.dir.join("assets")
    }
}

/// Where bundles are read from. An extracted archive lives in a temporary
/// directory that is removed when this value is dropped.
#[derive(Debug)]
pub enum ExportSource {
    Directory(PathBuf),
    Archive { extracted: TempDir, root: PathBuf },
}

impl ExportSource {
    /// Open a directory as-is, or extract a `.zip` file.
    pub fn open(input: &Path) -> Result<Self> {
        if !input.exists() {
            return Err(Error::PathNotFound(input.to_path_buf()));
        }
        if input.is_dir() {
            return Ok(ExportSource::Directory(input.to_path_buf()));
        }
        if is_zip(input) {
            return extract(input);
        }
        Err(Error::NotADirectory(input.to_path_buf()))
    }

    /// Directory that directly contains the bundles.
    pub fn root(&self) -> &Path {
        match self {
            ExportSource::Directory(path) => path,
            ExportSource::Archive { root, .. } => root,
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, ExportSource::Archive { .. })
    }
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

fn extract(archive: &Path) -> Result<ExportSource> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;

    let extracted = tempfile::Builder::new().prefix("nimvault-").tempdir()?;
    let target = extracted.path().join("extracted");
    fs::create_dir_all(&target)?;
    zip.extract(&target)?;
    debug!("extracted {} entries into {}", zip.len(), target.display());

    let combined = target.join(COMBINED_EXTRACT);
    let root = if combined.is_dir() { combined } else { target };
    Ok(ExportSource::Archive { extracted, root })
}

/// Every immediate subdirectory of `root` that contains `note.html`,
/// sorted by id.
pub fn discover_bundles(root: &Path) -> Result<Vec<NoteBundle>> {
    let mut bundles = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry in {}: {}", root.display(), e);
                continue;
            }
        };
        let dir = entry.path();
        if dir.is_dir() && dir.join("note.html").is_file() {
            bundles.push(NoteBundle {
                id: entry.file_name().to_string_lossy().into_owned(),
                dir,
            });
        }
    }

    bundles.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(bundles)
}
