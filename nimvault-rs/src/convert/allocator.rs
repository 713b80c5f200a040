//! Unique output filenames within a folder.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Reserves `<stem>.md`, `<stem>-1.md`, `<stem>-2.md`, ... by creating an
/// empty file, so concurrent workers never pick the same name.
///
/// Within the process, one mutex per folder serializes the probe-and-create
/// sequence; the exclusive create also guards against files appearing from
/// outside.
#[derive(Debug, Default)]
pub struct PathAllocator {
    folders: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty file with a free name in `folder` and return its path.
    pub fn reserve(&self, folder: &Path, stem: &str) -> io::Result<PathBuf> {
        let folder_lock = self.folder_lock(folder);
        let _guard = lock(&folder_lock);

        let mut counter = 0usize;
        loop {
            let candidate = folder.join(candidate_name(stem, counter));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(_) => return Ok(candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => counter += 1,
                Err(e) => return Err(e),
            }
        }
    }

    fn folder_lock(&self, folder: &Path) -> Arc<Mutex<()>> {
        let mut folders = lock(&self.folders);
        folders.entry(folder.to_path_buf()).or_default().clone()
    }
}

fn candidate_name(stem: &str, counter: usize) -> String {
    if counter == 0 {
        format!("{}.md", stem)
    } else {
        format!("{}-{}.md", stem, counter)
    }
}

/// A poisoned lock only means another worker panicked; the map is still valid.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
