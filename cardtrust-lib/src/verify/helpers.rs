//! Small helpers shared by the directory scanners.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Recursively collect the regular files under `dir`, sorted by file name
/// within each directory.
///
/// Entries that cannot be read are logged and skipped. A missing or
/// unreadable root yields an empty list.
pub(crate) fn regular_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        match entry {
            Ok(e) if e.file_type().is_file() => files.push(e.into_path()),
            Ok(_) => {}
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| dir.display().to_string());
                warn!(path = %path, error = %e, "Reading directory entry failed");
            }
        }
    }
    files
}

/// Read a file, logging and discarding I/O errors.
pub(crate) fn read_file(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Reading file failed");
            None
        }
    }
}
