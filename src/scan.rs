use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::{error::StartupError, UploadTarget};

/// Lists every `.zip` file below `root`, recursively, sorted by file name.
///
/// # Errors
///
/// Fails on the first entry that cannot be read, including a missing `root`.
pub fn find_archives(root: &Path) -> Result<Vec<UploadTarget>, StartupError> {
    let mut archives = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| StartupError::Scan {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && entry.file_name().to_string_lossy().ends_with(".zip") {
            debug!("Found archive {}", entry.path().display());
            archives.push(UploadTarget::new(entry.into_path()));
        }
    }
    Ok(archives)
}
