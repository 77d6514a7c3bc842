//! Recursive discovery of supported image files.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use kururi_core::constants::is_supported_extension;

use crate::error::PredictError;

/// List every supported image under `root`, recursively, sorted by path.
///
/// No ignore rules apply: hidden files and anything a `.gitignore` would
/// exclude are still found. Extensions are matched case-insensitively.
/// A `root` that exists but is not a directory contains no images.
///
/// # Errors
///
/// Returns [`PredictError::DirectoryNotFound`] if `root` does not exist
/// and [`PredictError::Walk`] if traversal fails.
pub fn list_image_files(root: &Path) -> Result<Vec<PathBuf>, PredictError> {
    if !root.exists() {
        return Err(PredictError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "scan root is not a directory");
        return Ok(Vec::new());
    }

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }
        let path = entry.path();
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(is_supported_extension);
        if supported && path.is_file() {
            files.push(entry.into_path());
        }
    }

    files.sort();
    tracing::debug!(root = %root.display(), count = files.len(), "scanned for images");
    Ok(files)
}

/// Where the corrected copy of `file` goes: its path relative to `root`,
/// re-rooted under `output_dir`.
#[must_use]
pub fn mirrored_path(root: &Path, file: &Path, output_dir: &Path) -> PathBuf {
    match file.strip_prefix(root) {
        Ok(relative) => output_dir.join(relative),
        Err(_) => output_dir.join(file.file_name().unwrap_or(file.as_os_str())),
    }
}
