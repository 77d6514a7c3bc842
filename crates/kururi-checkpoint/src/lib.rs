//! # kururi-checkpoint
//!
//! Makes sure a model checkpoint exists locally and matches its expected
//! SHA-256 digest, downloading it when absent or corrupt.
//!
//! ## Lifecycle
//!
//! ```text
//! absent ──download──▶ <name>.download ──rename──▶ <name> ──verify──▶ usable
//!                                                          └─mismatch─▶ deleted, error
//! ```
//!
//! A file that already exists is trusted as-is when no digest is configured.
//! When a digest is configured and the existing file does not match, it is
//! deleted and fetched again. There are no retries: a failed download needs a
//! new invocation.

pub mod digest;
pub mod download;
mod error;

pub use digest::{CHUNK_SIZE, digests_match, sha256_file};
pub use download::{DownloadObserver, SilentObserver, download_file, temp_path_for};
pub use error::CheckpointError;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

/// Ensure `path` holds a usable checkpoint, without progress reporting.
///
/// See [`ensure_checkpoint_with`].
///
/// # Errors
///
/// Same as [`ensure_checkpoint_with`].
pub fn ensure_checkpoint(
    path: &Path,
    url: Option<&str>,
    expected_sha256: Option<&str>,
    timeout: Duration,
) -> Result<(), CheckpointError> {
    ensure_checkpoint_with(path, url, expected_sha256, timeout, &mut SilentObserver)
}

/// Ensure `path` holds a usable checkpoint, reporting download progress to `observer`.
///
/// # Errors
///
/// - [`CheckpointError::MissingSource`] if no usable file exists and `url` is `None`.
/// - [`CheckpointError::Download`] if the transfer fails.
/// - [`CheckpointError::ChecksumMismatch`] if the downloaded file does not
///   match `expected_sha256` (the file is removed).
/// - [`CheckpointError::Io`] for local filesystem failures.
pub fn ensure_checkpoint_with(
    path: &Path,
    url: Option<&str>,
    expected_sha256: Option<&str>,
    timeout: Duration,
    observer: &mut dyn DownloadObserver,
) -> Result<(), CheckpointError> {
    let expected = expected_sha256.map(str::trim).filter(|s| !s.is_empty());

    if path.exists() {
        let Some(expected) = expected else {
            tracing::debug!(path = %path.display(), "using existing checkpoint without verification");
            return Ok(());
        };

        let actual = sha256_file(path)?;
        if digests_match(&actual, expected) {
            tracing::debug!(path = %path.display(), "existing checkpoint verified");
            return Ok(());
        }

        tracing::warn!(
            path = %path.display(),
            expected,
            actual = %actual,
            "existing checkpoint failed verification; removing it"
        );
        remove_if_present(path)?;
    }

    let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
        return Err(CheckpointError::MissingSource {
            path: path.to_path_buf(),
        });
    };

    tracing::info!(url, path = %path.display(), "checkpoint not found, downloading");
    download_file(url, path, timeout, observer)?;

    if let Some(expected) = expected {
        let actual = sha256_file(path)?;
        if !digests_match(&actual, expected) {
            remove_if_present(path)?;
            return Err(CheckpointError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected: expected.to_string(),
                actual,
            });
        }
        tracing::debug!(path = %path.display(), "downloaded checkpoint verified");
    }

    Ok(())
}

fn remove_if_present(path: &Path) -> Result<(), CheckpointError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(CheckpointError::io(path, e)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_without_url_is_missing_source() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let dest = dir.path().join("model.pth");

        let err = ensure_checkpoint(&dest, None, None, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, CheckpointError::MissingSource { .. }));
        assert!(err.to_string().contains("KURURI_MODEL_URL"));
    }

    #[test]
    fn blank_url_counts_as_missing() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let dest = dir.path().join("model.pth");

        let err = ensure_checkpoint(&dest, Some("  "), None, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, CheckpointError::MissingSource { .. }));
    }

    #[test]
    fn existing_file_is_trusted_without_digest() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let dest = dir.path().join("model.pth");
        std::fs::write(&dest, b"anything").expect("write should succeed");

        ensure_checkpoint(&dest, None, None, Duration::from_secs(1))
            .expect("existing file should be accepted");
        assert_eq!(std::fs::read(&dest).expect("read"), b"anything");
    }

    #[test]
    fn existing_file_with_matching_digest_is_kept() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let dest = dir.path().join("model.pth");
        std::fs::write(&dest, b"hello").expect("write should succeed");

        ensure_checkpoint(
            &dest,
            None,
            Some("2CF24DBA5FB0A30E26E83B2AC5B9E29E1B161E5C1FA7425E73043362938B9824"),
            Duration::from_secs(1),
        )
        .expect("matching digest should be accepted");
        assert!(dest.exists());
    }

    #[test]
    fn corrupt_existing_file_is_removed_before_source_check() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let dest = dir.path().join("model.pth");
        std::fs::write(&dest, b"corrupt").expect("write should succeed");

        let err = ensure_checkpoint(&dest, None, Some("deadbeef"), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, CheckpointError::MissingSource { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn removing_absent_file_is_ok() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        remove_if_present(&dir.path().join("never-written.pth"))
            .expect("a missing file needs no removal");
    }

    #[test]
    fn removal_failure_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let blocked = dir.path().join("model.pth");
        std::fs::create_dir(&blocked).expect("mkdir should succeed");

        let err = remove_if_present(&blocked).unwrap_err();
        assert!(matches!(err, CheckpointError::Io { ref path, .. } if path == &blocked));
        assert!(blocked.exists());
    }
}
