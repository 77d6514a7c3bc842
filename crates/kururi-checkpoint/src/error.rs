//! Checkpoint provisioning error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while making a checkpoint available locally.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// No usable local file and no download source configured.
    #[error(
        "checkpoint is missing at {}; provide a URL via --checkpoint-url or KURURI_MODEL_URL",
        .path.display()
    )]
    MissingSource { path: PathBuf },

    /// Transport-level failure (HTTP status, connection, timeout) while downloading.
    #[error("download failed from {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The downloaded file does not match the expected digest. The file has
    /// already been removed.
    #[error(
        "checksum mismatch after download of {}: expected {expected}, got {actual}",
        .path.display()
    )]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Local filesystem error.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckpointError {
    pub(crate) fn download(
        url: &str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Download {
            url: url.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
