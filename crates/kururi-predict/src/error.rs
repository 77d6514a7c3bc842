use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("image not found: {}", .path.display())]
    ImageNotFound { path: PathBuf },

    #[error("directory not found: {}", .path.display())]
    DirectoryNotFound { path: PathBuf },

    /// The model did not return exactly one logit per rotation class.
    #[error("model returned logits of shape {shape:?}, expected 4 values")]
    UnexpectedOutput { shape: Vec<usize> },

    #[error("failed to save rotated image to {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("directory walk failed: {0}")]
    Walk(#[from] ignore::Error),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Vision(#[from] kururi_vision::VisionError),

    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error(transparent)]
    Core(#[from] kururi_core::CoreError),
}
