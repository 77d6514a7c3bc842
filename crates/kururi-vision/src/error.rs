use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    /// Decoding or encoding failed, including unreadable files.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Tensor construction failed.
    #[error(transparent)]
    Candle(#[from] candle_core::Error),
}
