use std::fs;
use std::path::Path;

use candle_core::{DType, Device, Module, Tensor};
use image::RgbImage;
use kururi_core::{NUM_CLASSES, Probabilities, RotationClass};
use kururi_vision::{load_image, prepare_input, rotate_upright};

use crate::error::PredictError;

/// Outcome of classifying one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub rotation_class: RotationClass,
    pub probabilities: Probabilities,
}

impl Prediction {
    /// Counter-clockwise correction in degrees.
    #[must_use]
    pub const fn angle(&self) -> u16 {
        self.rotation_class.angle()
    }
}

/// Classify the rotation of `image_path` with an already loaded `model`.
///
/// When `save_rotated` is given, the original image is rotated
/// counter-clockwise by the predicted angle and written there, with the
/// format taken from the extension.
///
/// # Errors
///
/// - [`PredictError::ImageNotFound`] if `image_path` does not exist.
/// - [`PredictError::Vision`] if it cannot be decoded.
/// - [`PredictError::UnexpectedOutput`] if the model does not return 4 logits.
/// - [`PredictError::Io`] / [`PredictError::Save`] if the rotated copy cannot be written.
pub fn predict_with_model<M: Module + ?Sized>(
    image_path: &Path,
    model: &M,
    device: &Device,
    save_rotated: Option<&Path>,
) -> Result<Prediction, PredictError> {
    if !image_path.exists() {
        return Err(PredictError::ImageNotFound {
            path: image_path.to_path_buf(),
        });
    }

    let image = load_image(image_path)?;
    let input = prepare_input(&image)?.to_device(device)?;
    let logits = model.forward(&input)?;
    let probabilities = softmax_probabilities(&logits)?;
    let rotation_class = probabilities.argmax();

    tracing::debug!(
        image = %image_path.display(),
        class = rotation_class.index(),
        probabilities = ?probabilities.as_array(),
        "predicted rotation"
    );

    if let Some(dest) = save_rotated {
        save_rotated_copy(&image, rotation_class, dest)?;
    }

    Ok(Prediction {
        rotation_class,
        probabilities,
    })
}

fn softmax_probabilities(logits: &Tensor) -> Result<Probabilities, PredictError> {
    if logits.elem_count() != NUM_CLASSES {
        return Err(PredictError::UnexpectedOutput {
            shape: logits.dims().to_vec(),
        });
    }
    let flat = logits.to_dtype(DType::F32)?.flatten_all()?;
    let values: Vec<f32> = candle_nn::ops::softmax_last_dim(&flat)?.to_vec1()?;
    Ok(Probabilities::try_from(values)?)
}

fn save_rotated_copy(
    image: &RgbImage,
    class: RotationClass,
    dest: &Path,
) -> Result<(), PredictError> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PredictError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    rotate_upright(image, class)
        .save(dest)
        .map_err(|source| PredictError::Save {
            path: dest.to_path_buf(),
            source,
        })?;
    tracing::debug!(dest = %dest.display(), angle = class.angle(), "saved rotated copy");
    Ok(())
}
