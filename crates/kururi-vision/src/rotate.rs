use image::RgbImage;
use image::imageops;
use kururi_core::RotationClass;

/// Rotate `image` counter-clockwise by the class angle, expanding the canvas.
///
/// Width and height swap for the 90 and 270 degree classes.
#[must_use]
pub fn rotate_upright(image: &RgbImage, class: RotationClass) -> RgbImage {
    match class {
        RotationClass::Deg0 => image.clone(),
        RotationClass::Deg90 => imageops::rotate270(image),
        RotationClass::Deg180 => imageops::rotate180(image),
        RotationClass::Deg270 => imageops::rotate90(image),
    }
}
