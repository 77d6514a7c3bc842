//! Decoding and the fixed resize / crop / resize pipeline feeding the classifier.
//!
//! ```text
//! file ─▶ RGB8 ─▶ shrink short edge to ≤224 ─▶ crop to [3:4, 4:3] ─▶ 224×224 bicubic ─▶ (1,3,224,224) f32
//! ```

use std::path::Path;

use candle_core::{Device, Tensor};
use image::imageops::{self, FilterType};
use image::{ImageError, ImageReader, RgbImage};
use kururi_core::constants::INPUT_SIZE;

use crate::error::VisionError;

const WIDE_LIMIT: f64 = 4.0 / 3.0;
const TALL_LIMIT: f64 = 3.0 / 4.0;

/// Decode an image file and convert it to 8-bit RGB, dropping any alpha.
///
/// The format is detected from the file content, not the extension.
///
/// # Errors
///
/// Returns [`VisionError::Image`] if the file cannot be opened or decoded.
pub fn load_image(path: &Path) -> Result<RgbImage, VisionError> {
    let image = ImageReader::open(path)
        .map_err(ImageError::IoError)?
        .with_guessed_format()
        .map_err(ImageError::IoError)?
        .decode()?;
    tracing::debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "decoded image"
    );
    Ok(image.to_rgb8())
}

/// Run the full preprocessing pipeline and return a `(1, 3, 224, 224)` tensor
/// on the CPU with values in `[0, 1]`.
///
/// # Errors
///
/// Returns [`VisionError::Candle`] if the tensor cannot be built.
pub fn prepare_input(image: &RgbImage) -> Result<Tensor, VisionError> {
    let limited = resize_to_limit(image, INPUT_SIZE);
    let cropped = auto_crop(&limited);
    let resized = imageops::resize(&cropped, INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom);
    to_chw_tensor(&resized)
}

/// Shrink so the short edge is at most `limit`, keeping the aspect ratio.
/// Images already within the limit are returned unchanged.
#[must_use]
pub fn resize_to_limit(image: &RgbImage, limit: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let target = if width < height && width > limit {
        Some((limit, scaled(limit, width, height)))
    } else if height > limit {
        Some((scaled(limit, height, width), limit))
    } else {
        None
    };

    match target {
        Some((w, h)) => {
            tracing::debug!(from = ?(width, height), to = ?(w, h), "shrinking image");
            imageops::resize(image, w, h, FilterType::CatmullRom)
        }
        None => image.clone(),
    }
}

/// Crop the centre so the aspect ratio lands within `[3:4, 4:3]`.
///
/// Wider images lose columns, taller images lose rows. Crop box edges are
/// rounded half-to-even.
#[must_use]
pub fn auto_crop(image: &RgbImage) -> RgbImage {
    let (x, y, w, h) = crop_box(image.width(), image.height());
    if (x, y, w, h) == (0, 0, image.width(), image.height()) {
        return image.clone();
    }
    imageops::crop_imm(image, x, y, w, h).to_image()
}

/// `(x, y, width, height)` of the centred crop for a `width × height` image.
#[must_use]
pub fn crop_box(width: u32, height: u32) -> (u32, u32, u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0, width, height);
    }
    let (w, h) = (f64::from(width), f64::from(height));
    let ratio = w / h;

    if ratio > WIDE_LIMIT {
        let new_width = (h * 4.0 / 3.0).trunc();
        let (start, len) = centred_span(w, new_width);
        (start, 0, len, height)
    } else if ratio < TALL_LIMIT {
        let new_height = (w * 4.0 / 3.0).trunc();
        let (start, len) = centred_span(h, new_height);
        (0, start, width, len)
    } else {
        (0, 0, width, height)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn centred_span(full: f64, kept: f64) -> (u32, u32) {
    let offset = (full - kept) / 2.0;
    let start = offset.round_ties_even();
    let end = (offset + kept).round_ties_even();
    (start as u32, (end - start).max(1.0) as u32)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled(limit: u32, edge: u32, other: u32) -> u32 {
    let value = (f64::from(limit) / f64::from(edge) * f64::from(other)).trunc();
    (value as u32).max(1)
}

fn to_chw_tensor(image: &RgbImage) -> Result<Tensor, VisionError> {
    let (width, height) = image.dimensions();
    let plane = (width as usize) * (height as usize);
    let mut data = vec![0f32; plane * 3];

    for (i, pixel) in image.pixels().enumerate() {
        let [r, g, b] = pixel.0;
        data[i] = f32::from(r) / 255.0;
        data[plane + i] = f32::from(g) / 255.0;
        data[2 * plane + i] = f32::from(b) / 255.0;
    }

    let tensor = Tensor::from_vec(data, (1, 3, height as usize, width as usize), &Device::Cpu)?;
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn prepare_input_has_model_shape_and_unit_range() {
        let tensor = prepare_input(&gradient(320, 180)).expect("preprocess");
        assert_eq!(tensor.dims(), &[1, 3, 224, 224]);

        let values: Vec<f32> = tensor.flatten_all().unwrap().to_vec1().unwrap();
        assert!(values.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)));
    }

    #[test]
    fn prepare_input_handles_tiny_images() {
        let tensor = prepare_input(&gradient(3, 2)).expect("preprocess");
        assert_eq!(tensor.dims(), &[1, 3, 224, 224]);
    }

    #[rstest]
    #[case::landscape(1000, 500, (448, 224))]
    #[case::portrait(500, 1000, (224, 448))]
    #[case::square(640, 640, (224, 224))]
    #[case::small_is_kept(100, 50, (100, 50))]
    #[case::portrait_under_limit_width(200, 300, (149, 224))]
    fn resize_limits_short_edge(
        #[case] width: u32,
        #[case] height: u32,
        #[case] expected: (u32, u32),
    ) {
        let resized = resize_to_limit(&gradient(width, height), 224);
        assert_eq!(resized.dimensions(), expected);
    }

    #[rstest]
    #[case::panoramic(400, 100, (134, 0, 132, 100))]
    #[case::wide_16_9(320, 180, (40, 0, 240, 180))]
    #[case::tall(100, 400, (0, 134, 100, 132))]
    #[case::four_three_kept(400, 300, (0, 0, 400, 300))]
    #[case::three_four_kept(300, 400, (0, 0, 300, 400))]
    #[case::square_kept(224, 224, (0, 0, 224, 224))]
    fn crop_box_bounds_aspect(
        #[case] width: u32,
        #[case] height: u32,
        #[case] expected: (u32, u32, u32, u32),
    ) {
        assert_eq!(crop_box(width, height), expected);
    }

    #[test]
    fn crop_rounds_half_to_even() {
        // new_width = 4, offset = 2.5 -> rounds to 2, end 6.5 -> 6.
        assert_eq!(crop_box(9, 3), (2, 0, 4, 3));
    }

    #[test]
    fn auto_crop_keeps_centre_pixels() {
        let image = gradient(400, 100);
        let cropped = auto_crop(&image);
        assert_eq!(cropped.dimensions(), (132, 100));
        assert_eq!(cropped.get_pixel(0, 0), image.get_pixel(134, 0));
    }

    #[test]
    fn load_image_drops_alpha() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rgba.png");
        image::RgbaImage::from_pixel(4, 3, image::Rgba([10, 20, 30, 40]))
            .save(&path)
            .expect("save png");

        let loaded = load_image(&path).expect("load");
        assert_eq!(loaded.dimensions(), (4, 3));
        assert_eq!(loaded.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn load_image_detects_format_from_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let png = dir.path().join("image.png");
        gradient(5, 5).save(&png).expect("save png");
        let misnamed = dir.path().join("image.jpg");
        std::fs::rename(&png, &misnamed).expect("rename");

        assert_eq!(load_image(&misnamed).expect("load").dimensions(), (5, 5));
    }

    #[test]
    fn load_image_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not an image").expect("write");

        assert!(matches!(load_image(&path), Err(VisionError::Image(_))));
    }

    #[test]
    fn load_image_missing_file_is_image_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_image(&dir.path().join("absent.png")).unwrap_err();
        assert!(matches!(err, VisionError::Image(ImageError::IoError(_))));
    }
}
