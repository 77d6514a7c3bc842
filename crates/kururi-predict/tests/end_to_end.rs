//! Checkpoint on disk -> loaded model -> prediction, with a tiny transformer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use image::{Rgb, RgbImage};
use kururi_core::RotationClass;
use kururi_model::{VisionTransformer, VitConfig, load_model_with_config};
use kururi_predict::{angle_from_class, list_image_files, mirrored_path, predict_with_model};
use pretty_assertions::assert_eq;

fn tiny() -> VitConfig {
    VitConfig {
        image_size: 224,
        patch_size: 56,
        in_channels: 3,
        embed_dim: 8,
        depth: 1,
        num_heads: 2,
        mlp_dim: 16,
        num_classes: 4,
    }
}

/// Writes a `module.`-prefixed checkpoint whose output is `head_bias` for
/// every input, then loads it.
fn model_with_bias(dir: &Path, head_bias: [f32; 4]) -> VisionTransformer {
    let tensors: HashMap<String, Tensor> = tiny()
        .parameter_shapes()
        .into_iter()
        .map(|(name, shape)| {
            let tensor = match name.as_str() {
                "head.bias" => Tensor::new(&head_bias, &Device::Cpu),
                n if n.ends_with("norm1.weight")
                    || n.ends_with("norm2.weight")
                    || n == "norm.weight" =>
                {
                    Tensor::ones(shape, DType::F32, &Device::Cpu)
                }
                _ => Tensor::zeros(shape, DType::F32, &Device::Cpu),
            }
            .expect("tensor");
            (format!("module.{name}"), tensor)
        })
        .collect();

    let path = dir.join("kururi-orient.safetensors");
    candle_core::safetensors::save(&tensors, &path).expect("save checkpoint");
    load_model_with_config(&tiny(), &path, &Device::Cpu).expect("load checkpoint")
}

fn write_image(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdir");
    }
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, 128])
    })
    .save(path)
    .expect("save image");
}

#[test]
fn upright_square_image_is_class_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = model_with_bias(dir.path(), [5.0, 0.0, 0.0, 0.0]);
    let image = dir.path().join("square.png");
    write_image(&image, 64, 64);

    let prediction = predict_with_model(&image, &model, &Device::Cpu, None).expect("predict");

    assert_eq!(prediction.rotation_class, RotationClass::Deg0);
    assert_eq!(angle_from_class(prediction.rotation_class), 0);
    assert!((prediction.probabilities.sum() - 1.0).abs() < 1e-5);
    assert!(prediction.probabilities.get(RotationClass::Deg0) > 0.97);
}

#[test]
fn rotated_copy_uses_predicted_class() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = model_with_bias(dir.path(), [0.0, 5.0, 0.0, 0.0]);
    let image = dir.path().join("wide.png");
    write_image(&image, 40, 20);
    let dest = dir.path().join("fixed").join("wide.png");

    let prediction =
        predict_with_model(&image, &model, &Device::Cpu, Some(&dest)).expect("predict");

    assert_eq!(prediction.rotation_class, RotationClass::Deg90);
    assert_eq!(prediction.angle(), 90);
    let saved = image::open(&dest).expect("rotated copy").to_rgb8();
    assert_eq!(saved.dimensions(), (20, 40));
}

#[test]
fn directory_run_mirrors_layout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = model_with_bias(dir.path(), [0.0, 0.0, 5.0, 0.0]);
    let input = dir.path().join("photos");
    let output = dir.path().join("fixed");
    write_image(&input.join("a.png"), 30, 20);
    write_image(&input.join("trip").join("b.PNG"), 20, 30);
    std::fs::write(input.join("notes.txt"), b"skip me").expect("write");

    let files = list_image_files(&input).expect("scan");
    assert_eq!(files.len(), 2);

    let mut saved: Vec<PathBuf> = Vec::new();
    for file in &files {
        let dest = mirrored_path(&input, file, &output);
        let prediction =
            predict_with_model(file, &model, &Device::Cpu, Some(&dest)).expect("predict");
        assert_eq!(prediction.rotation_class, RotationClass::Deg180);
        saved.push(dest);
    }

    assert_eq!(
        saved,
        vec![output.join("a.png"), output.join("trip").join("b.PNG")]
    );
    assert!(saved.iter().all(|p| p.is_file()));
}
