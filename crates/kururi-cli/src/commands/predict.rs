use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use candle_core::{Device, Module};
use kururi_checkpoint::ensure_checkpoint_with;
use kururi_config::KururiConfig;
use kururi_model::{load_model, parse_device};
use kururi_predict::{Prediction, list_image_files, mirrored_path, predict_with_model};

use crate::cli::{GlobalFlags, InputMode, PredictArgs};
use crate::progress::DownloadReporter;

/// Handle `kururi predict`.
pub fn handle(args: &PredictArgs, _flags: &GlobalFlags) -> anyhow::Result<()> {
    let mode = args
        .input_mode()
        .context("predict: exactly one of --image or --dir is required")?;
    warn_ignored_flags(args, &mode);

    let config = KururiConfig::load_with_dotenv().context("failed to load configuration")?;
    let settings = config.resolve(&args.overrides());
    let device = parse_device(&settings.device)?;

    let checkpoint_name = settings
        .checkpoint
        .file_name()
        .map_or_else(|| settings.checkpoint.display().to_string(), |name| {
            name.to_string_lossy().into_owned()
        });
    let mut reporter = DownloadReporter::new(checkpoint_name);
    ensure_checkpoint_with(
        &settings.checkpoint,
        settings.model_url.as_deref(),
        settings.model_sha256.as_deref(),
        settings.download_timeout,
        &mut reporter,
    )?;

    let model = load_model(&settings.model_name, &settings.checkpoint, &device)
        .with_context(|| format!("failed to load model '{}'", settings.model_name))?;

    let mut stdout = io::stdout().lock();
    match mode {
        InputMode::Image(image) => run_single(
            &image,
            args.save_rotated.as_deref(),
            &model,
            &device,
            &mut stdout,
        ),
        InputMode::Dir(dir) => run_directory(
            &dir,
            args.save_rotated_dir.as_deref(),
            args.skip_broken,
            &model,
            &device,
            &mut stdout,
        ),
    }
}

fn warn_ignored_flags(args: &PredictArgs, mode: &InputMode) {
    match mode {
        InputMode::Image(_) => {
            if args.save_rotated_dir.is_some() {
                tracing::warn!("--save-rotated-dir only applies to --dir; ignoring it");
            }
            if args.skip_broken {
                tracing::warn!("--skip-broken only applies to --dir; ignoring it");
            }
        }
        InputMode::Dir(_) => {
            if args.save_rotated.is_some() {
                tracing::warn!("--save-rotated only applies to --image; use --save-rotated-dir");
            }
        }
    }
}

fn run_single<M: Module>(
    image: &Path,
    save_rotated: Option<&Path>,
    model: &M,
    device: &Device,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let prediction = predict_with_model(image, model, device, save_rotated)?;
    out.write_all(format_single(&prediction, save_rotated).as_bytes())?;
    Ok(())
}

fn run_directory<M: Module>(
    root: &Path,
    save_dir: Option<&Path>,
    skip_broken: bool,
    model: &M,
    device: &Device,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let files = list_image_files(root)?;
    if files.is_empty() {
        writeln!(out, "No supported images found under {}", root.display())?;
        return Ok(());
    }

    for file in &files {
        let dest = save_dir.map(|dir| mirrored_path(root, file, dir));
        match predict_with_model(file, model, device, dest.as_deref()) {
            Ok(prediction) => writeln!(out, "{}", format_batch_line(file, &prediction))?,
            Err(error) if skip_broken => {
                tracing::debug!(file = %file.display(), %error, "skipping image");
                writeln!(out, "{}: skipped ({error})", file.display())?;
            }
            Err(error) => {
                return Err(error).with_context(|| format!("failed on {}", file.display()));
            }
        }
    }

    if let Some(dir) = save_dir {
        writeln!(out, "rotated_images_saved_under={}", dir.display())?;
    }
    Ok(())
}

fn format_single(prediction: &Prediction, saved: Option<&Path>) -> String {
    let mut text = format!(
        "rotation_class={} angle_ccw={}\n",
        prediction.rotation_class,
        prediction.angle()
    );
    for (class, probability) in prediction.probabilities.iter() {
        let _ = writeln!(text, "class_{class}: {probability:.4}");
    }
    if let Some(path) = saved {
        let _ = writeln!(text, "rotated_image_saved={}", path.display());
    }
    text
}

fn format_batch_line(path: &Path, prediction: &Prediction) -> String {
    let mut line = format!(
        "{}: rotation_class={} angle_ccw={}",
        path.display(),
        prediction.rotation_class,
        prediction.angle()
    );
    for (class, probability) in prediction.probabilities.iter() {
        let _ = write!(line, " class_{class}:{probability:.4}");
    }
    line
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use candle_core::Tensor;
    use image::{Rgb, RgbImage};
    use kururi_core::{Probabilities, RotationClass};
    use pretty_assertions::assert_eq;

    use super::*;

    struct FixedLogits([f32; 4]);

    impl Module for FixedLogits {
        fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
            Tensor::new(&self.0, xs.device())?.reshape((1, 4))
        }
    }

    fn prediction() -> Prediction {
        Prediction {
            rotation_class: RotationClass::Deg270,
            probabilities: Probabilities::new([0.1, 0.2, 0.3, 0.4]),
        }
    }

    fn write_image(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        RgbImage::from_pixel(12, 8, Rgb([40, 80, 120]))
            .save(path)
            .expect("save");
    }

    fn output(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).expect("utf8")
    }

    #[test]
    fn single_report_lists_every_class() {
        assert_eq!(
            format_single(&prediction(), None),
            "rotation_class=3 angle_ccw=270\n\
             class_0: 0.1000\n\
             class_1: 0.2000\n\
             class_2: 0.3000\n\
             class_3: 0.4000\n"
        );
    }

    #[test]
    fn single_report_mentions_saved_copy() {
        let text = format_single(&prediction(), Some(Path::new("out/fixed.jpg")));
        assert!(text.ends_with("class_3: 0.4000\nrotated_image_saved=out/fixed.jpg\n"));
    }

    #[test]
    fn batch_line_is_one_line_per_file() {
        assert_eq!(
            format_batch_line(Path::new("photos/a.jpg"), &prediction()),
            "photos/a.jpg: rotation_class=3 angle_ccw=270 \
             class_0:0.1000 class_1:0.2000 class_2:0.3000 class_3:0.4000"
        );
    }

    #[test]
    fn single_run_writes_report_and_copy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = dir.path().join("in.png");
        write_image(&image);
        let dest = dir.path().join("out.png");
        let mut out = Vec::new();

        run_single(
            &image,
            Some(&dest),
            &FixedLogits([0.0, 6.0, 0.0, 0.0]),
            &Device::Cpu,
            &mut out,
        )
        .expect("run");

        let text = output(out);
        assert!(text.starts_with("rotation_class=1 angle_ccw=90\n"));
        assert!(text.ends_with(&format!("rotated_image_saved={}\n", dest.display())));
        assert!(dest.is_file());
    }

    #[test]
    fn empty_directory_reports_nothing_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut out = Vec::new();

        run_directory(
            dir.path(),
            None,
            false,
            &FixedLogits([0.0; 4]),
            &Device::Cpu,
            &mut out,
        )
        .expect("run");

        assert_eq!(
            output(out),
            format!("No supported images found under {}\n", dir.path().display())
        );
    }

    #[test]
    fn broken_images_are_skipped_when_requested() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("photos");
        write_image(&root.join("a.png"));
        let broken = root.join("b.jpg");
        std::fs::write(&broken, b"not an image").expect("write");
        write_image(&root.join("sub").join("c.png"));
        let saved = dir.path().join("fixed");
        let mut out = Vec::new();

        run_directory(
            &root,
            Some(&saved),
            true,
            &FixedLogits([3.0, 0.0, 0.0, 0.0]),
            &Device::Cpu,
            &mut out,
        )
        .expect("run");

        let text = output(out);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with(&format!(
            "{}: rotation_class=0 angle_ccw=0 class_0:",
            root.join("a.png").display()
        )));
        assert!(lines[1].starts_with(&format!("{}: skipped (", broken.display())));
        assert_eq!(
            lines[3],
            format!("rotated_images_saved_under={}", saved.display())
        );
        assert!(saved.join("sub").join("c.png").is_file());
        assert!(!saved.join("b.jpg").exists());
    }

    #[test]
    fn broken_image_aborts_without_skip() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_image(&dir.path().join("a.png"));
        let broken = dir.path().join("b.jpg");
        std::fs::write(&broken, b"not an image").expect("write");
        let mut out = Vec::new();

        let err = run_directory(
            dir.path(),
            None,
            false,
            &FixedLogits([0.0; 4]),
            &Device::Cpu,
            &mut out,
        )
        .unwrap_err();

        assert!(format!("{err:#}").contains(&broken.display().to_string()));
        assert_eq!(output(out).lines().count(), 1);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing: PathBuf = dir.path().join("absent");
        let mut out = Vec::new();

        let err = run_directory(
            &missing,
            None,
            true,
            &FixedLogits([0.0; 4]),
            &Device::Cpu,
            &mut out,
        )
        .unwrap_err();
        assert!(err.to_string().contains("directory not found"));
    }
}
