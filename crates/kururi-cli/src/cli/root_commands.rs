use std::path::PathBuf;

use clap::{ArgGroup, Args, Subcommand};
use kururi_config::CliOverrides;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Predict the rotation of an image or of every image in a directory.
    Predict(PredictArgs),
}

#[derive(Clone, Debug, Args)]
#[command(group(ArgGroup::new("input").required(true).args(["image", "dir"])))]
pub struct PredictArgs {
    /// Single image to classify
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Directory to scan recursively for images
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Local checkpoint path [default: models/kururi-orient-v1.pth]
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Download URL used when the checkpoint is missing (env: KURURI_MODEL_URL)
    #[arg(long)]
    pub checkpoint_url: Option<String>,

    /// Expected SHA-256 of the checkpoint (env: KURURI_MODEL_SHA256)
    #[arg(long)]
    pub checkpoint_sha256: Option<String>,

    /// Download timeout in seconds [default: 60] (env: KURURI_MODEL_TIMEOUT)
    #[arg(long)]
    pub download_timeout: Option<u64>,

    /// Classifier architecture [default: vit_large_patch16_224]
    #[arg(long)]
    pub model_name: Option<String>,

    /// Compute device: cpu, cuda, gpu or cuda:N [default: cpu]
    #[arg(long)]
    pub device: Option<String>,

    /// Where to write the corrected copy of --image
    #[arg(long)]
    pub save_rotated: Option<PathBuf>,

    /// Directory receiving corrected copies of --dir images, mirroring its layout
    #[arg(long)]
    pub save_rotated_dir: Option<PathBuf>,

    /// Report unreadable images in --dir and continue instead of aborting
    #[arg(long)]
    pub skip_broken: bool,
}

/// The input chosen through the required `--image` / `--dir` group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    Image(PathBuf),
    Dir(PathBuf),
}

impl PredictArgs {
    /// Resolve the `input` group. Clap guarantees exactly one of the two is
    /// set when parsing from the command line.
    #[must_use]
    pub fn input_mode(&self) -> Option<InputMode> {
        match (&self.image, &self.dir) {
            (Some(image), None) => Some(InputMode::Image(image.clone())),
            (None, Some(dir)) => Some(InputMode::Dir(dir.clone())),
            _ => None,
        }
    }

    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            checkpoint: self.checkpoint.clone(),
            model_url: self.checkpoint_url.clone(),
            model_sha256: self.checkpoint_sha256.clone(),
            download_timeout: self.download_timeout,
            model_name: self.model_name.clone(),
            device: self.device.clone(),
        }
    }
}
