//! Flag > config > built-in default resolution.

use std::path::PathBuf;
use std::time::Duration;

use kururi_core::constants::{
    DEFAULT_CHECKPOINT_PATH, DEFAULT_DEVICE, DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_MODEL_NAME,
    DEFAULT_MODEL_URL,
};

use crate::KururiConfig;

/// Values given explicitly on the command line. `None` means "not passed".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub checkpoint: Option<PathBuf>,
    pub model_url: Option<String>,
    pub model_sha256: Option<String>,
    pub download_timeout: Option<u64>,
    pub model_name: Option<String>,
    pub device: Option<String>,
}

/// Fully resolved settings for one `predict` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub checkpoint: PathBuf,
    pub model_url: Option<String>,
    /// `None` disables integrity verification.
    pub model_sha256: Option<String>,
    pub download_timeout: Duration,
    pub model_name: String,
    pub device: String,
}

pub(crate) fn resolve(config: &KururiConfig, overrides: &CliOverrides) -> ResolvedSettings {
    let checkpoint = overrides
        .checkpoint
        .clone()
        .filter(|path| !path.as_os_str().is_empty())
        .or_else(|| Some(config.checkpoint.clone()).filter(|path| !path.as_os_str().is_empty()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CHECKPOINT_PATH));

    let model_url = first_non_empty(overrides.model_url.as_deref(), &config.model_url)
        .or_else(|| Some(String::from(DEFAULT_MODEL_URL)));

    let model_sha256 = first_non_empty(overrides.model_sha256.as_deref(), &config.model_sha256);

    let timeout_secs = overrides
        .download_timeout
        .filter(|secs| *secs > 0)
        .or_else(|| Some(config.model_timeout).filter(|secs| *secs > 0))
        .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS);

    let model_name = first_non_empty(overrides.model_name.as_deref(), &config.model_name)
        .unwrap_or_else(|| String::from(DEFAULT_MODEL_NAME));

    let device = first_non_empty(overrides.device.as_deref(), &config.device)
        .unwrap_or_else(|| String::from(DEFAULT_DEVICE));

    ResolvedSettings {
        checkpoint,
        model_url,
        model_sha256,
        download_timeout: Duration::from_secs(timeout_secs),
        model_name,
        device,
    }
}

fn first_non_empty(flag: Option<&str>, configured: &str) -> Option<String> {
    flag.map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| Some(configured.trim()).filter(|value| !value.is_empty()))
        .map(String::from)
}
