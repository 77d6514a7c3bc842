//! Built-in defaults used when neither a CLI flag, an environment variable,
//! nor a config file provides a value.

/// Local checkpoint path used when `--checkpoint` is not given.
pub const DEFAULT_CHECKPOINT_PATH: &str = "models/kururi-orient-v1.pth";

/// Download source used when no URL is configured.
pub const DEFAULT_MODEL_URL: &str =
    "https://huggingface.co/kururi-ai/kururi-orient/resolve/main/kururi-orient-v1.pth";

/// Network timeout in seconds for the checkpoint download.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Classifier architecture the published checkpoint was trained with.
pub const DEFAULT_MODEL_NAME: &str = "vit_large_patch16_224";

pub const DEFAULT_DEVICE: &str = "cpu";

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 224;

/// Lowercase file extensions picked up by directory scans.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

/// Returns true if `extension` (without the dot) is in [`SUPPORTED_EXTENSIONS`],
/// ignoring ASCII case.
#[must_use]
pub fn is_supported_extension(extension: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|supported| supported.eq_ignore_ascii_case(extension))
}
