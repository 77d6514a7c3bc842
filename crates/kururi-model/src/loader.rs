use std::collections::{HashMap, HashSet};
use std::path::Path;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;

use crate::error::ModelError;
use crate::state_dict::{read_state_dict, sanitize_state_dict};
use crate::vit::{VisionTransformer, VitConfig};

/// Build the named architecture and load `checkpoint` into it on `device`.
///
/// # Errors
///
/// Returns [`ModelError::UnknownArchitecture`] for unregistered names, plus
/// everything [`load_model_with_config`] can return.
pub fn load_model(
    architecture: &str,
    checkpoint: &Path,
    device: &Device,
) -> Result<VisionTransformer, ModelError> {
    let config = VitConfig::from_name(architecture)?;
    load_model_with_config(&config, checkpoint, device)
}

/// Load `checkpoint` into a model described by `config`.
///
/// Loading is strict: the sanitized checkpoint must contain exactly the
/// parameters of [`VitConfig::expected_keys`].
///
/// # Errors
///
/// - [`ModelError::Io`] / [`ModelError::Candle`] if the file cannot be read.
/// - [`ModelError::KeyMismatch`] if parameter names differ.
/// - [`ModelError::Candle`] if a parameter has the wrong shape.
pub fn load_model_with_config(
    config: &VitConfig,
    checkpoint: &Path,
    device: &Device,
) -> Result<VisionTransformer, ModelError> {
    let entries = sanitize_state_dict(read_state_dict(checkpoint)?);
    check_keys(config, entries.iter().map(|(key, _)| key.as_str()))?;

    let tensors: HashMap<_, _> = entries.into_iter().collect();
    let vb = VarBuilder::from_tensors(tensors, DType::F32, device);
    let model = VisionTransformer::new(config, vb)?;

    tracing::info!(
        checkpoint = %checkpoint.display(),
        embed_dim = config.embed_dim,
        depth = config.depth,
        "model loaded"
    );
    Ok(model)
}

/// Compare checkpoint keys against the parameters `config` needs.
///
/// # Errors
///
/// Returns [`ModelError::KeyMismatch`] listing missing keys in model order and
/// unexpected keys in checkpoint order.
pub fn check_keys<'a>(
    config: &VitConfig,
    keys: impl IntoIterator<Item = &'a str>,
) -> Result<(), ModelError> {
    let expected = config.expected_keys();
    let expected_set: HashSet<&str> = expected.iter().map(String::as_str).collect();

    let mut present = HashSet::new();
    let mut unexpected = Vec::new();
    for key in keys {
        if expected_set.contains(key) {
            present.insert(key);
        } else {
            unexpected.push(key.to_string());
        }
    }

    let missing: Vec<String> = expected
        .iter()
        .filter(|key| !present.contains(key.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }
    Err(ModelError::KeyMismatch {
        missing,
        unexpected,
    })
}
