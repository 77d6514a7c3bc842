//! Reading checkpoint files into ordered `(name, tensor)` entries.

use std::path::Path;

use candle_core::{Device, Tensor};

use crate::error::ModelError;

/// Prefix added to every parameter name by data-parallel training wrappers.
pub const DATA_PARALLEL_PREFIX: &str = "module.";

/// On-disk checkpoint encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointFormat {
    /// PyTorch `torch.save` archive (`.pth`, `.pt`, `.bin`, ...).
    Pickle,
    Safetensors,
}

impl CheckpointFormat {
    /// `.safetensors` files are read as such, everything else as a PyTorch archive.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let is_safetensors = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("safetensors"));
        if is_safetensors {
            Self::Safetensors
        } else {
            Self::Pickle
        }
    }
}

/// Read every tensor in `path` onto the CPU.
///
/// Pickle archives keep their stored order; safetensors entries are sorted by
/// name since the format carries no order.
///
/// # Errors
///
/// Returns [`ModelError::Io`] if the file is missing or unreadable and
/// [`ModelError::Candle`] if it cannot be parsed.
pub fn read_state_dict(path: &Path) -> Result<Vec<(String, Tensor)>, ModelError> {
    std::fs::metadata(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let format = CheckpointFormat::from_path(path);
    let entries = match format {
        CheckpointFormat::Pickle => candle_core::pickle::read_all(path)?,
        CheckpointFormat::Safetensors => {
            let mut entries: Vec<_> = candle_core::safetensors::load(path, &Device::Cpu)?
                .into_iter()
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            entries
        }
    };

    tracing::debug!(
        path = %path.display(),
        ?format,
        tensors = entries.len(),
        "read checkpoint"
    );
    Ok(entries)
}

/// Strip the data-parallel `module.` prefix.
///
/// Only the first key decides: if it carries the prefix, every key that has
/// it loses it. Otherwise, and for an empty mapping, the entries are returned
/// unchanged.
#[must_use]
pub fn sanitize_state_dict<T>(entries: Vec<(String, T)>) -> Vec<(String, T)> {
    let prefixed = entries
        .first()
        .is_some_and(|(key, _)| key.starts_with(DATA_PARALLEL_PREFIX));
    if !prefixed {
        return entries;
    }

    tracing::debug!("stripping '{DATA_PARALLEL_PREFIX}' prefix from checkpoint keys");
    entries
        .into_iter()
        .map(|(key, value)| match key.strip_prefix(DATA_PARALLEL_PREFIX) {
            Some(stripped) => (stripped.to_string(), value),
            None => (key, value),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entries(keys: &[&str]) -> Vec<(String, usize)> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| ((*k).to_string(), i))
            .collect()
    }

    #[test]
    fn prefixed_sole_key_loses_prefix() {
        assert_eq!(
            sanitize_state_dict(entries(&["module.layer.weight"])),
            entries(&["layer.weight"])
        );
    }

    #[test]
    fn unprefixed_mapping_is_unchanged() {
        let input = entries(&["layer.weight", "module.other"]);
        assert_eq!(sanitize_state_dict(input.clone()), input);
    }

    #[test]
    fn empty_mapping_is_unchanged() {
        assert!(sanitize_state_dict(Vec::<(String, u8)>::new()).is_empty());
    }

    #[test]
    fn only_keys_with_prefix_are_rewritten() {
        assert_eq!(
            sanitize_state_dict(entries(&["module.a", "b", "module.c"])),
            entries(&["a", "b", "c"])
        );
    }

    #[test]
    fn prefix_is_stripped_once() {
        assert_eq!(
            sanitize_state_dict(entries(&["module.module.a"])),
            entries(&["module.a"])
        );
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            CheckpointFormat::from_path(Path::new("m.safetensors")),
            CheckpointFormat::Safetensors
        );
        assert_eq!(
            CheckpointFormat::from_path(Path::new("m.SAFETENSORS")),
            CheckpointFormat::Safetensors
        );
        assert_eq!(
            CheckpointFormat::from_path(Path::new("m.pth")),
            CheckpointFormat::Pickle
        );
        assert_eq!(
            CheckpointFormat::from_path(Path::new("weights")),
            CheckpointFormat::Pickle
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_state_dict(&dir.path().join("absent.pth")).unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }
}
