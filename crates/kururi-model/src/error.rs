//! Model loading error types.

use std::path::PathBuf;

use thiserror::Error;

/// How many key names a [`ModelError::KeyMismatch`] message lists per side.
const LISTED_KEYS: usize = 5;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown model architecture '{name}' (known: {known})")]
    UnknownArchitecture { name: String, known: String },

    /// A recognised device that cannot be used in this build or on this machine.
    #[error("device '{device}' is not available: {reason}")]
    UnavailableDevice { device: String, reason: String },

    #[error("invalid device '{0}'; use 'cpu', 'cuda', 'gpu' or 'cuda:N'")]
    InvalidDevice(String),

    /// Checkpoint parameter names do not match the architecture.
    #[error("{}", describe_mismatch(.missing, .unexpected))]
    KeyMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("cannot read checkpoint {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Candle(#[from] candle_core::Error),
}

fn describe_mismatch(missing: &[String], unexpected: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!(
            "{} missing key(s) [{}]",
            missing.len(),
            preview(missing)
        ));
    }
    if !unexpected.is_empty() {
        parts.push(format!(
            "{} unexpected key(s) [{}]",
            unexpected.len(),
            preview(unexpected)
        ));
    }
    format!("checkpoint does not match the model: {}", parts.join(", "))
}

fn preview(keys: &[String]) -> String {
    let mut listed = keys
        .iter()
        .take(LISTED_KEYS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if keys.len() > LISTED_KEYS {
        listed.push_str(", ...");
    }
    listed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn key_mismatch_lists_both_sides() {
        let err = ModelError::KeyMismatch {
            missing: vec!["head.weight".into()],
            unexpected: vec!["fc.weight".into(), "fc.bias".into()],
        };
        assert_eq!(
            err.to_string(),
            "checkpoint does not match the model: 1 missing key(s) [head.weight], \
             2 unexpected key(s) [fc.weight, fc.bias]"
        );
    }

    #[test]
    fn key_mismatch_truncates_long_lists() {
        let missing = (0..8).map(|i| format!("blocks.{i}.norm1.weight")).collect();
        let err = ModelError::KeyMismatch {
            missing,
            unexpected: Vec::new(),
        };
        let message = err.to_string();
        assert!(message.starts_with("checkpoint does not match the model: 8 missing key(s)"));
        assert!(message.ends_with("blocks.4.norm1.weight, ...]"));
    }
}
