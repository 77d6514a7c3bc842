//! Cross-cutting error types for kururi.
//!
//! Domain-specific errors (`CheckpointError`, `ModelError`, ...) live in their
//! respective crates and converge into `anyhow` inside `kururi-cli`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A class index outside `0..4` was produced or supplied.
    #[error("invalid rotation class index {0} (expected 0..=3)")]
    InvalidRotationClass(usize),

    /// A probability vector did not have exactly four entries.
    #[error("expected {expected} class probabilities, got {actual}")]
    ProbabilityLength { expected: usize, actual: usize },
}
