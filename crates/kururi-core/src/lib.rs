//! # kururi-core
//!
//! Foundational types shared across all kururi crates:
//! - [`RotationClass`]: the four orientation categories the classifier predicts
//! - [`Probabilities`]: the per-class softmax output, always exactly four entries
//! - Built-in defaults (checkpoint location, download source, supported extensions)
//! - Cross-cutting error types

pub mod constants;
pub mod errors;
pub mod rotation;

pub use errors::CoreError;
pub use rotation::{NUM_CLASSES, Probabilities, RotationClass, angle_from_class};
