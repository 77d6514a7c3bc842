//! # kururi-model
//!
//! The rotation classifier and everything needed to bring it up:
//!
//! - [`parse_device`]: `cpu` / `cuda` / `gpu` / `cuda:N` to a candle device
//! - [`VitConfig`]: registry of supported vision transformer variants
//! - [`read_state_dict`] and [`sanitize_state_dict`]: checkpoint reading and
//!   `module.` prefix removal
//! - [`load_model`]: strict checkpoint loading into a [`VisionTransformer`]
//!
//! The loaded model is inference-only and implements [`candle_core::Module`].

mod device;
mod error;
mod loader;
pub mod state_dict;
pub mod vit;

pub use device::parse_device;
pub use error::ModelError;
pub use loader::{check_keys, load_model, load_model_with_config};
pub use state_dict::{CheckpointFormat, read_state_dict, sanitize_state_dict};
pub use vit::{ARCHITECTURES, VisionTransformer, VitConfig};
