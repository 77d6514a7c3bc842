//! # kururi-predict
//!
//! Runs one image through a loaded classifier and turns the logits into a
//! [`Prediction`], optionally writing a rotation-corrected copy. Also finds
//! the images a directory run should process.

mod engine;
mod error;
mod scan;

pub use engine::{Prediction, predict_with_model};
pub use error::PredictError;
pub use kururi_core::angle_from_class;
pub use scan::{list_image_files, mirrored_path};
