//! # kururi-vision
//!
//! Image side of the classifier: decoding, the deterministic preprocessing
//! pipeline producing the `(1, 3, 224, 224)` model input, and the rotation
//! applied to write a corrected copy.

mod error;
mod preprocess;
mod rotate;

pub use error::VisionError;
pub use preprocess::{auto_crop, crop_box, load_image, prepare_input, resize_to_limit};
pub use rotate::rotate_upright;
