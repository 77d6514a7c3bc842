//! Rotation classes and the classifier's probability vector.
//!
//! Class `c` means the image content is turned by `c * 90` degrees, so the
//! upright image is recovered by rotating `c * 90` degrees counter-clockwise.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::CoreError;

/// Number of output classes of the rotation classifier.
pub const NUM_CLASSES: usize = 4;

// ---------------------------------------------------------------------------
// RotationClass
// ---------------------------------------------------------------------------

/// One of the four orientation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RotationClass {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl RotationClass {
    pub const ALL: [Self; NUM_CLASSES] = [Self::Deg0, Self::Deg90, Self::Deg180, Self::Deg270];

    /// Class index in `0..4`.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 1,
            Self::Deg180 => 2,
            Self::Deg270 => 3,
        }
    }

    /// Counter-clockwise correction angle in degrees.
    #[must_use]
    pub const fn angle(self) -> u16 {
        // Lossless: index is at most 3.
        #[allow(clippy::cast_possible_truncation)]
        let quarter_turns = self.index() as u16;
        quarter_turns * 90
    }

    /// Class for a raw index.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRotationClass`] when `index >= 4`.
    pub const fn from_index(index: usize) -> Result<Self, CoreError> {
        match index {
            0 => Ok(Self::Deg0),
            1 => Ok(Self::Deg90),
            2 => Ok(Self::Deg180),
            3 => Ok(Self::Deg270),
            other => Err(CoreError::InvalidRotationClass(other)),
        }
    }
}

impl fmt::Display for RotationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

impl From<RotationClass> for u8 {
    fn from(class: RotationClass) -> Self {
        match class {
            RotationClass::Deg0 => 0,
            RotationClass::Deg90 => 1,
            RotationClass::Deg180 => 2,
            RotationClass::Deg270 => 3,
        }
    }
}

impl TryFrom<u8> for RotationClass {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(usize::from(value))
    }
}

/// Correction angle in degrees for a class (`class * 90`).
#[must_use]
pub const fn angle_from_class(class: RotationClass) -> u16 {
    class.angle()
}

// ---------------------------------------------------------------------------
// Probabilities
// ---------------------------------------------------------------------------

/// Softmax output of the classifier, aligned with [`RotationClass::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities([f32; NUM_CLASSES]);

impl Probabilities {
    #[must_use]
    pub const fn new(values: [f32; NUM_CLASSES]) -> Self {
        Self(values)
    }

    #[must_use]
    pub const fn as_array(&self) -> &[f32; NUM_CLASSES] {
        &self.0
    }

    /// Probability assigned to `class`.
    #[must_use]
    pub const fn get(&self, class: RotationClass) -> f32 {
        self.0[class.index()]
    }

    /// Iterate `(class, probability)` pairs in class order.
    pub fn iter(&self) -> impl Iterator<Item = (RotationClass, f32)> + '_ {
        RotationClass::ALL.into_iter().zip(self.0.iter().copied())
    }

    /// Class with the highest probability; ties resolve to the lowest index.
    #[must_use]
    pub fn argmax(&self) -> RotationClass {
        let mut best = 0;
        for (index, value) in self.0.iter().enumerate().skip(1) {
            if *value > self.0[best] {
                best = index;
            }
        }
        RotationClass::ALL[best]
    }

    #[must_use]
    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }
}

impl TryFrom<Vec<f32>> for Probabilities {
    type Error = CoreError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        let actual = values.len();
        let array: [f32; NUM_CLASSES] =
            values
                .try_into()
                .map_err(|_| CoreError::ProbabilityLength {
                    expected: NUM_CLASSES,
                    actual,
                })?;
        Ok(Self(array))
    }
}
