use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DifficultyError {
    #[error("difficulty must be between {min} and {max}, got {provided}")]
    OutOfRange { provided: i64, min: u8, max: u8 },
}

/// Question difficulty on a 1 (easiest) to 5 (hardest) scale.
///
/// A value of this type is always inside the valid range. Questions that have
/// never been scored carry `Option::<Difficulty>::None` instead of a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: Difficulty = Difficulty(1);
    pub const MAX: Difficulty = Difficulty(5);

    /// Starting point for questions without a stored difficulty.
    pub const BASELINE: Difficulty = Difficulty(3);

    /// Builds a difficulty from a raw integer.
    ///
    /// # Errors
    ///
    /// Returns `DifficultyError::OutOfRange` unless `1 <= value <= 5`.
    pub fn new(value: i64) -> Result<Self, DifficultyError> {
        if value < i64::from(Self::MIN.0) || value > i64::from(Self::MAX.0) {
            return Err(DifficultyError::OutOfRange {
                provided: value,
                min: Self::MIN.0,
                max: Self::MAX.0,
            });
        }
        // range checked above
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self(value as u8))
    }

    /// Builds a difficulty by clamping any integer into `[1, 5]`.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        let min = i64::from(Self::MIN.0);
        let max = i64::from(Self::MAX.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self(value.clamp(min, max) as u8)
    }

    /// Applies `delta` to `current` (or to the baseline when unscored) and clamps.
    #[must_use]
    pub fn adjusted(current: Option<Difficulty>, delta: i8) -> Self {
        let start = current.unwrap_or(Self::BASELINE);
        Self::clamped(i64::from(start.0) + i64::from(delta))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Difficulty {
    type Error = DifficultyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Difficulty> for u8 {
    fn from(value: Difficulty) -> Self {
        value.0
    }
}

impl From<Difficulty> for i64 {
    fn from(value: Difficulty) -> Self {
        i64::from(value.0)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
