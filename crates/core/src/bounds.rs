use ndarray::{ArrayBase, ArrayD, Data, Dimension};
use thiserror::Error;

/// The valid range of raw (pre-preprocessing) input values.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "[f32; 2]", into = "[f32; 2]")
)]
pub struct Bounds {
    min: f32,
    max: f32,
}

/// Errors that can occur when constructing [`Bounds`].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum BoundsError {
    #[error("bounds must satisfy min < max, got ({min}, {max})")]
    Empty { min: f32, max: f32 },
}

impl Bounds {
    /// Creates bounds from a `(min, max)` pair.
    ///
    /// # Errors
    ///
    /// Returns an error unless `min < max`. Any NaN endpoint is rejected.
    pub fn new(min: f32, max: f32) -> Result<Self, BoundsError> {
        if min < max {
            Ok(Self { min, max })
        } else {
            Err(BoundsError::Empty { min, max })
        }
    }

    #[must_use]
    pub fn min(&self) -> f32 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Returns the bounds as a `(min, max)` tuple.
    #[must_use]
    pub fn as_tuple(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    /// Returns `true` if every element of `x` lies within the bounds.
    pub fn contains<S, D>(&self, x: &ArrayBase<S, D>) -> bool
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        x.iter().all(|&v| v >= self.min && v <= self.max)
    }

    /// Returns a copy of `x` with every element clamped into the bounds.
    ///
    /// The adapter never clips on its own; attack algorithms call this after
    /// stepping an input.
    pub fn clip<S, D>(&self, x: &ArrayBase<S, D>) -> ArrayD<f32>
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        x.mapv(|v| v.clamp(self.min, self.max)).into_dyn()
    }
}

impl TryFrom<[f32; 2]> for Bounds {
    type Error = BoundsError;

    fn try_from([min, max]: [f32; 2]) -> Result<Self, Self::Error> {
        Self::new(min, max)
    }
}

impl From<Bounds> for [f32; 2] {
    fn from(bounds: Bounds) -> Self {
        [bounds.min, bounds.max]
    }
}
