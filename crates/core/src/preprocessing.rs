//! Affine input preprocessing and its gradient pullback.
//!
//! The stage maps a raw input `x` to `(x - subtrahend) / divisor` before it
//! reaches the backend. Its derivative is a pure division by `divisor`, so a
//! gradient taken in preprocessed space is pulled back to raw input space by
//! dividing it by the divisor. The subtrahend contributes nothing.
//!
//! Parameters broadcast to the input using numpy rules, in one direction
//! only: a parameter may be smaller than the input but never enlarges it.

use ndarray::{ArrayD, ArrayViewD, IxDyn, arr0};
use thiserror::Error;

use crate::ShapeError;

/// The preprocessing stage applied to raw input before the backend sees it.
///
/// The default is the identity transform.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(
        try_from = "Option<PreprocessingParams>",
        into = "Option<PreprocessingParams>"
    )
)]
pub struct Preprocessing {
    affine: Option<Affine>,
}

#[derive(Debug, Clone, PartialEq)]
struct Affine {
    subtrahend: ArrayD<f32>,
    divisor: ArrayD<f32>,
}

/// Raw `(subtrahend, divisor)` parameters, as they appear in configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PreprocessingParams {
    pub subtrahend: ArrayD<f32>,
    pub divisor: ArrayD<f32>,
}

/// Errors that can occur when constructing a [`Preprocessing`] stage.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PreprocessingError {
    #[error("divisor has a zero entry at flat index {index}")]
    ZeroDivisor { index: usize },

    #[error("{what} has a non-finite entry at flat index {index}: {value}")]
    NonFinite {
        what: &'static str,
        index: usize,
        value: f32,
    },
}

impl Preprocessing {
    /// Returns the identity transform, whose pullback is a pass-through.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Creates an affine stage from a subtrahend and a divisor.
    ///
    /// Both arrays must broadcast to the shape of a single input. That is
    /// checked against the input shape when an adapter is built, since the
    /// stage itself does not know the input shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the divisor contains a zero, or if either array
    /// contains a NaN or infinite value.
    pub fn new(
        subtrahend: ArrayD<f32>,
        divisor: ArrayD<f32>,
    ) -> Result<Self, PreprocessingError> {
        check_finite("subtrahend", &subtrahend)?;
        check_finite("divisor", &divisor)?;

        if let Some(index) = divisor.iter().position(|&d| d == 0.0) {
            return Err(PreprocessingError::ZeroDivisor { index });
        }

        Ok(Self {
            affine: Some(Affine {
                subtrahend,
                divisor,
            }),
        })
    }

    /// Creates an affine stage with one scalar subtrahend and divisor.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`Preprocessing::new`].
    pub fn scalar(subtrahend: f32, divisor: f32) -> Result<Self, PreprocessingError> {
        Self::new(arr0(subtrahend).into_dyn(), arr0(divisor).into_dyn())
    }

    /// Returns `true` if this is the identity transform.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.affine.is_none()
    }

    /// Returns the subtrahend, or `None` for the identity transform.
    #[must_use]
    pub fn subtrahend(&self) -> Option<&ArrayD<f32>> {
        self.affine.as_ref().map(|a| &a.subtrahend)
    }

    /// Returns the divisor, or `None` for the identity transform.
    #[must_use]
    pub fn divisor(&self) -> Option<&ArrayD<f32>> {
        self.affine.as_ref().map(|a| &a.divisor)
    }

    /// Checks that the parameters broadcast to `shape`.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] naming the first parameter that does not
    /// broadcast.
    pub fn check_shape(&self, shape: &[usize]) -> Result<(), ShapeError> {
        if let Some(affine) = &self.affine {
            broadcast_to("subtrahend", &affine.subtrahend, shape)?;
            broadcast_to("divisor", &affine.divisor, shape)?;
        }
        Ok(())
    }

    /// Applies `(x - subtrahend) / divisor` elementwise.
    ///
    /// `x` may be a single input or a batch; leading batch axes are covered
    /// by broadcasting.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] if a parameter does not broadcast to `x`.
    pub fn apply(&self, x: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>, ShapeError> {
        let Some(affine) = &self.affine else {
            return Ok(x.to_owned());
        };

        let subtrahend = broadcast_to("subtrahend", &affine.subtrahend, x.shape())?;
        let divisor = broadcast_to("divisor", &affine.divisor, x.shape())?;

        Ok((&x - &subtrahend) / &divisor)
    }

    /// Pulls a gradient taken with respect to the preprocessed input back to
    /// the raw input, returning `gradient / divisor`.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] if the divisor does not broadcast to
    /// `gradient`.
    pub fn pullback(&self, gradient: ArrayD<f32>) -> Result<ArrayD<f32>, ShapeError> {
        let Some(affine) = &self.affine else {
            return Ok(gradient);
        };

        let divisor = broadcast_to("divisor", &affine.divisor, gradient.shape())?;
        Ok(gradient / &divisor)
    }
}

impl TryFrom<PreprocessingParams> for Preprocessing {
    type Error = PreprocessingError;

    fn try_from(params: PreprocessingParams) -> Result<Self, Self::Error> {
        Self::new(params.subtrahend, params.divisor)
    }
}

impl TryFrom<Option<PreprocessingParams>> for Preprocessing {
    type Error = PreprocessingError;

    fn try_from(params: Option<PreprocessingParams>) -> Result<Self, Self::Error> {
        params.map_or_else(
            || Ok(Self::identity()),
            |p| Self::new(p.subtrahend, p.divisor),
        )
    }
}

impl From<Preprocessing> for Option<PreprocessingParams> {
    fn from(preprocessing: Preprocessing) -> Self {
        preprocessing.affine.map(|a| PreprocessingParams {
            subtrahend: a.subtrahend,
            divisor: a.divisor,
        })
    }
}

fn check_finite(what: &'static str, values: &ArrayD<f32>) -> Result<(), PreprocessingError> {
    match values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        Some((index, &value)) => Err(PreprocessingError::NonFinite { what, index, value }),
        None => Ok(()),
    }
}

fn broadcast_to<'a>(
    what: &'static str,
    param: &'a ArrayD<f32>,
    shape: &[usize],
) -> Result<ArrayViewD<'a, f32>, ShapeError> {
    param
        .broadcast(IxDyn(shape))
        .ok_or_else(|| ShapeError::broadcast(what, shape, param.shape()))
}
