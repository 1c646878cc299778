//! Core contract types for framework-agnostic differentiable classifiers.
//!
//! This crate defines what every backend must provide and what every caller
//! can rely on:
//!
//! - [`Backend`]: what a framework supplies, namely batched forward
//!   evaluation and a vector-Jacobian product, plus a loss-plus-gradient pass
//! - [`DifferentiableModel`]: the query surface attack algorithms use for
//!   predictions and gradients in raw input space
//! - [`Preprocessing`]: the affine input transform and its gradient pullback
//! - [`Bounds`] and [`InputSpec`]: the valid raw input range and shape
//! - [`loss`]: the softmax cross-entropy shared by all backends

mod backend;
mod bounds;
mod error;
mod input;
pub mod loss;
mod model;
mod preprocessing;

pub use backend::{Backend, Evaluation, check_scores};
pub use bounds::{Bounds, BoundsError};
pub use error::{Error, InvalidLabelError, ModelError, ShapeError};
pub use input::InputSpec;
pub use model::DifferentiableModel;
pub use preprocessing::{Preprocessing, PreprocessingError, PreprocessingParams};
