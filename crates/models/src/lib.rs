//! Model adapters and backends for differentiable classifiers.
//!
//! - [`Adapter`]: wraps any [`Backend`] behind the [`DifferentiableModel`]
//!   contract, handling input validation, preprocessing, and the gradient
//!   pullback into raw input space
//! - [`nn`]: a native layer-graph backend with analytic gradients
//! - [`closure`]: a backend assembled from forward and backward closures
//! - [`check`]: finite-difference verification of model gradients
//!
//! # Example
//!
//! ```
//! use foil_core::{Bounds, DifferentiableModel, InputSpec};
//! use foil_models::{
//!     Adapter, Config,
//!     nn::{GlobalAvgPool, Layer, Sequential},
//! };
//! use ndarray::Array;
//!
//! let input = InputSpec::new(vec![10, 5, 5])?;
//! let network = Sequential::build(&input, vec![Box::new(GlobalAvgPool) as Box<dyn Layer>])?;
//! let model = Adapter::new(&input, network, Config::new(Bounds::new(0.0, 255.0)?))?;
//!
//! let image = Array::from_elem((10, 5, 5), 128.0_f32).into_dyn();
//! let (scores, gradient) = model.predictions_and_gradient(image.view(), 7)?;
//!
//! assert_eq!(scores.len(), model.num_classes());
//! assert_eq!(gradient.shape(), image.shape());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`Backend`]: foil_core::Backend
//! [`DifferentiableModel`]: foil_core::DifferentiableModel

pub mod adapter;
pub mod check;
pub mod closure;
pub mod nn;

pub use adapter::{Adapter, Config};
pub use check::{GradientCheck, directional_derivative};
pub use closure::FnBackend;
