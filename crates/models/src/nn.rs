//! A native layer-graph backend with analytic gradients.
//!
//! A [`Sequential`] network is built from an [`InputSpec`] placeholder and a
//! list of [`Layer`]s. Building walks the layers once to infer every
//! intermediate shape, so a network that cannot accept its declared input,
//! or whose output is not one score vector per sample, is rejected before it
//! is ever evaluated.
//!
//! Every layer implements its own backward pass. [`Sequential`] keeps the
//! inputs of each layer from the forward pass and reuses them for the
//! backward pass, so a loss-plus-gradient evaluation costs one forward and
//! one backward traversal.
//!
//! [`InputSpec`]: foil_core::InputSpec

mod dense;
mod error;
mod flatten;
mod pool;
mod relu;
mod sequential;

use std::fmt::Debug;

use ndarray::{ArrayD, ArrayViewD};

pub use dense::Dense;
pub use error::NetError;
pub use flatten::Flatten;
pub use pool::GlobalAvgPool;
pub use relu::Relu;
pub use sequential::Sequential;

/// One differentiable stage of a [`Sequential`] network.
///
/// Arrays passed to `forward` and `backward` are batched: axis 0 is the batch
/// axis. Shapes passed to `output_shape` are per-sample, without the batch
/// axis.
pub trait Layer: Debug + Send + Sync {
    /// A short name used in error messages.
    fn name(&self) -> &'static str;

    /// Returns the per-sample output shape for a per-sample input shape.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Incompatible`] if the layer cannot accept the input.
    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>, NetError>;

    /// Evaluates the layer on a batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch has a shape the layer cannot accept.
    fn forward(&self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>, NetError>;

    /// Returns the gradient with respect to `input`, given the gradient with
    /// respect to this layer's output at `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes of `input` and `grad_output` disagree
    /// with each other or with the layer.
    fn backward(
        &self,
        input: ArrayViewD<'_, f32>,
        grad_output: ArrayViewD<'_, f32>,
    ) -> Result<ArrayD<f32>, NetError>;
}
