//! A backend assembled from a pair of closures.
//!
//! [`FnBackend`] adapts any framework that can evaluate scores and a
//! vector-Jacobian product, without writing a [`Backend`] implementation.

use std::{error::Error as StdError, fmt, marker::PhantomData};

use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD};

use foil_core::Backend;

/// A [`Backend`] whose passes are supplied as closures.
///
/// - `forward` maps a preprocessed batch to `(batch, num_classes)` scores.
/// - `backward` maps a batch and a score gradient to the input gradient.
///
/// The loss-plus-gradient pass chains the two, so the forward closure runs
/// twice per gradient query. Frameworks that can reuse activations should
/// implement [`Backend`] directly.
pub struct FnBackend<F, G, E> {
    num_classes: usize,
    forward: F,
    backward: G,
    _marker: PhantomData<fn() -> E>,
}

impl<F, G, E> FnBackend<F, G, E>
where
    F: Fn(ArrayViewD<'_, f32>) -> Result<Array2<f32>, E>,
    G: Fn(ArrayViewD<'_, f32>, ArrayView2<'_, f32>) -> Result<ArrayD<f32>, E>,
    E: StdError + Send + Sync + 'static,
{
    /// Creates a backend scoring `num_classes` classes.
    pub const fn new(num_classes: usize, forward: F, backward: G) -> Self {
        Self {
            num_classes,
            forward,
            backward,
            _marker: PhantomData,
        }
    }
}

impl<F, G, E> fmt::Debug for FnBackend<F, G, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBackend")
            .field("num_classes", &self.num_classes)
            .finish_non_exhaustive()
    }
}

impl<F, G, E> Backend for FnBackend<F, G, E>
where
    F: Fn(ArrayViewD<'_, f32>) -> Result<Array2<f32>, E>,
    G: Fn(ArrayViewD<'_, f32>, ArrayView2<'_, f32>) -> Result<ArrayD<f32>, E>,
    E: StdError + Send + Sync + 'static,
{
    type Error = E;

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn forward(&self, inputs: ArrayViewD<'_, f32>) -> Result<Array2<f32>, E> {
        (self.forward)(inputs)
    }

    fn backward(
        &self,
        inputs: ArrayViewD<'_, f32>,
        grad_scores: ArrayView2<'_, f32>,
    ) -> Result<ArrayD<f32>, E> {
        (self.backward)(inputs, grad_scores)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{Ix2, array};

    use super::*;
    use crate::nn::{Dense, Sequential};
    use foil_core::InputSpec;

    #[test]
    fn matches_an_equivalent_layer_network() {
        let weights = array![[1.0, -1.0, 0.0], [2.0, 0.5, -0.5]];

        let backend = FnBackend::new(
            3,
            |x: ArrayViewD<'_, f32>| x.into_dimensionality::<Ix2>().map(|x| x.dot(&weights)),
            |_x: ArrayViewD<'_, f32>, g: ArrayView2<'_, f32>| Ok(g.dot(&weights.t()).into_dyn()),
        );
        let network = Sequential::build(
            &InputSpec::new(vec![2]).unwrap(),
            vec![Box::new(Dense::without_bias(weights.clone())) as Box<dyn crate::nn::Layer>],
        )
        .unwrap();

        let x = array![[0.5, 1.0], [-1.0, 0.25]].into_dyn();
        let labels = [2, 0];

        let from_closures = backend.loss_and_gradient(x.view(), &labels).unwrap();
        let from_layers = network.loss_and_gradient(x.view(), &labels).unwrap();

        assert_eq!(backend.num_classes(), 3);
        assert_abs_diff_eq!(from_closures.scores, from_layers.scores, epsilon = 1e-6);
        assert_abs_diff_eq!(from_closures.losses, from_layers.losses, epsilon = 1e-6);
        assert_abs_diff_eq!(from_closures.gradient, from_layers.gradient, epsilon = 1e-6);
    }

    #[test]
    fn surfaces_closure_errors() {
        let weights = array![[1.0], [1.0]];
        let backend = FnBackend::new(
            1,
            |x: ArrayViewD<'_, f32>| x.into_dimensionality::<Ix2>().map(|x| x.dot(&weights)),
            |x: ArrayViewD<'_, f32>, _g: ArrayView2<'_, f32>| Ok(x.to_owned()),
        );

        let not_a_matrix = ndarray::Array::<f32, _>::zeros((1, 2, 1)).into_dyn();
        assert!(backend.forward(not_a_matrix.view()).is_err());
    }
}
