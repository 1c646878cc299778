use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayViewD, Axis};

use crate::{Bounds, Error};

/// The uniform query surface that attack algorithms program against.
///
/// Inputs are raw, in the space described by [`DifferentiableModel::bounds`].
/// Gradients are always returned in that same raw space, whatever
/// preprocessing the model applies internally.
///
/// Implementations must be deterministic: repeated calls with the same input
/// return bit-identical results, and the combined
/// [`predictions_and_gradient`](DifferentiableModel::predictions_and_gradient)
/// returns exactly what the separate calls would.
pub trait DifferentiableModel {
    /// The number of classes scored per sample.
    fn num_classes(&self) -> usize;

    /// The valid range of raw input values.
    fn bounds(&self) -> Bounds;

    /// The channel axis of a batched input.
    fn channel_axis(&self) -> usize;

    /// Returns class scores of shape `(batch, num_classes)` for a batch of
    /// raw inputs, one row per input in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch has the wrong shape or the backend fails.
    fn batch_predictions(&self, images: ArrayViewD<'_, f32>) -> Result<Array2<f32>, Error>;

    /// Returns class scores of shape `(num_classes,)` for one raw input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input has the wrong shape or the backend fails.
    fn predictions(&self, image: ArrayViewD<'_, f32>) -> Result<Array1<f32>, Error> {
        let scores = self.batch_predictions(image.insert_axis(Axis(0)))?;
        Ok(scores.index_axis_move(Axis(0), 0))
    }

    /// Returns class scores and the cross-entropy gradient for one raw input,
    /// computed from a single forward and backward pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the label is out of range, the input has the
    /// wrong shape, or the backend fails.
    fn predictions_and_gradient(
        &self,
        image: ArrayViewD<'_, f32>,
        label: usize,
    ) -> Result<(Array1<f32>, ArrayD<f32>), Error>;

    /// Returns the gradient of the cross-entropy loss for `label` with
    /// respect to the raw input. The result has the shape of `image`.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as
    /// [`predictions_and_gradient`](DifferentiableModel::predictions_and_gradient).
    fn gradient(&self, image: ArrayViewD<'_, f32>, label: usize) -> Result<ArrayD<f32>, Error> {
        self.predictions_and_gradient(image, label)
            .map(|(_, gradient)| gradient)
    }

    /// Returns the per-sample cross-entropy loss of a batch of raw inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if shapes or labels are invalid, or the backend fails.
    fn loss(&self, images: ArrayViewD<'_, f32>, labels: &[usize]) -> Result<Array1<f32>, Error>;

    /// Propagates a gradient with respect to the class scores of one input
    /// back to the raw input.
    ///
    /// # Errors
    ///
    /// Returns an error if shapes are invalid or the backend fails.
    fn backward(
        &self,
        gradient: ArrayView1<'_, f32>,
        image: ArrayViewD<'_, f32>,
    ) -> Result<ArrayD<f32>, Error>;
}
