use std::{rc::Rc, sync::Arc};

use ndarray::{Array1, Array2, ArrayD, ArrayView2, ArrayViewD};

use crate::{Error, ShapeError, loss};

/// The result of one forward and backward pass over a labeled batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Class scores, shape `(batch, num_classes)`.
    pub scores: Array2<f32>,

    /// Per-sample cross-entropy loss, shape `(batch,)`.
    pub losses: Array1<f32>,

    /// Gradient of each sample's loss with respect to the backend input.
    pub gradient: ArrayD<f32>,
}

/// A differentiable classifier as seen by an adapter.
///
/// Each framework supplies one implementation. Inputs are always batched and
/// already preprocessed: axis 0 is the batch axis and the remaining axes
/// match the input the computation was built for.
///
/// The loss methods work in the crate's [`Error`] space: a failing pass is
/// wrapped with [`Error::model`], and scores that are not shaped
/// `(labels.len(), num_classes)` are reported as [`Error::Shape`] before any
/// loss is evaluated.
pub trait Backend {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The number of classes scored per sample.
    fn num_classes(&self) -> usize;

    /// Evaluates class scores for a batch of inputs.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the backend cannot evaluate the batch.
    fn forward(&self, inputs: ArrayViewD<'_, f32>) -> Result<Array2<f32>, Self::Error>;

    /// Propagates a gradient with respect to the scores back to the inputs.
    ///
    /// `grad_scores` has shape `(batch, num_classes)`; the result has the
    /// shape of `inputs`.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the backend cannot differentiate the batch.
    fn backward(
        &self,
        inputs: ArrayViewD<'_, f32>,
        grad_scores: ArrayView2<'_, f32>,
    ) -> Result<ArrayD<f32>, Self::Error>;

    /// Evaluates scores, cross-entropy losses, and the loss gradient with
    /// respect to the inputs.
    ///
    /// The default implementation runs [`Backend::forward`], then
    /// [`Backend::backward`] with the cross-entropy gradient. Backends that
    /// can reuse forward activations should override it.
    ///
    /// # Errors
    ///
    /// Returns an error if either pass fails, the scores have the wrong
    /// shape, or a label is out of range.
    fn loss_and_gradient(
        &self,
        inputs: ArrayViewD<'_, f32>,
        labels: &[usize],
    ) -> Result<Evaluation, Error> {
        let scores = self.forward(inputs.view()).map_err(Error::model)?;
        check_scores(&scores, labels.len(), self.num_classes())?;

        let (losses, grad_scores) = loss::softmax_cross_entropy(scores.view(), labels)?;
        let gradient = self
            .backward(inputs, grad_scores.view())
            .map_err(Error::model)?;

        Ok(Evaluation {
            scores,
            losses,
            gradient,
        })
    }

    /// Evaluates per-sample cross-entropy losses without any gradient.
    ///
    /// # Errors
    ///
    /// Returns an error if the forward pass fails, the scores have the wrong
    /// shape, or a label is out of range.
    fn losses(&self, inputs: ArrayViewD<'_, f32>, labels: &[usize]) -> Result<Array1<f32>, Error> {
        let scores = self.forward(inputs).map_err(Error::model)?;
        check_scores(&scores, labels.len(), self.num_classes())?;
        loss::cross_entropy(scores.view(), labels)
    }
}

/// Checks that backend scores have shape `(batch, num_classes)`.
///
/// # Errors
///
/// Returns a [`ShapeError`] naming the backend scores otherwise.
pub fn check_scores(
    scores: &Array2<f32>,
    batch: usize,
    num_classes: usize,
) -> Result<(), ShapeError> {
    if scores.dim() == (batch, num_classes) {
        Ok(())
    } else {
        Err(ShapeError::exact(
            "backend scores",
            &[batch, num_classes],
            scores.shape(),
        ))
    }
}

macro_rules! forward_backend {
    ($($ptr:ty),+ $(,)?) => {
        $(
            impl<B: Backend + ?Sized> Backend for $ptr {
                type Error = B::Error;

                fn num_classes(&self) -> usize {
                    (**self).num_classes()
                }

                fn forward(
                    &self,
                    inputs: ArrayViewD<'_, f32>,
                ) -> Result<Array2<f32>, Self::Error> {
                    (**self).forward(inputs)
                }

                fn backward(
                    &self,
                    inputs: ArrayViewD<'_, f32>,
                    grad_scores: ArrayView2<'_, f32>,
                ) -> Result<ArrayD<f32>, Self::Error> {
                    (**self).backward(inputs, grad_scores)
                }

                fn loss_and_gradient(
                    &self,
                    inputs: ArrayViewD<'_, f32>,
                    labels: &[usize],
                ) -> Result<Evaluation, Error> {
                    (**self).loss_and_gradient(inputs, labels)
                }

                fn losses(
                    &self,
                    inputs: ArrayViewD<'_, f32>,
                    labels: &[usize],
                ) -> Result<Array1<f32>, Error> {
                    (**self).losses(inputs, labels)
                }
            }
        )+
    };
}

// Adapters may borrow or share a backend instead of owning it.
forward_backend!(&B, Box<B>, Rc<B>, Arc<B>);
