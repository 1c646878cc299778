//! The model adapter: a uniform, backend-independent query surface.
//!
//! An [`Adapter`] owns the input shape, [`Bounds`], and [`Preprocessing`]
//! of a classifier and drives a [`Backend`] on every call:
//!
//! ```text
//! raw input ─► preprocessing ─► backend ─► scores
//!                                  │
//! raw gradient ◄─ pullback ◄───────┘ gradient w.r.t. preprocessed input
//! ```
//!
//! Nothing is cached between calls. Every method takes `&self` and the
//! adapter's own state is read-only after construction.

mod config;


pub use config::Config;

use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayViewD, Axis};
use tracing::{debug, trace};

use foil_core::{
    Backend, Bounds, DifferentiableModel, Error, Evaluation, InputSpec, InvalidLabelError,
    ModelError, Preprocessing, ShapeError, check_scores,
};

/// Exposes a [`Backend`] through the [`DifferentiableModel`] contract.
///
/// The backend may be owned, borrowed (`&B`), or shared (`Arc<B>`).
#[derive(Debug, Clone)]
pub struct Adapter<B> {
    input: InputSpec,
    backend: B,
    bounds: Bounds,
    preprocessing: Preprocessing,
    channel_axis: usize,
    num_classes: usize,
}

impl<B: Backend> Adapter<B> {
    /// Creates an adapter for inputs shaped like `input`.
    ///
    /// # Errors
    ///
    /// - [`Error::Shape`] if the preprocessing parameters do not broadcast
    ///   to the input shape, or the channel axis is not an input axis.
    /// - [`Error::Model`] if the backend scores zero classes.
    pub fn new(input: &InputSpec, backend: B, config: Config) -> Result<Self, Error> {
        let bounds = config.bounds();
        let channel_axis = config.channel_axis();
        let preprocessing = config.preprocessing().clone();

        preprocessing.check_shape(input.shape())?;

        if channel_axis >= input.rank() {
            return Err(ShapeError::new(
                "channel axis",
                format!("an input with more than {channel_axis} axes"),
                input.shape(),
            )
            .into());
        }

        let num_classes = backend.num_classes();
        if num_classes == 0 {
            return Err(ModelError::msg("backend scores zero classes").into());
        }

        debug!(
            input = ?input.shape(),
            num_classes,
            bounds = ?bounds.as_tuple(),
            identity_preprocessing = preprocessing.is_identity(),
            "built model adapter"
        );

        Ok(Self {
            input: input.clone(),
            backend,
            bounds,
            preprocessing,
            channel_axis,
            num_classes,
        })
    }

    /// The unbatched input shape.
    #[must_use]
    pub fn input_shape(&self) -> &[usize] {
        self.input.shape()
    }

    #[must_use]
    pub fn preprocessing(&self) -> &Preprocessing {
        &self.preprocessing
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Consumes the adapter, returning the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Returns the per-sample loss of a batch that is already preprocessed.
    ///
    /// No gradient is computed. Labels must number one per sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch or label count has the wrong shape, a
    /// label is out of range, or the backend fails.
    pub fn preprocessed_loss(
        &self,
        images: ArrayViewD<'_, f32>,
        labels: &[usize],
    ) -> Result<Array1<f32>, Error> {
        let batch = self.input.check_batch(images.shape())?;
        self.check_labels(batch, labels)?;
        trace!(batch, "evaluating loss");

        let losses = self.backend.losses(images, labels)?;
        if losses.len() != batch {
            return Err(ShapeError::exact("backend losses", &[batch], losses.shape()).into());
        }
        Ok(losses)
    }

    fn check_label(&self, label: usize) -> Result<(), InvalidLabelError> {
        if label < self.num_classes {
            Ok(())
        } else {
            Err(InvalidLabelError {
                label,
                num_classes: self.num_classes,
            })
        }
    }

    fn check_labels(&self, batch: usize, labels: &[usize]) -> Result<(), Error> {
        if labels.len() != batch {
            return Err(ShapeError::exact("labels", &[batch], &[labels.len()]).into());
        }
        for &label in labels {
            self.check_label(label)?;
        }
        Ok(())
    }

    /// Preprocesses one raw input as a batch of one.
    fn preprocess_single(&self, image: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>, Error> {
        self.input.check_single(image.shape())?;
        Ok(self.preprocessing.apply(image.insert_axis(Axis(0)))?)
    }

    /// Pulls a backend gradient for a batch of one back to a raw input.
    fn pull_back_single(
        &self,
        gradient: ArrayD<f32>,
        batch_shape: &[usize],
    ) -> Result<ArrayD<f32>, Error> {
        if gradient.shape() != batch_shape {
            return Err(
                ShapeError::exact("backend gradient", batch_shape, gradient.shape()).into(),
            );
        }
        let gradient = self.preprocessing.pullback(gradient)?;
        Ok(gradient.index_axis_move(Axis(0), 0))
    }
}

impl<B: Backend> DifferentiableModel for Adapter<B> {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn channel_axis(&self) -> usize {
        self.channel_axis + 1
    }

    fn batch_predictions(&self, images: ArrayViewD<'_, f32>) -> Result<Array2<f32>, Error> {
        let batch = self.input.check_batch(images.shape())?;
        trace!(batch, "evaluating batch predictions");

        let inputs = self.preprocessing.apply(images)?;
        let scores = self.backend.forward(inputs.view()).map_err(Error::model)?;
        check_scores(&scores, batch, self.num_classes)?;

        Ok(scores)
    }

    fn predictions(&self, image: ArrayViewD<'_, f32>) -> Result<Array1<f32>, Error> {
        self.input.check_single(image.shape())?;
        let scores = self.batch_predictions(image.insert_axis(Axis(0)))?;
        Ok(scores.index_axis_move(Axis(0), 0))
    }

    fn predictions_and_gradient(
        &self,
        image: ArrayViewD<'_, f32>,
        label: usize,
    ) -> Result<(Array1<f32>, ArrayD<f32>), Error> {
        self.check_label(label)?;
        trace!(label, "evaluating predictions and gradient");

        let inputs = self.preprocess_single(image)?;
        let Evaluation {
            scores, gradient, ..
        } = self.backend.loss_and_gradient(inputs.view(), &[label])?;
        check_scores(&scores, 1, self.num_classes)?;

        let gradient = self.pull_back_single(gradient, inputs.shape())?;
        Ok((scores.index_axis_move(Axis(0), 0), gradient))
    }

    fn loss(&self, images: ArrayViewD<'_, f32>, labels: &[usize]) -> Result<Array1<f32>, Error> {
        let batch = self.input.check_batch(images.shape())?;
        self.check_labels(batch, labels)?;

        let inputs = self.preprocessing.apply(images)?;
        self.preprocessed_loss(inputs.view(), labels)
    }

    fn backward(
        &self,
        gradient: ArrayView1<'_, f32>,
        image: ArrayViewD<'_, f32>,
    ) -> Result<ArrayD<f32>, Error> {
        if gradient.len() != self.num_classes {
            return Err(
                ShapeError::exact("score gradient", &[self.num_classes], gradient.shape()).into(),
            );
        }
        trace!("evaluating backward");

        let inputs = self.preprocess_single(image)?;
        let input_gradient = self
            .backend
            .backward(inputs.view(), gradient.insert_axis(Axis(0)))
            .map_err(Error::model)?;

        self.pull_back_single(input_gradient, inputs.shape())
    }
}
