use thiserror::Error;

/// Errors raised while building or evaluating a [`Sequential`](super::Sequential) network.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("layer `{layer}` cannot accept shape {shape:?}: {reason}")]
    Incompatible {
        layer: &'static str,
        shape: Vec<usize>,
        reason: String,
    },

    #[error("network must produce one score vector per sample, got per-sample shape {0:?}")]
    NotAClassifier(Vec<usize>),

    #[error("network was built for inputs of shape {expected:?}, got per-sample shape {actual:?}")]
    InputShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("dense layer maps {inputs} features to {outputs} but its bias has length {bias}")]
    Bias {
        inputs: usize,
        outputs: usize,
        bias: usize,
    },

    #[error(transparent)]
    Array(#[from] ndarray::ShapeError),
}

impl NetError {
    pub(crate) fn incompatible(
        layer: &'static str,
        shape: &[usize],
        reason: impl Into<String>,
    ) -> Self {
        Self::Incompatible {
            layer,
            shape: shape.to_vec(),
            reason: reason.into(),
        }
    }
}
