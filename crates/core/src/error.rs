use std::error::Error as StdError;

use thiserror::Error;

/// Errors returned by [`DifferentiableModel`](crate::DifferentiableModel) calls.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    InvalidLabel(#[from] InvalidLabelError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl Error {
    /// Wraps a backend failure, keeping it as the error source.
    pub fn model<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::Model(ModelError::new(err))
    }
}

/// An array does not have the shape an operation requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{what}: expected shape {expected}, got {actual:?}")]
pub struct ShapeError {
    /// The array that was rejected.
    pub what: &'static str,

    /// Human-readable description of the accepted shape(s).
    pub expected: String,

    /// The shape that was actually provided.
    pub actual: Vec<usize>,
}

impl ShapeError {
    pub fn new(what: &'static str, expected: impl Into<String>, actual: &[usize]) -> Self {
        Self {
            what,
            expected: expected.into(),
            actual: actual.to_vec(),
        }
    }

    /// A mismatch against one exact shape.
    pub fn exact(what: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        Self::new(what, format!("{expected:?}"), actual)
    }

    /// A shape that must broadcast to `target` but does not.
    pub fn broadcast(what: &'static str, target: &[usize], actual: &[usize]) -> Self {
        Self::new(what, format!("broadcastable to {target:?}"), actual)
    }
}

/// A class label outside `0..num_classes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("label {label} is out of range for {num_classes} classes")]
pub struct InvalidLabelError {
    pub label: usize,
    pub num_classes: usize,
}

/// A failure raised by the backend during forward or backward evaluation.
///
/// The backend's own error is kept as the [`source`](StdError::source).
#[derive(Debug, Error)]
#[error("backend evaluation failed: {source}")]
pub struct ModelError {
    #[source]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl ModelError {
    pub fn new<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self {
            source: Box::new(err),
        }
    }

    /// Creates a model error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            source: message.into(),
        }
    }

    /// Returns the wrapped backend error.
    #[must_use]
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }
}
