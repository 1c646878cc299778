use crate::ShapeError;

/// The declared shape of a single, unbatched input.
///
/// An `InputSpec` plays the role of an input placeholder: backends build
/// their computation from it and adapters validate incoming arrays against
/// it. It carries no data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "Vec<usize>", into = "Vec<usize>")
)]
pub struct InputSpec {
    shape: Vec<usize>,
}

impl InputSpec {
    /// Creates a spec for inputs of the given shape, e.g. `[channels, height, width]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape is empty or has a zero-length axis.
    pub fn new(shape: impl Into<Vec<usize>>) -> Result<Self, ShapeError> {
        let shape = shape.into();
        if shape.is_empty() || shape.contains(&0) {
            return Err(ShapeError::new(
                "input spec",
                "at least one axis, all non-empty",
                &shape,
            ));
        }
        Ok(Self { shape })
    }

    /// The unbatched input shape.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of axes of a single input.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of scalar elements in a single input.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Returns `true` if a single input holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks that `shape` is exactly one input.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] if the shapes differ.
    pub fn check_single(&self, shape: &[usize]) -> Result<(), ShapeError> {
        if shape == self.shape.as_slice() {
            Ok(())
        } else {
            Err(ShapeError::exact("input", &self.shape, shape))
        }
    }

    /// Checks that `shape` is a batch of inputs and returns the batch size.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] unless `shape` is `[batch, ..self.shape()]`.
    pub fn check_batch(&self, shape: &[usize]) -> Result<usize, ShapeError> {
        match shape.split_first() {
            Some((&batch, rest)) if rest == self.shape.as_slice() => Ok(batch),
            _ => Err(ShapeError::new(
                "input batch",
                format!("[batch, {}]", join(&self.shape)),
                shape,
            )),
        }
    }
}

impl TryFrom<Vec<usize>> for InputSpec {
    type Error = ShapeError;

    fn try_from(shape: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(shape)
    }
}

impl From<InputSpec> for Vec<usize> {
    fn from(spec: InputSpec) -> Self {
        spec.shape
    }
}

fn join(shape: &[usize]) -> String {
    shape
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_shapes() {
        let spec = InputSpec::new([3, 5, 5]).unwrap();

        assert_eq!(spec.len(), 75);
        assert!(spec.check_single(&[3, 5, 5]).is_ok());
        assert!(spec.check_single(&[1, 3, 5, 5]).is_err());

        assert_eq!(spec.check_batch(&[4, 3, 5, 5]), Ok(4));
        assert_eq!(spec.check_batch(&[0, 3, 5, 5]), Ok(0));

        let err = spec.check_batch(&[3, 5, 5]).unwrap_err();
        assert_eq!(err.expected, "[batch, 3, 5, 5]");
    }

    #[test]
    fn rejects_degenerate_specs() {
        assert!(InputSpec::new(Vec::<usize>::new()).is_err());
        assert!(InputSpec::new([3, 0]).is_err());
    }

    #[cfg(feature = "serde-derive")]
    #[test]
    fn deserializes_with_validation() {
        let spec: InputSpec = serde_json::from_str("[3, 5, 5]").unwrap();
        assert_eq!(spec.shape(), &[3, 5, 5]);
        assert!(!spec.is_empty());
        assert_eq!(serde_json::to_string(&spec).unwrap(), "[3,5,5]");

        assert!(serde_json::from_str::<InputSpec>("[3, 0]").is_err());
        assert!(serde_json::from_str::<InputSpec>("[]").is_err());
    }
}
