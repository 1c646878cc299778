use ndarray::{Array1, Array2, ArrayD, ArrayViewD, Ix2};

use super::{Layer, NetError};

/// A fully connected layer computing `x · weights + bias`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl Dense {
    /// Creates a layer from `(inputs, outputs)` weights and an `(outputs,)` bias.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Bias`] if the bias length differs from the number
    /// of outputs.
    pub fn new(weights: Array2<f32>, bias: Array1<f32>) -> Result<Self, NetError> {
        let (inputs, outputs) = weights.dim();
        if bias.len() != outputs {
            return Err(NetError::Bias {
                inputs,
                outputs,
                bias: bias.len(),
            });
        }
        Ok(Self { weights, bias })
    }

    /// Creates a layer with a zero bias.
    #[must_use]
    pub fn without_bias(weights: Array2<f32>) -> Self {
        let bias = Array1::zeros(weights.ncols());
        Self { weights, bias }
    }

    #[must_use]
    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    #[must_use]
    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }
}

impl Layer for Dense {
    fn name(&self) -> &'static str {
        "dense"
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>, NetError> {
        match input {
            [features] if *features == self.weights.nrows() => Ok(vec![self.weights.ncols()]),
            _ => Err(NetError::incompatible(
                self.name(),
                input,
                format!("expected [{}]", self.weights.nrows()),
            )),
        }
    }

    fn forward(&self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>, NetError> {
        let x = input.into_dimensionality::<Ix2>()?;
        if x.ncols() != self.weights.nrows() {
            return Err(NetError::incompatible(
                self.name(),
                x.shape(),
                format!("expected {} features", self.weights.nrows()),
            ));
        }
        Ok((x.dot(&self.weights) + &self.bias).into_dyn())
    }

    fn backward(
        &self,
        _input: ArrayViewD<'_, f32>,
        grad_output: ArrayViewD<'_, f32>,
    ) -> Result<ArrayD<f32>, NetError> {
        let grad = grad_output.into_dimensionality::<Ix2>()?;
        if grad.ncols() != self.weights.ncols() {
            return Err(NetError::incompatible(
                self.name(),
                grad.shape(),
                format!("expected a gradient over {} outputs", self.weights.ncols()),
            ));
        }
        Ok(grad.dot(&self.weights.t()).into_dyn())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;

    use super::*;

    fn layer() -> Dense {
        Dense::new(array![[1.0, -1.0, 0.5], [2.0, 0.0, -0.5]], array![0.1, 0.2, 0.3]).unwrap()
    }

    #[test]
    fn applies_weights_and_bias() {
        let x = array![[1.0, 2.0]].into_dyn();
        let y = layer().forward(x.view()).unwrap();

        assert_relative_eq!(y[[0, 0]], 5.1, epsilon = 1e-6);
        assert_relative_eq!(y[[0, 1]], -0.8, epsilon = 1e-6);
        assert_relative_eq!(y[[0, 2]], -0.2, epsilon = 1e-6);
    }

    #[test]
    fn backward_is_transposed_weights() {
        let x = array![[1.0, 2.0]].into_dyn();
        let grad = array![[1.0, 0.0, 2.0]].into_dyn();

        let g = layer().backward(x.view(), grad.view()).unwrap();

        assert_eq!(g.shape(), &[1, 2]);
        assert_relative_eq!(g[[0, 0]], 2.0, epsilon = 1e-6);
        assert_relative_eq!(g[[0, 1]], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn validates_dimensions() {
        assert!(matches!(
            Dense::new(Array2::zeros((2, 3)), Array1::zeros(2)),
            Err(NetError::Bias { bias: 2, .. })
        ));

        let dense = layer();
        assert_eq!(dense.output_shape(&[2]).unwrap(), vec![3]);
        assert!(dense.output_shape(&[3]).is_err());
        assert!(dense.output_shape(&[1, 2]).is_err());

        let x = array![[1.0, 2.0, 3.0]].into_dyn();
        assert!(dense.forward(x.view()).is_err());
    }
}
