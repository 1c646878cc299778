use ndarray::{ArrayD, ArrayViewD, Zip};

use super::{Layer, NetError};

/// Rectified linear activation, `max(x, 0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Relu;

impl Layer for Relu {
    fn name(&self) -> &'static str {
        "relu"
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>, NetError> {
        Ok(input.to_vec())
    }

    fn forward(&self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>, NetError> {
        Ok(input.mapv(|v| v.max(0.0)))
    }

    fn backward(
        &self,
        input: ArrayViewD<'_, f32>,
        grad_output: ArrayViewD<'_, f32>,
    ) -> Result<ArrayD<f32>, NetError> {
        if input.shape() != grad_output.shape() {
            return Err(NetError::incompatible(
                self.name(),
                grad_output.shape(),
                format!("gradient must match input shape {:?}", input.shape()),
            ));
        }

        let mut grad = grad_output.to_owned();
        // The subgradient at exactly zero is taken as zero.
        Zip::from(&mut grad).and(&input).for_each(|g, &x| {
            if x <= 0.0 {
                *g = 0.0;
            }
        });
        Ok(grad)
    }
}
