use ndarray::{ArrayD, ArrayViewD};

use super::{Layer, NetError};

/// Flattens each sample into a vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flatten;

impl Layer for Flatten {
    fn name(&self) -> &'static str {
        "flatten"
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>, NetError> {
        Ok(vec![input.iter().product()])
    }

    fn forward(&self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>, NetError> {
        let Some((&batch, rest)) = input.shape().split_first() else {
            return Err(NetError::incompatible(self.name(), &[], "missing batch axis"));
        };
        let features = rest.iter().product::<usize>();
        Ok(input.to_shape((batch, features))?.into_owned().into_dyn())
    }

    fn backward(
        &self,
        input: ArrayViewD<'_, f32>,
        grad_output: ArrayViewD<'_, f32>,
    ) -> Result<ArrayD<f32>, NetError> {
        Ok(grad_output.to_shape(input.shape())?.into_owned())
    }
}
