use ndarray::{ArrayD, ArrayViewD, Axis, Ix2};

use super::{Layer, NetError};

/// Averages every channel over its spatial axes.
///
/// Maps a `[channels, ..spatial]` sample to `[channels]`. With one channel per
/// class, this is a complete classifier scoring each class by the mean
/// brightness of its channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalAvgPool;

impl GlobalAvgPool {
    const NAME: &'static str = "global_avg_pool";

    /// Splits a batched shape into `(batch, channels, spatial size)`.
    fn split(shape: &[usize]) -> Result<(usize, usize, usize), NetError> {
        match shape {
            [batch, channels, spatial @ ..] if !spatial.is_empty() => {
                Ok((*batch, *channels, spatial.iter().product()))
            }
            _ => Err(NetError::incompatible(
                Self::NAME,
                shape,
                "expected a channel axis followed by at least one spatial axis",
            )),
        }
    }
}

impl Layer for GlobalAvgPool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>, NetError> {
        match input {
            [channels, spatial @ ..] if !spatial.is_empty() => Ok(vec![*channels]),
            _ => Err(NetError::incompatible(
                Self::NAME,
                input,
                "expected a channel axis followed by at least one spatial axis",
            )),
        }
    }

    fn forward(&self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>, NetError> {
        let (batch, channels, size) = Self::split(input.shape())?;
        let flat = input.to_shape((batch, channels, size))?;

        flat.mean_axis(Axis(2))
            .map(|mean| mean.into_dyn())
            .ok_or_else(|| NetError::incompatible(Self::NAME, input.shape(), "empty spatial axes"))
    }

    fn backward(
        &self,
        input: ArrayViewD<'_, f32>,
        grad_output: ArrayViewD<'_, f32>,
    ) -> Result<ArrayD<f32>, NetError> {
        let (batch, channels, size) = Self::split(input.shape())?;
        let grad = grad_output.into_dimensionality::<Ix2>()?;
        if grad.dim() != (batch, channels) {
            return Err(NetError::incompatible(
                Self::NAME,
                grad.shape(),
                format!("gradient must have shape [{batch}, {channels}]"),
            ));
        }

        #[allow(clippy::cast_precision_loss)]
        let scale = 1.0 / size as f32;
        let spread = grad
            .insert_axis(Axis(2))
            .broadcast((batch, channels, size))
            .ok_or_else(|| {
                NetError::incompatible(Self::NAME, input.shape(), "cannot spread gradient")
            })?
            .mapv(|g| g * scale);

        Ok(spread.into_shape_with_order(input.shape())?)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::{Array, array};

    use super::*;

    #[test]
    fn averages_each_channel() {
        let x = Array::from_shape_vec((1, 2, 2, 2), vec![1.0, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 8.0])
            .unwrap()
            .into_dyn();

        let y = GlobalAvgPool.forward(x.view()).unwrap();

        assert_eq!(y.shape(), &[1, 2]);
        assert_relative_eq!(y[[0, 0]], 2.5);
        assert_relative_eq!(y[[0, 1]], 2.0);
    }

    #[test]
    fn spreads_gradient_evenly() {
        let x = Array::<f32, _>::zeros((2, 3, 2, 2)).into_dyn();
        let grad = array![[4.0, 8.0, -4.0], [0.0, 1.0, 2.0]].into_dyn();

        let g = GlobalAvgPool.backward(x.view(), grad.view()).unwrap();

        assert_eq!(g.shape(), x.shape());
        assert_relative_eq!(g[[0, 1, 1, 0]], 2.0);
        assert_relative_eq!(g[[0, 2, 0, 1]], -1.0);
        assert_relative_eq!(g[[1, 2, 1, 1]], 0.5);
    }

    #[test]
    fn needs_spatial_axes() {
        assert_eq!(GlobalAvgPool.output_shape(&[10, 5, 5]).unwrap(), vec![10]);
        assert!(GlobalAvgPool.output_shape(&[10]).is_err());
    }
}
