use ndarray::{Array1, Array2, ArrayD, ArrayView2, ArrayViewD, Ix2};
use tracing::debug;

use foil_core::{Backend, Error, Evaluation, InputSpec, check_scores, loss};

use super::{Layer, NetError};

/// A chain of layers evaluated in order.
#[derive(Debug)]
pub struct Sequential {
    input: InputSpec,
    layers: Vec<Box<dyn Layer>>,
    num_classes: usize,
}

impl Sequential {
    /// Builds a network for inputs declared by `input`.
    ///
    /// Per-sample shapes are inferred through every layer; the final layer
    /// must produce a single vector whose length becomes the class count.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer cannot accept the shape produced by the
    /// previous one, or if the output is not a non-empty vector.
    pub fn build(
        input: &InputSpec,
        layers: impl IntoIterator<Item = Box<dyn Layer>>,
    ) -> Result<Self, NetError> {
        let layers: Vec<_> = layers.into_iter().collect();

        let mut shape = input.shape().to_vec();
        for layer in &layers {
            shape = layer.output_shape(&shape)?;
        }

        let num_classes = match shape.as_slice() {
            [n] if *n > 0 => *n,
            _ => return Err(NetError::NotAClassifier(shape)),
        };

        debug!(
            input = ?input.shape(),
            layers = ?layers.iter().map(|l| l.name()).collect::<Vec<_>>(),
            num_classes,
            "built sequential network"
        );

        Ok(Self {
            input: input.clone(),
            layers,
            num_classes,
        })
    }

    /// The input placeholder this network was built for.
    #[must_use]
    pub fn input(&self) -> &InputSpec {
        &self.input
    }

    /// Number of layers in the network.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    fn check_input(&self, inputs: &ArrayViewD<'_, f32>) -> Result<(), NetError> {
        match inputs.shape().split_first() {
            Some((_, sample)) if sample == self.input.shape() => Ok(()),
            _ => Err(NetError::InputShape {
                expected: self.input.shape().to_vec(),
                actual: inputs.shape().get(1..).unwrap_or_default().to_vec(),
            }),
        }
    }

    /// Runs the forward pass, returning the input of every layer and the
    /// class scores.
    fn run(
        &self,
        inputs: ArrayViewD<'_, f32>,
    ) -> Result<(Vec<ArrayD<f32>>, Array2<f32>), NetError> {
        self.check_input(&inputs)?;

        let mut layer_inputs = Vec::with_capacity(self.layers.len());
        let mut current = inputs.to_owned();
        for layer in &self.layers {
            let next = layer.forward(current.view())?;
            layer_inputs.push(current);
            current = next;
        }

        let scores = current.into_dimensionality::<Ix2>()?;
        Ok((layer_inputs, scores))
    }

    /// Propagates a score gradient back through the recorded layer inputs.
    fn backpropagate(
        &self,
        layer_inputs: &[ArrayD<f32>],
        grad_scores: ArrayD<f32>,
    ) -> Result<ArrayD<f32>, NetError> {
        self.layers
            .iter()
            .zip(layer_inputs)
            .rev()
            .try_fold(grad_scores, |grad, (layer, input)| {
                layer.backward(input.view(), grad.view())
            })
    }
}

impl Backend for Sequential {
    type Error = NetError;

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn forward(&self, inputs: ArrayViewD<'_, f32>) -> Result<Array2<f32>, Self::Error> {
        self.run(inputs).map(|(_, scores)| scores)
    }

    fn backward(
        &self,
        inputs: ArrayViewD<'_, f32>,
        grad_scores: ArrayView2<'_, f32>,
    ) -> Result<ArrayD<f32>, Self::Error> {
        let (layer_inputs, scores) = self.run(inputs)?;
        if grad_scores.dim() != scores.dim() {
            return Err(NetError::incompatible(
                "scores",
                grad_scores.shape(),
                format!("gradient must match scores of shape {:?}", scores.shape()),
            ));
        }
        self.backpropagate(&layer_inputs, grad_scores.to_owned().into_dyn())
    }

    fn loss_and_gradient(
        &self,
        inputs: ArrayViewD<'_, f32>,
        labels: &[usize],
    ) -> Result<Evaluation, Error> {
        let (layer_inputs, scores) = self.run(inputs).map_err(Error::model)?;
        check_scores(&scores, labels.len(), self.num_classes)?;

        let (losses, grad_scores) = loss::softmax_cross_entropy(scores.view(), labels)?;
        let gradient = self
            .backpropagate(&layer_inputs, grad_scores.into_dyn())
            .map_err(Error::model)?;

        Ok(Evaluation {
            scores,
            losses,
            gradient,
        })
    }

    fn losses(&self, inputs: ArrayViewD<'_, f32>, labels: &[usize]) -> Result<Array1<f32>, Error> {
        let (_, scores) = self.run(inputs).map_err(Error::model)?;
        check_scores(&scores, labels.len(), self.num_classes)?;
        loss::cross_entropy(scores.view(), labels)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{Array, array};

    use super::*;
    use crate::nn::{Dense, Flatten, GlobalAvgPool, Relu};

    fn spec(shape: &[usize]) -> InputSpec {
        InputSpec::new(shape.to_vec()).unwrap()
    }

    fn mlp() -> Sequential {
        Sequential::build(
            &spec(&[2, 2]),
            vec![
                Box::new(Flatten) as Box<dyn Layer>,
                Box::new(Dense::new(
                    array![
                        [0.5, -0.2, 0.1],
                        [0.3, 0.8, -0.4],
                        [-0.6, 0.1, 0.9],
                        [0.2, -0.5, 0.4]
                    ],
                    array![0.0, 0.1, -0.1],
                )
                .unwrap()),
                Box::new(Relu),
                Box::new(Dense::without_bias(array![[1.0, -1.0], [0.5, 0.5], [-1.0, 2.0]])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn infers_class_count_from_layers() {
        let layers = vec![Box::new(GlobalAvgPool) as Box<dyn Layer>];
        let pool = Sequential::build(&spec(&[10, 5, 5]), layers).unwrap();
        assert_eq!(pool.num_classes(), 10);
        assert_eq!(pool.depth(), 1);

        assert_eq!(mlp().num_classes(), 2);
    }

    #[test]
    fn rejects_networks_that_are_not_classifiers() {
        let err = Sequential::build(&spec(&[3, 4]), Vec::new()).unwrap_err();
        assert!(matches!(err, NetError::NotAClassifier(shape) if shape == vec![3, 4]));

        let err = Sequential::build(&spec(&[3]), vec![Box::new(GlobalAvgPool) as Box<dyn Layer>])
            .unwrap_err();
        assert!(matches!(err, NetError::Incompatible { layer: "global_avg_pool", .. }));
    }

    #[test]
    fn rejects_inputs_of_another_shape() {
        let net = mlp();
        let x = Array::<f32, _>::zeros((1, 4)).into_dyn();

        assert!(matches!(
            net.forward(x.view()),
            Err(NetError::InputShape { .. })
        ));
    }

    #[test]
    fn loss_and_gradient_agree_with_separate_passes() {
        let net = mlp();
        let x = array![[[0.2, -0.4], [0.9, 0.1]], [[-0.3, 0.5], [0.0, 0.7]]].into_dyn();
        let labels = [1, 0];

        let eval = net.loss_and_gradient(x.view(), &labels).unwrap();

        assert_eq!(eval.scores, net.forward(x.view()).unwrap());
        assert_eq!(eval.losses, net.losses(x.view(), &labels).unwrap());

        let (_, grad_scores) = loss::softmax_cross_entropy(eval.scores.view(), &labels).unwrap();
        let gradient = net.backward(x.view(), grad_scores.view()).unwrap();
        assert_eq!(eval.gradient, gradient);
        assert_eq!(eval.gradient.shape(), x.shape());
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let net = mlp();
        let x = array![[[0.2, -0.4], [0.9, 0.1]]].into_dyn();
        let label = [0];

        let eval = net.loss_and_gradient(x.view(), &label).unwrap();

        let h = 1e-2;
        for index in [[0_usize, 0, 0], [0, 0, 1], [0, 1, 0], [0, 1, 1]] {
            let mut plus = x.clone();
            let mut minus = x.clone();
            plus[index.as_slice()] += h / 2.0;
            minus[index.as_slice()] -= h / 2.0;

            let estimate = (net.losses(plus.view(), &label).unwrap()[0]
                - net.losses(minus.view(), &label).unwrap()[0])
                / h;
            assert_abs_diff_eq!(estimate, eval.gradient[index.as_slice()], epsilon = 1e-3);
        }
    }
}
