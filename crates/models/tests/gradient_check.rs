use approx::assert_abs_diff_eq;
use ndarray::{Array, ArrayD, Axis, stack};
use rand::{Rng, SeedableRng, rngs::StdRng};

use foil_core::{Bounds, DifferentiableModel, Error, InputSpec, Preprocessing};
use foil_models::{
    Adapter, Config, directional_derivative,
    nn::{GlobalAvgPool, Layer, Sequential},
};

const LABEL: usize = 7;

fn uniform(rng: &mut StdRng, shape: &[usize]) -> ArrayD<f32> {
    ArrayD::from_shape_simple_fn(shape.to_vec(), || rng.r#gen::<f32>())
}

/// Builds a classifier whose score for class `k` is the mean of channel `k`,
/// after subtracting `k` and dividing by a random per-pixel scale.
fn mean_brightness(num_classes: usize, rng: &mut StdRng) -> Adapter<Sequential> {
    let input = InputSpec::new(vec![num_classes, 5, 5]).unwrap();
    let layers = vec![Box::new(GlobalAvgPool) as Box<dyn Layer>];
    let network = Sequential::build(&input, layers).unwrap();

    #[allow(clippy::cast_precision_loss)]
    let subtrahend = Array::from_shape_fn((num_classes, 1, 1), |(k, _, _)| k as f32).into_dyn();
    let divisor = uniform(rng, &[num_classes, 5, 5]) + 1.0;
    let preprocessing = Preprocessing::new(subtrahend, divisor).unwrap();

    let config = Config::new(Bounds::new(0.0, 255.0).unwrap()).with_preprocessing(preprocessing);
    Adapter::new(&input, network, config).unwrap()
}

#[test]
fn queries_agree_for_small_and_large_label_spaces() {
    for num_classes in [10, 1000] {
        let mut rng = StdRng::seed_from_u64(23);
        let model = mean_brightness(num_classes, &mut rng);
        let images = uniform(&mut rng, &[2, num_classes, 5, 5]);
        let image = images.index_axis(Axis(0), 0);

        assert_eq!(model.num_classes(), num_classes);
        assert_eq!(model.bounds().as_tuple(), (0.0, 255.0));

        let batch = model.batch_predictions(images.view()).unwrap();
        assert_eq!(batch.dim(), (2, num_classes));

        let scores = model.predictions(image.view()).unwrap();
        assert_eq!(scores, batch.index_axis(Axis(0), 0));

        let gradient = model.gradient(image.view(), LABEL).unwrap();
        assert_eq!(gradient.shape(), image.shape());

        let (combined_scores, combined_gradient) =
            model.predictions_and_gradient(image.view(), LABEL).unwrap();
        assert_eq!(combined_scores, scores);
        assert_eq!(combined_gradient, gradient);
    }
}

#[test]
fn gradient_matches_finite_difference_of_loss() {
    for num_classes in [10, 1000] {
        let mut rng = StdRng::seed_from_u64(23);
        let model = mean_brightness(num_classes, &mut rng);
        let image = uniform(&mut rng, &[num_classes, 5, 5]);
        let epsilon = 1e-2;

        let gradient = model.gradient(image.view(), LABEL).unwrap();
        let norm_squared = gradient.iter().map(|g| g * g).sum::<f32>();

        let step = &gradient * (epsilon / 2.0);
        let minus = &image - &step;
        let plus = &image + &step;
        let batch = stack(Axis(0), &[minus.view(), plus.view()]).unwrap();
        let losses = model.loss(batch.view(), &[LABEL, LABEL]).unwrap();

        assert_abs_diff_eq!(
            1e4 * (losses[1] - losses[0]),
            1e4 * epsilon * norm_squared,
            epsilon = 0.15
        );
    }
}

#[test]
fn directional_derivative_reports_consistent_gradient() {
    let mut rng = StdRng::seed_from_u64(31);
    let model = mean_brightness(10, &mut rng);
    let image = uniform(&mut rng, &[10, 5, 5]);

    let check = directional_derivative(&model, image.view(), LABEL, 1e-2).unwrap();
    assert!(check.expected > 0.0);
    assert!(check.is_consistent(5e-2), "{check:?}");
}

#[test]
fn invalid_queries_are_rejected() {
    let mut rng = StdRng::seed_from_u64(37);
    let model = mean_brightness(10, &mut rng);
    let image = uniform(&mut rng, &[10, 5, 5]);

    assert!(matches!(model.gradient(image.view(), 10), Err(Error::InvalidLabel(_))));

    let transposed = uniform(&mut rng, &[5, 5, 10]);
    assert!(matches!(model.predictions(transposed.view()), Err(Error::Shape(_))));
}
