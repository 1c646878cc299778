//! Softmax cross-entropy on batches of class scores.
//!
//! Every backend computes its loss through these functions, so the value a
//! gradient is checked against is the same no matter which backend produced
//! the scores.

use ndarray::{Array1, Array2, ArrayView2};

use crate::{Error, InvalidLabelError, ShapeError};

/// Row-wise `log(softmax(scores))`, shifted by the row maximum for stability.
#[must_use]
pub fn log_softmax(scores: ArrayView2<'_, f32>) -> Array2<f32> {
    let mut out = scores.to_owned();
    for mut row in out.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        let log_sum = row.iter().map(|&v| (v - max).exp()).sum::<f32>().ln() + max;
        row.mapv_inplace(|v| v - log_sum);
    }
    out
}

/// Row-wise softmax probabilities.
#[must_use]
pub fn softmax(scores: ArrayView2<'_, f32>) -> Array2<f32> {
    log_softmax(scores).mapv_into(f32::exp)
}

/// Per-sample negative log-likelihood of the labeled class.
///
/// # Errors
///
/// Returns [`Error::Shape`] if `labels.len()` differs from the number of
/// rows, or [`Error::InvalidLabel`] if a label is not a valid column index.
pub fn cross_entropy(scores: ArrayView2<'_, f32>, labels: &[usize]) -> Result<Array1<f32>, Error> {
    check_labels(scores, labels)?;
    let log_probs = log_softmax(scores);
    Ok(labels
        .iter()
        .enumerate()
        .map(|(i, &label)| -log_probs[[i, label]])
        .collect())
}

/// Per-sample cross-entropy and its gradient with respect to the scores.
///
/// The gradient is `softmax(scores) - onehot(label)` for each row.
///
/// # Errors
///
/// Returns an error under the same conditions as [`cross_entropy`].
pub fn softmax_cross_entropy(
    scores: ArrayView2<'_, f32>,
    labels: &[usize],
) -> Result<(Array1<f32>, Array2<f32>), Error> {
    check_labels(scores, labels)?;
    let log_probs = log_softmax(scores);

    let losses = labels
        .iter()
        .enumerate()
        .map(|(i, &label)| -log_probs[[i, label]])
        .collect();

    let mut gradient = log_probs.mapv_into(f32::exp);
    for (i, &label) in labels.iter().enumerate() {
        gradient[[i, label]] -= 1.0;
    }

    Ok((losses, gradient))
}

fn check_labels(scores: ArrayView2<'_, f32>, labels: &[usize]) -> Result<(), Error> {
    if scores.nrows() != labels.len() {
        return Err(ShapeError::exact("labels", &[scores.nrows()], &[labels.len()]).into());
    }
    let num_classes = scores.ncols();
    match labels.iter().find(|&&label| label >= num_classes) {
        Some(&label) => Err(InvalidLabelError { label, num_classes }.into()),
        None => Ok(()),
    }
}
