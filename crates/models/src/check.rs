//! Numerical verification of model gradients.
//!
//! For a gradient `g = ∇ₓ L(x)`, the central difference of the loss along `g`
//! estimates the directional derivative `∇ₓ L(x) · g = ‖g‖²`:
//!
//! ```text
//! (L(x + ε/2·g) - L(x - ε/2·g)) / ε  ≈  ‖g‖²
//! ```
//!
//! A mis-scaled gradient (for example, one missing the preprocessing
//! pullback) fails this check even when its direction is roughly right.

use ndarray::{ArrayViewD, Axis, stack};

use foil_core::{DifferentiableModel, Error, ShapeError};

/// The two sides of a directional-derivative check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientCheck {
    /// The loss difference along the gradient, divided by the step.
    pub estimate: f32,

    /// The squared norm of the gradient.
    pub expected: f32,

    /// The loss at `x - ε/2·g` and at `x + ε/2·g`.
    pub losses: [f32; 2],
}

impl GradientCheck {
    /// Returns `|estimate - expected| / max(|expected|, f32::MIN_POSITIVE)`.
    #[must_use]
    pub fn relative_error(&self) -> f32 {
        (self.estimate - self.expected).abs() / self.expected.abs().max(f32::MIN_POSITIVE)
    }

    /// Returns `true` if the relative error is within `tolerance`.
    #[must_use]
    pub fn is_consistent(&self, tolerance: f32) -> bool {
        self.relative_error() <= tolerance
    }
}

/// Compares a model's gradient with a central difference of its loss.
///
/// Both perturbed inputs are evaluated in one batched loss call.
///
/// # Errors
///
/// Returns an error if any model call fails.
pub fn directional_derivative<M>(
    model: &M,
    image: ArrayViewD<'_, f32>,
    label: usize,
    epsilon: f32,
) -> Result<GradientCheck, Error>
where
    M: DifferentiableModel + ?Sized,
{
    let gradient = model.gradient(image.view(), label)?;
    let expected = gradient.iter().map(|g| g * g).sum::<f32>();

    let step = &gradient * (epsilon / 2.0);
    let minus = &image - &step;
    let plus = &image + &step;
    let batch = stack(Axis(0), &[minus.view(), plus.view()])
        .map_err(|err| ShapeError::new("perturbed batch", err.to_string(), image.shape()))?;

    let losses = model.loss(batch.view(), &[label, label])?;
    let losses = [losses[0], losses[1]];

    Ok(GradientCheck {
        estimate: (losses[1] - losses[0]) / epsilon,
        expected,
        losses,
    })
}
