//! Posterior in Unconstrained Space
//!
//! Samplers move on z ∈ ℝᵈ and see the potential energy
//!
//!   U(z) = −[ log p(θ(z) | data) + ln|det ∂θ/∂z| ]

use super::model::LogDensity;
use super::transform::Transform;
use crate::error::InferenceError;

/// A [`LogDensity`] viewed through its bound transforms
pub struct Posterior<'a, M: ?Sized> {
    model: &'a M,
    transform: Transform,
}

impl<'a, M: LogDensity + ?Sized> Posterior<'a, M> {
    /// Wrap `model`, deriving transforms from its bounds
    pub fn new(model: &'a M) -> Self {
        let transform = Transform::from_bounds(&model.param_bounds());
        Self { model, transform }
    }

    /// Dimension of z
    pub fn dim(&self) -> usize {
        self.transform.dim()
    }

    /// Underlying model
    pub fn model(&self) -> &M {
        self.model
    }

    /// Coordinate transforms
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// z ↦ θ
    pub fn to_constrained(&self, z: &[f64]) -> Vec<f64> {
        self.transform.to_constrained(z)
    }

    /// θ ↦ z
    pub fn to_unconstrained(&self, theta: &[f64]) -> Vec<f64> {
        self.transform.to_unconstrained(theta)
    }

    /// U(z); writes ∂U/∂z into `grad`.
    ///
    /// A non-finite log density is returned as `U = +∞` so the caller can
    /// treat it as a divergence. Model errors propagate.
    pub fn potential_grad(&self, z: &[f64], grad: &mut [f64]) -> Result<f64, InferenceError> {
        let theta = self.transform.to_constrained(z);
        let log_p = self.model.log_density_grad(&theta, grad)?;
        if !log_p.is_finite() {
            grad.iter_mut().for_each(|g| *g = 0.0);
            return Ok(f64::INFINITY);
        }

        let mut log_jac = 0.0;
        for (i, t) in self.transform.coords().iter().enumerate() {
            log_jac += t.ln_abs_jacobian(z[i]);
            grad[i] = -(grad[i] * t.jacobian(z[i]) + t.grad_ln_abs_jacobian(z[i]));
        }
        Ok(-(log_p + log_jac))
    }
}
