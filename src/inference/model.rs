//! Log-Density Models
//!
//! Samplers see a model only through [`LogDensity`]: a dimension, names,
//! box bounds and an unnormalized log posterior with its gradient, all in
//! the constrained (natural) parameter space. Mapping to unconstrained
//! space is the sampler's concern, see [`Posterior`](super::Posterior).

use crate::error::InferenceError;

/// Differentiable unnormalized log density over a box-bounded space
pub trait LogDensity: Send + Sync {
    /// Number of parameters
    fn dim(&self) -> usize;

    /// Parameter names, in vector order
    fn param_names(&self) -> Vec<String>;

    /// `(lower, upper)` per parameter; infinite ends mean unbounded
    fn param_bounds(&self) -> Vec<(f64, f64)>;

    /// Starting point strictly inside the bounds
    fn initial_point(&self) -> Vec<f64>;

    /// log p(θ | data) up to a constant; writes ∂/∂θ into `grad`
    fn log_density_grad(&self, theta: &[f64], grad: &mut [f64]) -> Result<f64, InferenceError>;

    /// log p(θ | data) without keeping the gradient
    fn log_density(&self, theta: &[f64]) -> Result<f64, InferenceError> {
        let mut grad = vec![0.0; self.dim()];
        self.log_density_grad(theta, &mut grad)
    }
}

impl<M: LogDensity + ?Sized> LogDensity for &M {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn param_names(&self) -> Vec<String> {
        (**self).param_names()
    }

    fn param_bounds(&self) -> Vec<(f64, f64)> {
        (**self).param_bounds()
    }

    fn initial_point(&self) -> Vec<f64> {
        (**self).initial_point()
    }

    fn log_density_grad(&self, theta: &[f64], grad: &mut [f64]) -> Result<f64, InferenceError> {
        (**self).log_density_grad(theta, grad)
    }
}

#[cfg(test)]
pub(crate) mod test_models {
    //! Small analytic targets shared by the sampler tests

    use super::*;

    /// Independent normals N(μᵢ, sᵢ²), unbounded
    pub(crate) struct IsoNormal {
        pub mu: Vec<f64>,
        pub scale: Vec<f64>,
    }

    impl LogDensity for IsoNormal {
        fn dim(&self) -> usize {
            self.mu.len()
        }

        fn param_names(&self) -> Vec<String> {
            (0..self.dim()).map(|i| format!("x{}", i)).collect()
        }

        fn param_bounds(&self) -> Vec<(f64, f64)> {
            vec![(f64::NEG_INFINITY, f64::INFINITY); self.dim()]
        }

        fn initial_point(&self) -> Vec<f64> {
            vec![0.0; self.dim()]
        }

        fn log_density_grad(&self, theta: &[f64], grad: &mut [f64]) -> Result<f64, InferenceError> {
            let mut lp = 0.0;
            for i in 0..self.dim() {
                let z = (theta[i] - self.mu[i]) / self.scale[i];
                lp -= 0.5 * z * z;
                grad[i] = -z / self.scale[i];
            }
            Ok(lp)
        }
    }

    /// Beta(α, β) on (0, 1)
    pub(crate) struct BetaTarget {
        pub alpha: f64,
        pub beta: f64,
    }

    impl LogDensity for BetaTarget {
        fn dim(&self) -> usize {
            1
        }

        fn param_names(&self) -> Vec<String> {
            vec!["p".to_string()]
        }

        fn param_bounds(&self) -> Vec<(f64, f64)> {
            vec![(0.0, 1.0)]
        }

        fn initial_point(&self) -> Vec<f64> {
            vec![0.5]
        }

        fn log_density_grad(&self, theta: &[f64], grad: &mut [f64]) -> Result<f64, InferenceError> {
            let p = theta[0];
            grad[0] = (self.alpha - 1.0) / p - (self.beta - 1.0) / (1.0 - p);
            Ok((self.alpha - 1.0) * p.ln() + (self.beta - 1.0) * (1.0 - p).ln())
        }
    }
}
