//! Automatic Bayesian ODE Model
//!
//! Builds a [`LogDensity`] from any [`InferenceProblem`]: the structural
//! parameters come from the vector field, their priors from the prior set,
//! and the likelihood from a forward-sensitivity solve at the observation
//! times. When the prior set carries a noise prior, σ² is appended as the
//! last parameter.

use ndarray::Array2;

use super::likelihood::gaussian_log_likelihood;
use super::model::LogDensity;
use super::problem::InferenceProblem;
use crate::error::InferenceError;
use crate::priors::{NamedPrior, Prior};
use crate::solver::{OdeProblem, SolverOptions};
use crate::systems::VectorField;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Noise {
    /// σ² is the last parameter
    Inferred,
    /// Known variance
    Fixed(f64),
}

/// Posterior over the parameters of an ODE observed with Gaussian noise
#[derive(Debug, Clone)]
pub struct OdeBayesModel<F> {
    ode: OdeProblem<F>,
    solver: SolverOptions,
    times: Vec<f64>,
    observations: Array2<f64>,
    priors: Vec<NamedPrior>,
    noise: Noise,
}

impl<F: VectorField + Clone> OdeBayesModel<F> {
    /// Derive the model from a validated problem
    pub fn from_problem(problem: &InferenceProblem<F>) -> Result<Self, InferenceError> {
        problem.validate()?;

        let central: Vec<f64> = problem
            .priors
            .structural()
            .iter()
            .map(|p| p.prior.central_value())
            .collect();
        let ode = OdeProblem::new(
            problem.field.clone(),
            problem.initial_state.clone(),
            problem.t_span,
            central,
        )?;

        let noise = match (problem.priors.noise(), problem.fixed_noise_std) {
            (Some(_), _) => Noise::Inferred,
            (None, Some(std)) => Noise::Fixed(std * std),
            (None, None) => {
                return Err(InferenceError::invalid_problem("noise treatment missing"));
            }
        };

        Ok(Self {
            ode,
            solver: problem.solver,
            times: problem.times.as_slice().to_vec(),
            observations: problem.observations.clone(),
            priors: problem.priors.iter().cloned().collect(),
            noise,
        })
    }

    fn n_structural(&self) -> usize {
        self.ode.field.param_dim()
    }
}

impl<F> OdeBayesModel<F> {
    /// Whether σ² is sampled
    pub fn infers_noise(&self) -> bool {
        self.noise == Noise::Inferred
    }

    /// Prior on σ² when it is sampled
    pub fn noise_prior(&self) -> Option<&Prior> {
        if self.infers_noise() {
            self.priors.last().map(|p| &p.prior)
        } else {
            None
        }
    }
}

impl<F: VectorField + Clone> LogDensity for OdeBayesModel<F> {
    fn dim(&self) -> usize {
        self.priors.len()
    }

    fn param_names(&self) -> Vec<String> {
        self.priors.iter().map(|p| p.name.clone()).collect()
    }

    fn param_bounds(&self) -> Vec<(f64, f64)> {
        self.priors.iter().map(|p| p.prior.support()).collect()
    }

    fn initial_point(&self) -> Vec<f64> {
        self.priors.iter().map(|p| p.prior.central_value()).collect()
    }

    fn log_density_grad(&self, theta: &[f64], grad: &mut [f64]) -> Result<f64, InferenceError> {
        let p = self.n_structural();

        let mut log_prior = 0.0;
        for (k, named) in self.priors.iter().enumerate() {
            let lp = named.prior.ln_pdf(theta[k]);
            if lp == f64::NEG_INFINITY {
                return Ok(f64::NEG_INFINITY);
            }
            log_prior += lp;
            grad[k] = named.prior.grad_ln_pdf(theta[k]);
        }

        let variance = match self.noise {
            Noise::Inferred => theta[p],
            Noise::Fixed(v) => v,
        };

        let solution = self
            .ode
            .solve_sensitivities(&theta[..p], &self.times, &self.solver)?;
        let terms = gaussian_log_likelihood(&self.observations, &solution, variance);

        for (g, dl) in grad[..p].iter_mut().zip(&terms.grad_params) {
            *g += dl;
        }
        if self.noise == Noise::Inferred {
            grad[p] += terms.grad_variance;
        }
        Ok(log_prior + terms.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ObservationTimes;
    use crate::priors::PriorSet;
    use crate::systems::{FitzHughNagumo, FhnParams, FHN_INITIAL_STATE, FHN_TIME_SPAN};
    use approx::assert_abs_diff_eq;

    fn fhn_model(fixed_noise: bool) -> OdeBayesModel<FitzHughNagumo> {
        let times = ObservationTimes::benchmark();
        let truth = OdeProblem::new(
            FitzHughNagumo,
            FHN_INITIAL_STATE.to_vec(),
            FHN_TIME_SPAN,
            FhnParams::reference().to_vec(),
        )
        .unwrap();
        let clean = truth.solve_at(times.as_slice(), &SolverOptions::default()).unwrap().states;
        let observations = Array2::from_shape_fn(clean.dim(), |(i, j)| {
            clean[[i, j]] + 0.15 * ((3 * i + j) as f64).cos()
        });

        let mut problem = InferenceProblem::new(
            FitzHughNagumo,
            FHN_INITIAL_STATE.to_vec(),
            FHN_TIME_SPAN,
            SolverOptions::reference(),
            times,
            observations,
            PriorSet::benchmark().unwrap(),
        )
        .unwrap();
        if fixed_noise {
            problem = problem.with_fixed_noise(0.2).unwrap();
        }
        OdeBayesModel::from_problem(&problem).unwrap()
    }

    #[test]
    fn test_layout_with_and_without_noise() {
        let model = fhn_model(false);
        assert_eq!(model.dim(), 5);
        assert_eq!(model.param_names(), vec!["a", "b", "tau_inv", "l", "sigma2"]);
        assert_eq!(model.param_bounds()[4], (0.0, f64::INFINITY));
        assert!(model.infers_noise());
        assert!(model.noise_prior().is_some());

        let fixed = fhn_model(true);
        assert_eq!(fixed.dim(), 4);
        assert!(!fixed.infers_noise());
        assert!(fixed.noise_prior().is_none());
    }

    #[test]
    fn test_log_density_gradient_matches_finite_difference() {
        let model = fhn_model(false);
        let theta = vec![0.72, 0.78, 0.09, 0.52, 0.05];
        let mut grad = vec![0.0; 5];
        model.log_density_grad(&theta, &mut grad).unwrap();

        let h = 1e-5;
        for k in 0..5 {
            let mut up = theta.clone();
            let mut dn = theta.clone();
            up[k] += h;
            dn[k] -= h;
            let fd = (model.log_density(&up).unwrap() - model.log_density(&dn).unwrap()) / (2.0 * h);
            assert_abs_diff_eq!(grad[k], fd, epsilon = 1e-4 * (1.0 + fd.abs()));
        }
    }

    #[test]
    fn test_outside_prior_support_is_impossible() {
        let model = fhn_model(false);
        let mut grad = vec![0.0; 5];
        let lp = model
            .log_density_grad(&[1.6, 0.8, 0.08, 0.5, 0.04], &mut grad)
            .unwrap();
        assert_eq!(lp, f64::NEG_INFINITY);
    }

    #[test]
    fn test_density_prefers_truth_over_distant_point() {
        let model = fhn_model(true);
        let near = model.log_density(&[0.7, 0.8, 0.08, 0.5]).unwrap();
        let far = model.log_density(&[1.4, 0.1, 0.45, 0.05]).unwrap();
        assert!(near > far, "near {} should beat far {}", near, far);
    }
}
