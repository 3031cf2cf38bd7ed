//! Inference Problem: Everything a Back-End Needs, Nothing More
//!
//! The ground-truth parameters and the clean trajectory never enter this
//! type; back-ends see the model, the observations and the priors.

use ndarray::Array2;

use crate::data::{ObservationTimes, SyntheticDataset};
use crate::error::InferenceError;
use crate::priors::PriorSet;
use crate::solver::SolverOptions;
use crate::systems::VectorField;

/// Model, data and priors shared read-only by every back-end
#[derive(Debug, Clone)]
pub struct InferenceProblem<F> {
    /// Vector field
    pub field: F,
    /// x(t₀)
    pub initial_state: Vec<f64>,
    /// `(t₀, t₁)`
    pub t_span: (f64, f64),
    /// Integrator settings used inside the likelihood
    pub solver: SolverOptions,
    /// Observation times
    pub times: ObservationTimes,
    /// Noisy observations, `n_states × n_times`
    pub observations: Array2<f64>,
    /// Priors; structural priors follow the field's parameter order
    pub priors: PriorSet,
    /// Noise std used when the prior set has no noise prior
    pub fixed_noise_std: Option<f64>,
}

impl<F: VectorField> InferenceProblem<F> {
    /// Bundle and validate
    pub fn new(
        field: F,
        initial_state: Vec<f64>,
        t_span: (f64, f64),
        solver: SolverOptions,
        times: ObservationTimes,
        observations: Array2<f64>,
        priors: PriorSet,
    ) -> Result<Self, InferenceError> {
        let problem = Self {
            field,
            initial_state,
            t_span,
            solver,
            times,
            observations,
            priors,
            fixed_noise_std: None,
        };
        problem.validate()?;
        Ok(problem)
    }

    /// Take times and noisy observations from `dataset`
    pub fn from_dataset(
        field: F,
        initial_state: Vec<f64>,
        t_span: (f64, f64),
        solver: SolverOptions,
        dataset: &SyntheticDataset,
        priors: PriorSet,
    ) -> Result<Self, InferenceError> {
        Self::new(
            field,
            initial_state,
            t_span,
            solver,
            dataset.times.clone(),
            dataset.observations.clone(),
            priors,
        )
    }

    /// Treat the noise std as known instead of inferring σ²
    pub fn with_fixed_noise(mut self, noise_std: f64) -> Result<Self, InferenceError> {
        if !noise_std.is_finite() || noise_std <= 0.0 {
            return Err(InferenceError::invalid_problem(format!(
                "fixed noise std must be finite and > 0, got {}",
                noise_std
            )));
        }
        self.priors = self.priors.without_noise();
        self.fixed_noise_std = Some(noise_std);
        Ok(self)
    }

    /// Consistency of names, shapes and noise treatment
    pub fn validate(&self) -> Result<(), InferenceError> {
        let n = self.field.state_dim();
        if self.initial_state.len() != n {
            return Err(InferenceError::invalid_problem(format!(
                "initial state has {} components, model has {}",
                self.initial_state.len(),
                n
            )));
        }
        let expected = (n, self.times.len());
        if self.observations.dim() != expected {
            return Err(InferenceError::invalid_problem(format!(
                "observations are {:?}, expected {:?}",
                self.observations.dim(),
                expected
            )));
        }
        if self.observations.iter().any(|y| !y.is_finite()) {
            return Err(InferenceError::invalid_problem("non-finite observation"));
        }
        let (t0, t1) = self.t_span;
        if self.times.first() < t0 || self.times.last() > t1 {
            return Err(InferenceError::invalid_problem(format!(
                "observation times [{}, {}] leave the span [{}, {}]",
                self.times.first(),
                self.times.last(),
                t0,
                t1
            )));
        }

        let names: Vec<&str> = self.priors.structural().iter().map(|p| p.name.as_str()).collect();
        if names != self.field.param_names() {
            return Err(InferenceError::invalid_problem(format!(
                "priors {:?} do not match model parameters {:?}",
                names,
                self.field.param_names()
            )));
        }
        if self.priors.noise().is_none() && self.fixed_noise_std.is_none() {
            return Err(InferenceError::invalid_problem(
                "no noise prior and no fixed noise std",
            ));
        }
        self.priors.validate()?;
        Ok(())
    }

    /// Observations flattened row by row (all of state 0, then state 1, …)
    pub fn flat_observations(&self) -> Vec<f64> {
        self.observations.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priors::{NamedPrior, Prior, TruncatedNormal};
    use crate::systems::{FitzHughNagumo, FHN_INITIAL_STATE, FHN_TIME_SPAN};

    fn problem(priors: PriorSet, observations: Array2<f64>) -> Result<InferenceProblem<FitzHughNagumo>, InferenceError> {
        InferenceProblem::new(
            FitzHughNagumo,
            FHN_INITIAL_STATE.to_vec(),
            FHN_TIME_SPAN,
            SolverOptions::default(),
            ObservationTimes::benchmark(),
            observations,
            priors,
        )
    }

    #[test]
    fn test_benchmark_problem_is_valid() {
        let p = problem(PriorSet::benchmark().unwrap(), Array2::zeros((2, 10))).unwrap();
        assert_eq!(p.flat_observations().len(), 20);
        assert!(p.fixed_noise_std.is_none());

        let fixed = p.with_fixed_noise(0.2).unwrap();
        assert!(fixed.priors.noise().is_none());
        assert_eq!(fixed.fixed_noise_std, Some(0.2));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = problem(PriorSet::benchmark().unwrap(), Array2::zeros((2, 9))).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidProblem(_)));
    }

    #[test]
    fn test_prior_names_must_match_model() {
        let tn = |name: &str| NamedPrior {
            name: name.into(),
            prior: Prior::TruncatedNormal(TruncatedNormal::new(name, 0.5, 0.5, 0.0, 1.0).unwrap()),
        };
        let priors = PriorSet::new(vec![tn("a"), tn("b"), tn("l"), tn("tau_inv")], None).unwrap();
        let err = problem(priors, Array2::zeros((2, 10))).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidProblem(_)));
    }

    #[test]
    fn test_missing_noise_treatment_rejected() {
        let priors = PriorSet::benchmark().unwrap().without_noise();
        assert!(problem(priors, Array2::zeros((2, 10))).is_err());
    }
}
