//! Wire Schema Between the Benchmark and the External Sampler Runtime
//!
//! One JSON request in, one JSON response out. The request carries
//! everything needed to rebuild the model on the other side; nothing about
//! the ground truth crosses the boundary.
//!
//! ```text
//! SamplerRequest                          SamplerResponse
//! ┌───────────────────────────┐          ┌──────────────────────────┐
//! │ protocol_version          │          │ status: "ok"             │
//! │ model_id, param_names     │   ───►   │   samples, diagnostics   │
//! │ priors (bounds, hypers)   │          │ status: "error"          │
//! │ x0, t_span, times         │   ◄───   │   message                │
//! │ observations (row-major)  │          └──────────────────────────┘
//! │ solver, sampler settings  │
//! └───────────────────────────┘
//! ```

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::ObservationTimes;
use crate::error::InferenceError;
use crate::inference::{Diagnostics, InferenceProblem, PosteriorSamples, SamplerConfig};
use crate::priors::PriorSet;
use crate::solver::SolverOptions;
use crate::systems::VectorField;

/// Bumped whenever either message changes shape
pub const PROTOCOL_VERSION: u32 = 1;

/// Everything the external runtime needs to sample a posterior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerRequest {
    /// Must equal [`PROTOCOL_VERSION`] on both sides
    pub protocol_version: u32,
    /// Which vector field to rebuild
    pub model_id: String,
    /// Structural parameter names, in vector order
    pub param_names: Vec<String>,
    /// Priors with their bounds and hyper-parameters
    pub priors: PriorSet,
    /// Known noise std when σ² is not sampled
    pub fixed_noise_std: Option<f64>,
    /// x(t₀)
    pub initial_state: Vec<f64>,
    /// `(t₀, t₁)`
    pub t_span: (f64, f64),
    /// Observation times
    pub times: Vec<f64>,
    /// Observations flattened row-major: all of state 0, then state 1, …
    pub observations: Vec<f64>,
    /// Number of state components (rows of the observation matrix)
    pub n_states: usize,
    /// Integrator settings for the likelihood
    pub solver: SolverOptions,
    /// Sampler settings
    pub sampler: SamplerConfig,
}

impl SamplerRequest {
    /// Marshal a problem and sampler settings
    pub fn from_problem<F: VectorField>(problem: &InferenceProblem<F>, sampler: &SamplerConfig) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            model_id: problem.field.model_id().to_string(),
            param_names: problem.field.param_names().iter().map(|s| s.to_string()).collect(),
            priors: problem.priors.clone(),
            fixed_noise_std: problem.fixed_noise_std,
            initial_state: problem.initial_state.clone(),
            t_span: problem.t_span,
            times: problem.times.as_slice().to_vec(),
            observations: problem.flat_observations(),
            n_states: problem.observations.nrows(),
            solver: problem.solver,
            sampler: sampler.clone(),
        }
    }

    /// Rebuild the problem around `field` and check it matches the request
    pub fn to_problem<F: VectorField>(&self, field: F) -> Result<InferenceProblem<F>, InferenceError> {
        if self.protocol_version != PROTOCOL_VERSION {
            return Err(InferenceError::invalid_problem(format!(
                "protocol version {} not supported (expected {})",
                self.protocol_version, PROTOCOL_VERSION
            )));
        }
        if field.model_id() != self.model_id {
            return Err(InferenceError::invalid_problem(format!(
                "request is for model '{}', not '{}'",
                self.model_id,
                field.model_id()
            )));
        }
        if self.param_names.iter().map(String::as_str).ne(field.param_names().iter().copied()) {
            return Err(InferenceError::invalid_problem(format!(
                "parameter names {:?} do not match model '{}'",
                self.param_names, self.model_id
            )));
        }

        let times = ObservationTimes::from_vec(self.times.clone())
            .map_err(|e| InferenceError::invalid_problem(e.to_string()))?;
        let n_times = times.len();
        let observations = Array2::from_shape_vec((self.n_states, n_times), self.observations.clone())
            .map_err(|e| {
                InferenceError::invalid_problem(format!(
                    "{} observations do not fill {} × {}: {}",
                    self.observations.len(),
                    self.n_states,
                    n_times,
                    e
                ))
            })?;

        let problem = InferenceProblem {
            field,
            initial_state: self.initial_state.clone(),
            t_span: self.t_span,
            solver: self.solver,
            times,
            observations,
            priors: self.priors.clone(),
            fixed_noise_std: self.fixed_noise_std,
        };
        problem.validate()?;
        Ok(problem)
    }
}

/// Result of one request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SamplerResponse {
    /// Sampling finished
    Ok {
        /// Posterior draws
        samples: PosteriorSamples,
        /// Sampler health
        diagnostics: Diagnostics,
    },
    /// Sampling could not run
    Error {
        /// Human-readable reason
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{BenchmarkConfig, Experiment};
    use crate::priors::PriorSet;
    use crate::systems::{FitzHughNagumo, FHN_INITIAL_STATE, FHN_TIME_SPAN};

    fn problem() -> InferenceProblem<FitzHughNagumo> {
        let observations = Array2::from_shape_fn((2, 10), |(i, j)| (10 * i + j) as f64 * 0.01);
        InferenceProblem::new(
            FitzHughNagumo,
            FHN_INITIAL_STATE.to_vec(),
            FHN_TIME_SPAN,
            SolverOptions::default(),
            ObservationTimes::benchmark(),
            observations,
            PriorSet::benchmark().unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_request_flattens_observations_row_major() {
        let request = SamplerRequest::from_problem(&problem(), &SamplerConfig::default());
        assert_eq!(request.model_id, "fitzhugh_nagumo");
        assert_eq!(request.n_states, 2);
        assert_eq!(request.observations.len(), 20);
        // All of v first, then all of w
        assert_eq!(request.observations[9], 9.0 * 0.01);
        assert_eq!(request.observations[10], 10.0 * 0.01);
    }

    #[test]
    fn test_request_rebuilds_problem_through_json() {
        let original = problem();
        let request = SamplerRequest::from_problem(&original, &SamplerConfig::default());
        let json = serde_json::to_string(&request).unwrap();
        let decoded: SamplerRequest = serde_json::from_str(&json).unwrap();
        let rebuilt = decoded.to_problem(FitzHughNagumo).unwrap();
        assert_eq!(rebuilt.observations, original.observations);
        assert_eq!(rebuilt.priors, original.priors);
        assert_eq!(rebuilt.times, original.times);
    }

    fn bits(values: impl IntoIterator<Item = f64>) -> Vec<u64> {
        values.into_iter().map(f64::to_bits).collect()
    }

    #[test]
    fn test_benchmark_dataset_crosses_the_wire_bit_for_bit() {
        let experiment = Experiment::setup(BenchmarkConfig::default()).unwrap();
        let request = SamplerRequest::from_problem(&experiment.problem, &SamplerConfig::default());
        let json = serde_json::to_string(&request).unwrap();
        let decoded: SamplerRequest = serde_json::from_str(&json).unwrap();
        let rebuilt = decoded.to_problem(FitzHughNagumo).unwrap();

        assert_eq!(
            bits(rebuilt.observations.iter().copied()),
            bits(experiment.problem.observations.iter().copied())
        );
        assert_eq!(
            bits(rebuilt.observations.iter().copied()),
            bits(experiment.dataset.observations.iter().copied())
        );
    }

    #[test]
    fn test_response_draws_survive_json_exactly() {
        let draws = Array2::from_shape_fn((50, 2), |(i, j)| {
            (i as f64 + 1.0).ln() / 3.0 - (j as f64 + 0.1).sqrt() / 7.0
        });
        let samples = PosteriorSamples::new(vec!["a".into(), "b".into()], vec![draws.clone()]);
        let response = SamplerResponse::Ok {
            samples,
            diagnostics: Diagnostics {
                n_chains: 1,
                n_draws: 50,
                divergences: 0,
                mean_accept_prob: 0.8123456789012345,
                step_size: 0.1,
                mean_tree_depth: 3.0,
                mean_leapfrog: 7.0,
                params: Vec::new(),
            },
        };
        let json = serde_json::to_string(&response).unwrap();
        match serde_json::from_str::<SamplerResponse>(&json).unwrap() {
            SamplerResponse::Ok { samples, .. } => {
                assert_eq!(bits(samples.chains()[0].iter().copied()), bits(draws.iter().copied()));
            }
            other => panic!("expected samples, got {:?}", other),
        }
    }

    #[test]
    fn test_fixed_noise_request_rebuilds() {
        let fixed = problem().with_fixed_noise(0.2).unwrap();
        let request = SamplerRequest::from_problem(&fixed, &SamplerConfig::default());
        let rebuilt = request.to_problem(FitzHughNagumo).unwrap();
        assert_eq!(rebuilt.fixed_noise_std, Some(0.2));
        assert!(rebuilt.priors.noise().is_none());
    }

    #[test]
    fn test_mismatched_requests_rejected() {
        let mut request = SamplerRequest::from_problem(&problem(), &SamplerConfig::default());
        request.protocol_version += 1;
        assert!(request.to_problem(FitzHughNagumo).is_err());

        let mut request = SamplerRequest::from_problem(&problem(), &SamplerConfig::default());
        request.observations.pop();
        assert!(matches!(
            request.to_problem(FitzHughNagumo),
            Err(InferenceError::InvalidProblem(_))
        ));
    }

    #[test]
    fn test_response_is_tagged_by_status() {
        let response = SamplerResponse::Error {
            message: "boom".into(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"status":"error","message":"boom"}"#);
    }
}
