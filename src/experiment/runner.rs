//! Experiment Runner
//!
//! ```text
//! BenchmarkConfig ──► truth trajectory ──► noisy dataset ──► InferenceProblem
//!                                                               │
//!            ┌───────────────┬──────────────┬─────────────────┬─┘
//!            ▼               ▼              ▼                 ▼
//!      program_nuts      external      ode_wrapper     static_hmc (opt-in)
//!            └───────────────┴──────┬───────┴─────────────────┘
//!                                   ▼
//!                          ExperimentReport
//! ```
//!
//! Back-ends run one after another. A failing back-end is recorded and the
//! next one still runs.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::config::BenchmarkConfig;
use crate::backends::{
    ExternalBackend, InferenceBackend, InferenceOutput, OdeWrapperBackend, ProgramNutsBackend,
    StaticHmcBackend,
};
use crate::data::SyntheticDataset;
use crate::error::BenchError;
use crate::inference::{InferenceProblem, SamplerConfig};
use crate::priors::PriorSet;
use crate::solver::OdeProblem;
use crate::systems::FitzHughNagumo;

/// What happened to one back-end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackendOutcome {
    /// Sampling finished (diagnostics may still flag problems)
    Completed(InferenceOutput),
    /// The back-end raised an error
    Failed {
        /// Back-end name
        backend: String,
        /// Error message
        error: String,
    },
    /// Skipped by configuration
    Excluded {
        /// Back-end name
        backend: String,
        /// Why it is excluded
        reason: String,
    },
}

impl BackendOutcome {
    /// Back-end name
    pub fn backend(&self) -> &str {
        match self {
            BackendOutcome::Completed(output) => &output.backend,
            BackendOutcome::Failed { backend, .. } | BackendOutcome::Excluded { backend, .. } => {
                backend
            }
        }
    }

    /// Output when sampling finished
    pub fn output(&self) -> Option<&InferenceOutput> {
        match self {
            BackendOutcome::Completed(output) => Some(output),
            _ => None,
        }
    }
}

/// Dataset and problem shared by every back-end of a run
#[derive(Debug, Clone)]
pub struct Experiment {
    /// Settings of the run
    pub config: BenchmarkConfig,
    /// Noisy observations plus the exact trajectory they came from
    pub dataset: SyntheticDataset,
    /// What the back-ends see
    pub problem: InferenceProblem<FitzHughNagumo>,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// Settings of the run
    pub config: BenchmarkConfig,
    /// Priors given to every back-end
    pub priors: PriorSet,
    /// Dataset the back-ends were fitted to
    pub dataset: SyntheticDataset,
    /// One entry per back-end, in run order
    pub outcomes: Vec<BackendOutcome>,
}

impl ExperimentReport {
    /// Outcomes that produced samples
    pub fn completed(&self) -> impl Iterator<Item = &InferenceOutput> {
        self.outcomes.iter().filter_map(BackendOutcome::output)
    }
}

impl Experiment {
    /// Solve the truth, draw the noise and build the shared problem
    pub fn setup(config: BenchmarkConfig) -> Result<Self, BenchError> {
        let times = config.observation_times()?;
        let truth = OdeProblem::new(
            FitzHughNagumo,
            config.initial_state.clone(),
            config.t_span,
            config.truth.to_vec(),
        )?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let dataset =
            SyntheticDataset::generate(&truth, &times, config.noise_std, &config.data_solver, &mut rng)?;

        let problem = InferenceProblem::from_dataset(
            FitzHughNagumo,
            config.initial_state.clone(),
            config.t_span,
            config.likelihood_solver,
            &dataset,
            PriorSet::benchmark()?,
        )?;
        info!(seed = config.seed, noise_std = config.noise_std, "experiment set up");

        Ok(Self {
            config,
            dataset,
            problem,
        })
    }

    /// Run one back-end; errors become a [`BackendOutcome::Failed`]
    pub fn run_backend<B>(&self, backend: &B, sampler: &SamplerConfig) -> BackendOutcome
    where
        B: InferenceBackend<FitzHughNagumo> + ?Sized,
    {
        match backend.run_inference(&self.problem, sampler) {
            Ok(output) => BackendOutcome::Completed(output),
            Err(e) => {
                error!(backend = backend.name(), error = %e, "back-end failed");
                BackendOutcome::Failed {
                    backend: backend.name().to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    fn run_or_exclude<B>(&self, backend: &B, sampler: &SamplerConfig) -> BackendOutcome
    where
        B: InferenceBackend<FitzHughNagumo> + ?Sized,
    {
        match backend.excluded_reason() {
            Some(reason) if !self.config.include_excluded => {
                info!(backend = backend.name(), reason, "back-end excluded");
                BackendOutcome::Excluded {
                    backend: backend.name().to_string(),
                    reason: reason.to_string(),
                }
            }
            _ => self.run_backend(backend, sampler),
        }
    }

    /// Run every back-end in turn
    pub fn run(&self) -> ExperimentReport {
        let config = &self.config;
        let mut outcomes = vec![self.run_or_exclude(&ProgramNutsBackend, &config.program_nuts)];

        outcomes.push(match config.transport.build() {
            Ok(transport) => {
                info!(transport = %transport.describe(), "external runtime");
                self.run_or_exclude(&ExternalBackend::new(transport), &config.external)
            }
            Err(e) => {
                warn!(error = %e, "external runtime unavailable");
                BackendOutcome::Failed {
                    backend: "external".to_string(),
                    error: e.to_string(),
                }
            }
        });

        outcomes.push(self.run_or_exclude(&OdeWrapperBackend, &config.ode_wrapper));
        outcomes.push(self.run_or_exclude(&StaticHmcBackend::default(), &config.static_hmc));

        ExperimentReport {
            config: config.clone(),
            priors: self.problem.priors.clone(),
            dataset: self.dataset.clone(),
            outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::TransportKind;
    use crate::error::InferenceError;
    use crate::inference::PosteriorSamples;

    struct Broken;

    impl InferenceBackend<FitzHughNagumo> for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn run_inference(
            &self,
            _problem: &InferenceProblem<FitzHughNagumo>,
            _config: &SamplerConfig,
        ) -> Result<InferenceOutput, InferenceError> {
            Err(InferenceError::invalid_problem("always fails"))
        }
    }

    #[test]
    fn test_setup_is_reproducible_and_hides_truth() {
        let a = Experiment::setup(BenchmarkConfig::default()).unwrap();
        let b = Experiment::setup(BenchmarkConfig::default()).unwrap();
        assert_eq!(a.dataset.observations, b.dataset.observations);
        assert_eq!(a.problem.observations, a.dataset.observations);
        assert_eq!(a.problem.observations.dim(), (2, 10));
        assert_eq!(a.problem.priors.len(), 5);

        let c = Experiment::setup(BenchmarkConfig::default().with_seed(2)).unwrap();
        assert_ne!(a.dataset.observations, c.dataset.observations);
    }

    #[test]
    fn test_failure_is_recorded_not_raised() {
        let experiment = Experiment::setup(BenchmarkConfig::default()).unwrap();
        let outcome = experiment.run_backend(&Broken, &SamplerConfig::default());
        match outcome {
            BackendOutcome::Failed { backend, error } => {
                assert_eq!(backend, "broken");
                assert!(error.contains("always fails"));
            }
            other => panic!("expected failure, got {:?}", other.backend()),
        }
    }

    #[test]
    fn test_quick_run_reports_every_backend() {
        let mut config = BenchmarkConfig::quick(30, 20);
        config.transport = TransportKind::InProcess;
        let report = Experiment::setup(config).unwrap().run();

        let names: Vec<&str> = report.outcomes.iter().map(BackendOutcome::backend).collect();
        assert_eq!(names, vec!["program_nuts", "external", "ode_wrapper", "static_hmc"]);
        assert!(matches!(report.outcomes[3], BackendOutcome::Excluded { .. }));
        assert_eq!(report.completed().count(), 3);

        let output = report.outcomes[0].output().unwrap();
        let samples: &PosteriorSamples = &output.samples;
        assert_eq!(samples.draws_per_chain(), 20);
        assert_eq!(samples.draws_per_chain(), output.diagnostics.n_draws);
        assert_eq!(samples.total_draws(), output.diagnostics.total_draws());
    }
}
