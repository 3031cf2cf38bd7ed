//! Benchmark Configuration
//!
//! Every constant of the experiment lives here, so a run is fully
//! described by one serializable value that is echoed into the report.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::backends::{TransportKind, DEFAULT_LEAPFROG_STEPS};
use crate::data::{ObservationTimes, BENCHMARK_NOISE_STD};
use crate::error::DataError;
use crate::inference::{Kernel, SamplerConfig};
use crate::priors::NOISE_PARAM_NAME;
use crate::solver::SolverOptions;
use crate::systems::{FhnParams, FHN_INITIAL_STATE, FHN_PARAM_NAMES, FHN_TIME_SPAN};

/// Full description of one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Seed of the observation noise; samplers derive theirs from it
    pub seed: u64,
    /// Observation noise std σ
    pub noise_std: f64,
    /// Observation times
    pub times: Vec<f64>,
    /// Integration span
    pub t_span: (f64, f64),
    /// x(t₀)
    pub initial_state: Vec<f64>,
    /// Parameters that generate the data
    pub truth: FhnParams,
    /// Integrator for the data-generating trajectory
    pub data_solver: SolverOptions,
    /// Integrator inside every likelihood evaluation
    pub likelihood_solver: SolverOptions,
    /// Hand-written program with NUTS
    pub program_nuts: SamplerConfig,
    /// External runtime
    pub external: SamplerConfig,
    /// Automatic ODE model with NUTS
    pub ode_wrapper: SamplerConfig,
    /// Fixed-length HMC
    pub static_hmc: SamplerConfig,
    /// Run back-ends that are excluded by default
    pub include_excluded: bool,
    /// How the external runtime is reached
    pub transport: TransportKind,
    /// Where `report.json` and `trajectories.svg` go
    pub output_dir: PathBuf,
    /// Posterior-predictive trajectories drawn in the plot
    pub n_predictive_draws: usize,
    /// Grid points per plotted trajectory
    pub plot_points: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        let seed = 1;
        let nuts = SamplerConfig {
            seed,
            ..SamplerConfig::default()
        };
        Self {
            seed,
            noise_std: BENCHMARK_NOISE_STD,
            times: ObservationTimes::benchmark().as_slice().to_vec(),
            t_span: FHN_TIME_SPAN,
            initial_state: FHN_INITIAL_STATE.to_vec(),
            truth: FhnParams::reference(),
            data_solver: SolverOptions::reference(),
            likelihood_solver: SolverOptions::default(),
            program_nuts: nuts.clone(),
            external: SamplerConfig {
                warmup: 1000,
                draws: 10_000,
                chains: 1,
                target_accept: 0.65,
                ..nuts.clone()
            },
            ode_wrapper: nuts.clone(),
            static_hmc: SamplerConfig {
                kernel: Kernel::StaticHmc {
                    n_leapfrog: DEFAULT_LEAPFROG_STEPS,
                },
                ..nuts
            },
            include_excluded: false,
            transport: TransportKind::Auto,
            output_dir: PathBuf::from("output"),
            n_predictive_draws: 50,
            plot_points: 201,
        }
    }
}

impl BenchmarkConfig {
    /// Short chains for tests and smoke runs
    pub fn quick(warmup: usize, draws: usize) -> Self {
        let mut config = Self::default();
        for sampler in config.samplers_mut() {
            sampler.warmup = warmup;
            sampler.draws = draws;
            sampler.chains = sampler.chains.min(2);
        }
        config.n_predictive_draws = 5;
        config
    }

    /// Reseed the data and every sampler
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        for sampler in self.samplers_mut() {
            sampler.seed = seed;
        }
        self
    }

    fn samplers_mut(&mut self) -> [&mut SamplerConfig; 4] {
        [
            &mut self.program_nuts,
            &mut self.external,
            &mut self.ode_wrapper,
            &mut self.static_hmc,
        ]
    }

    /// Observation grid, validated
    pub fn observation_times(&self) -> Result<ObservationTimes, DataError> {
        ObservationTimes::from_vec(self.times.clone())
    }

    /// True value of a sampled parameter, `σ²` included
    pub fn truth_of(&self, name: &str) -> Option<f64> {
        if name == NOISE_PARAM_NAME {
            return Some(self.noise_std * self.noise_std);
        }
        FHN_PARAM_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|k| self.truth.to_array()[k])
    }
}
