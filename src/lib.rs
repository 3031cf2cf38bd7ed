//! # FHN-Bayes-Bench
//!
//! Bayesian Parameter Estimation for the FitzHugh-Nagumo Model:
//! One Posterior, Several Samplers
//!
//! ## Problem
//!
//! The FitzHugh-Nagumo neuron
//!
//!   dv/dt = v − 0.33·v³ − w + l
//!   dw/dt = τ⁻¹·(v + a − b·w)
//!
//! is integrated from x(0) = (1, 1) over t ∈ [0, 10] with parameters
//! (a, b, τ⁻¹, l) = (0.7, 0.8, 0.08, 0.5). Both states are observed at
//! t = 1, 2, …, 10 with independent Gaussian noise of std 0.20. The task
//! is to recover the parameters (and the noise variance) from those 20
//! numbers.
//!
//! ### Model
//!
//!   a, b ~ TN(1.0, 0.5; 0, 1.5)
//!   τ⁻¹ ~ TN(0.0, 0.5; 0, 0.5)
//!   l ~ TN(0.5, 0.5; 0, 1.0)
//!   σ² ~ InverseGamma(2, 3)
//!   yᵢ ~ N(x(tᵢ; θ), σ²·I)
//!
//! ### Methodology
//!
//! 1. **Adaptive integration**: Dormand-Prince 5(4) with dense output and
//!    forward sensitivities, so every likelihood evaluation comes with an
//!    exact-to-tolerance gradient
//!
//! 2. **Unconstrained sampling**: bounded parameters are mapped to ℝ
//!    (logit / log) with the log-Jacobian added to the density
//!
//! 3. **NUTS**: multinomial No-U-Turn sampling with dual-averaging step
//!    size and windowed diagonal mass-matrix adaptation, several seeded
//!    chains in parallel
//!
//! 4. **Interchangeable back-ends**: a hand-written program, an external
//!    runtime reached over a JSON protocol, and an automatic ODE model,
//!    all behind [`InferenceBackend`]
//!
//! ## Key Result
//!
//! For a calibrated sampler, the posterior mean of each parameter lies
//! within 3 posterior standard deviations of the truth in at least 95 %
//! of independent datasets.
//!
//! ## References
//!
//! - FitzHugh, Biophys. J. 1, 445 (1961)
//! - Hairer, Nørsett & Wanner, "Solving ODEs I" (1993) - DOPRI5
//! - Hoffman & Gelman, JMLR 15, 1593 (2014) - NUTS
//! - Betancourt, arXiv:1701.02434 (2017) - multinomial NUTS
//! - Vehtari et al., Bayesian Analysis 16, 667 (2021) - R-hat, ESS

pub mod error;
pub mod systems;
pub mod solver;
pub mod data;
pub mod priors;
pub mod inference;
pub mod backends;
pub mod experiment;
pub mod report;

pub use error::{BenchError, DataError, InferenceError, IntegrationError, PriorError, Result};

// Re-exports from systems
pub use systems::{
    VectorField,
    FitzHughNagumo,
    FhnParams,
    FhnState,
    FHN_INITIAL_STATE,
    FHN_PARAM_NAMES,
    FHN_TIME_SPAN,
};

// Re-exports from solver
pub use solver::{OdeProblem, SensitivitySolution, Solution, SolverOptions, SolverStats};

// Re-exports from data
pub use data::{ObservationTimes, SyntheticDataset, BENCHMARK_NOISE_STD};

// Re-exports from priors
pub use priors::{InverseGamma, NamedPrior, Prior, PriorSet, TruncatedNormal, NOISE_PARAM_NAME};

// Re-exports from inference
pub use inference::{
    Diagnostics,
    InferenceProblem,
    Kernel,
    LogDensity,
    OdeBayesModel,
    ParameterSummary,
    PosteriorSamples,
    SamplerConfig,
    run_chains,
};

// Re-exports from backends
pub use backends::{
    ExternalBackend,
    InferenceBackend,
    InferenceOutput,
    OdeWrapperBackend,
    ProgramNutsBackend,
    StaticHmcBackend,
    TransportKind,
};

// Re-exports from experiment
pub use experiment::{
    BackendOutcome,
    BenchmarkConfig,
    CalibrationReport,
    Experiment,
    ExperimentReport,
    run_calibration,
};
