//! Inference Module: Gradient-Based MCMC over ODE Posteriors
//!
//! - `model.rs`: the [`LogDensity`] seam between models and samplers
//! - `transform.rs`, `posterior.rs`: sampling in unconstrained space
//! - `hmc.rs`, `nuts.rs`: leapfrog dynamics, static HMC and NUTS
//! - `adapt.rs`: step-size and mass-matrix adaptation during warmup
//! - `sampler.rs`: seeded multi-chain execution on rayon
//! - `samples.rs`, `diagnostics.rs`: sample collections, ESS, R-hat
//! - `problem.rs`, `likelihood.rs`, `ode_model.rs`: turning an ODE, its
//!   observations and priors into a posterior
//!
//! Non-convergence is not an error here: it shows up in [`Diagnostics`].

mod model;
mod transform;
mod posterior;
mod hmc;
mod adapt;
mod nuts;
mod diagnostics;
mod samples;
mod sampler;
mod problem;
mod likelihood;
mod ode_model;

pub use model::LogDensity;
pub use transform::{ParamTransform, Transform};
pub use posterior::Posterior;
pub use hmc::{hmc_transition, HmcState, HmcTransition, Leapfrog, DIVERGENCE_THRESHOLD};
pub use adapt::{find_reasonable_step_size, AdaptEvent, DualAveraging, WindowedAdaptation};
pub use nuts::{nuts_transition, NutsTransition};
pub use diagnostics::{
    effective_sample_size, split_rhat, Diagnostics, ParamDiagnostics, MAX_DIVERGENCE_FRACTION,
    MAX_RHAT, MIN_ESS,
};
pub use samples::{quantile_sorted, ParameterSummary, PosteriorSamples};
pub use sampler::{collect_chains, run_chains, sample_chain, ChainOutput, Kernel, SamplerConfig};
pub use problem::InferenceProblem;
pub use likelihood::{gaussian_log_likelihood, LikelihoodTerms};
pub use ode_model::OdeBayesModel;
