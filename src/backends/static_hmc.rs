//! Static HMC Back-End (excluded by default)
//!
//! Same automatic model as the ODE wrapper, sampled with a fixed number of
//! leapfrog steps per transition instead of NUTS. On this model it is
//! known not to converge reliably, so the experiment skips it unless
//! asked; when it runs, its diagnostics are reported like any other.

use super::{timed, InferenceBackend, InferenceOutput};
use crate::error::InferenceError;
use crate::inference::{run_chains, InferenceProblem, Kernel, OdeBayesModel, SamplerConfig};
use crate::systems::VectorField;

/// Leapfrog steps per transition when the caller's kernel is not static HMC
pub const DEFAULT_LEAPFROG_STEPS: usize = 10;

const EXCLUSION_REASON: &str =
    "fixed-length HMC does not converge reliably on the FitzHugh-Nagumo posterior";

/// Fixed-trajectory HMC over the automatic model
#[derive(Debug, Clone)]
pub struct StaticHmcBackend {
    /// Leapfrog steps per transition
    pub n_leapfrog: usize,
}

impl Default for StaticHmcBackend {
    fn default() -> Self {
        Self {
            n_leapfrog: DEFAULT_LEAPFROG_STEPS,
        }
    }
}

impl StaticHmcBackend {
    fn kernel_config(&self, config: &SamplerConfig) -> SamplerConfig {
        let mut config = config.clone();
        if !matches!(config.kernel, Kernel::StaticHmc { .. }) {
            config.kernel = Kernel::StaticHmc {
                n_leapfrog: self.n_leapfrog,
            };
        }
        config
    }
}

impl<F: VectorField + Clone> InferenceBackend<F> for StaticHmcBackend {
    fn name(&self) -> &str {
        "static_hmc"
    }

    fn default_config(&self) -> SamplerConfig {
        self.kernel_config(&SamplerConfig::default())
    }

    fn excluded_reason(&self) -> Option<&str> {
        Some(EXCLUSION_REASON)
    }

    fn run_inference(
        &self,
        problem: &InferenceProblem<F>,
        config: &SamplerConfig,
    ) -> Result<InferenceOutput, InferenceError> {
        let config = self.kernel_config(config);
        timed(InferenceBackend::<F>::name(self), || {
            let model = OdeBayesModel::from_problem(problem)?;
            run_chains(&model, &config)
        })
    }
}
