//! Backends Module: Interchangeable Posterior Samplers
//!
//! Every back-end answers the same question (posterior draws for the
//! parameters of an [`InferenceProblem`]) behind one trait:
//!
//! - [`ProgramNutsBackend`]: a hand-written FitzHugh-Nagumo program
//!   sampled with NUTS
//! - [`ExternalBackend`]: the problem is shipped as JSON to a separate
//!   runtime (`fhn_sampler_worker`) which rebuilds the model and samples
//! - [`OdeWrapperBackend`]: the posterior is derived automatically from
//!   any [`VectorField`] problem and its priors
//! - [`StaticHmcBackend`]: fixed-length HMC, reported as excluded unless
//!   asked for
//!
//! Adding a back-end means implementing [`InferenceBackend`]; the
//! experiment runner needs no change.

mod program_nuts;
mod ode_wrapper;
mod static_hmc;
mod protocol;
mod transport;
mod worker;
mod external;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::InferenceError;
use crate::inference::{Diagnostics, InferenceProblem, PosteriorSamples, SamplerConfig};
use crate::systems::VectorField;

pub use program_nuts::{FhnProgram, ProgramNutsBackend};
pub use ode_wrapper::OdeWrapperBackend;
pub use static_hmc::{StaticHmcBackend, DEFAULT_LEAPFROG_STEPS};
pub use protocol::{SamplerRequest, SamplerResponse, PROTOCOL_VERSION};
pub use transport::{InProcessTransport, ProcessTransport, Transport, WORKER_BIN};
pub use worker::{handle_request, serve};
pub use external::{ExternalBackend, TransportKind};

/// What a back-end returns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceOutput {
    /// Back-end name
    pub backend: String,
    /// Posterior draws
    pub samples: PosteriorSamples,
    /// Sampler health
    pub diagnostics: Diagnostics,
    /// Wall-clock time of the whole call
    pub elapsed: Duration,
}

/// A way of sampling the posterior of an ODE problem
pub trait InferenceBackend<F: VectorField>: Send + Sync {
    /// Short stable name used in reports
    fn name(&self) -> &str;

    /// Sampler settings used when the caller has none
    fn default_config(&self) -> SamplerConfig {
        SamplerConfig::default()
    }

    /// Why the back-end is left out of default runs, if it is
    fn excluded_reason(&self) -> Option<&str> {
        None
    }

    /// Sample the posterior and time the call
    fn run_inference(
        &self,
        problem: &InferenceProblem<F>,
        config: &SamplerConfig,
    ) -> Result<InferenceOutput, InferenceError>;
}

/// Run `sample` under a wall-clock timer and package the result
pub(crate) fn timed<S>(name: &str, sample: S) -> Result<InferenceOutput, InferenceError>
where
    S: FnOnce() -> Result<(PosteriorSamples, Diagnostics), InferenceError>,
{
    info!(backend = name, "inference started");
    let started = Instant::now();
    let (samples, diagnostics) = sample()?;
    let elapsed = started.elapsed();
    info!(
        backend = name,
        elapsed_s = elapsed.as_secs_f64(),
        reliable = diagnostics.is_reliable(),
        "inference finished"
    );
    Ok(InferenceOutput {
        backend: name.to_string(),
        samples,
        diagnostics,
        elapsed,
    })
}
