//! External-Runtime Back-End
//!
//! Marshals the problem into a [`SamplerRequest`], ships it through a
//! [`Transport`], and unmarshals the [`SamplerResponse`]. The runtime on
//! the other side rebuilds the model from the request alone.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::protocol::{SamplerRequest, SamplerResponse};
use super::transport::{InProcessTransport, ProcessTransport, Transport};
use super::{timed, InferenceBackend, InferenceOutput};
use crate::error::InferenceError;
use crate::inference::{InferenceProblem, SamplerConfig};
use crate::systems::VectorField;

/// How the external runtime is reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Worker executable if it can be found, in-process otherwise
    #[default]
    Auto,
    /// Always spawn the worker executable
    Process,
    /// Always call the worker entry point directly
    InProcess,
}

impl TransportKind {
    /// Build the transport this kind stands for
    pub fn build(self) -> Result<Box<dyn Transport>, InferenceError> {
        match self {
            TransportKind::InProcess => Ok(Box::new(InProcessTransport)),
            TransportKind::Process => ProcessTransport::locate()
                .map(|t| Box::new(t) as Box<dyn Transport>)
                .ok_or_else(|| InferenceError::transport("worker executable not found")),
            TransportKind::Auto => Ok(match ProcessTransport::locate() {
                Some(t) => Box::new(t),
                None => {
                    warn!("worker executable not found, using in-process transport");
                    Box::new(InProcessTransport)
                }
            }),
        }
    }
}

impl Transport for Box<dyn Transport> {
    fn describe(&self) -> String {
        self.as_ref().describe()
    }

    fn exchange(&self, request: &str) -> Result<String, InferenceError> {
        self.as_ref().exchange(request)
    }
}

/// Variant B: sampling delegated to a separate runtime
#[derive(Debug, Clone)]
pub struct ExternalBackend<T> {
    transport: T,
}

impl<T: Transport> ExternalBackend<T> {
    /// Talk to the runtime through `transport`
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The transport in use
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<F: VectorField, T: Transport> InferenceBackend<F> for ExternalBackend<T> {
    fn name(&self) -> &str {
        "external"
    }

    /// One long chain at a lower acceptance target
    fn default_config(&self) -> SamplerConfig {
        SamplerConfig {
            warmup: 1000,
            draws: 10_000,
            chains: 1,
            target_accept: 0.65,
            ..SamplerConfig::default()
        }
    }

    fn run_inference(
        &self,
        problem: &InferenceProblem<F>,
        config: &SamplerConfig,
    ) -> Result<InferenceOutput, InferenceError> {
        timed(InferenceBackend::<F>::name(self), || {
            problem.validate()?;
            config.validate()?;
            let request = serde_json::to_string(&SamplerRequest::from_problem(problem, config))?;
            let reply = self.transport.exchange(&request)?;
            match serde_json::from_str::<SamplerResponse>(reply.trim())? {
                SamplerResponse::Ok {
                    samples,
                    diagnostics,
                } => Ok((samples, diagnostics)),
                SamplerResponse::Error { message } => Err(InferenceError::Remote(message)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ObservationTimes;
    use crate::priors::PriorSet;
    use crate::solver::SolverOptions;
    use crate::systems::{FitzHughNagumo, FHN_INITIAL_STATE, FHN_TIME_SPAN};
    use ndarray::Array2;

    struct Canned(&'static str);

    impl Transport for Canned {
        fn describe(&self) -> String {
            "canned".into()
        }

        fn exchange(&self, _request: &str) -> Result<String, InferenceError> {
            Ok(self.0.to_string())
        }
    }

    fn problem() -> InferenceProblem<FitzHughNagumo> {
        InferenceProblem::new(
            FitzHughNagumo,
            FHN_INITIAL_STATE.to_vec(),
            FHN_TIME_SPAN,
            SolverOptions::default(),
            ObservationTimes::benchmark(),
            Array2::from_elem((2, 10), 0.5),
            PriorSet::benchmark().unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_default_config_is_single_long_chain() {
        let backend = ExternalBackend::new(InProcessTransport);
        let config = InferenceBackend::<FitzHughNagumo>::default_config(&backend);
        assert_eq!(config.chains, 1);
        assert_eq!(config.draws, 10_000);
        assert_eq!(config.target_accept, 0.65);
    }

    #[test]
    fn test_remote_error_is_surfaced() {
        let backend = ExternalBackend::new(Canned(r#"{"status":"error","message":"no luck"}"#));
        let err = backend
            .run_inference(&problem(), &SamplerConfig::default())
            .unwrap_err();
        match err {
            InferenceError::Remote(message) => assert_eq!(message, "no luck"),
            other => panic!("expected remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_reply_is_protocol_error() {
        let backend = ExternalBackend::new(Canned("<html>"));
        let err = backend
            .run_inference(&problem(), &SamplerConfig::default())
            .unwrap_err();
        assert!(matches!(err, InferenceError::Protocol(_)));
    }

    #[test]
    fn test_in_process_round_trip() {
        let backend = ExternalBackend::new(InProcessTransport);
        let config = SamplerConfig {
            warmup: 20,
            draws: 10,
            chains: 2,
            ..SamplerConfig::default()
        };
        let output = backend.run_inference(&problem(), &config).unwrap();
        assert_eq!(output.backend, "external");
        assert_eq!(output.samples.n_chains(), 2);
        assert_eq!(output.samples.param_names()[4], "sigma2");
    }

    #[test]
    fn test_in_process_kind_always_builds() {
        let transport = TransportKind::InProcess.build().unwrap();
        assert_eq!(transport.describe(), "in-process");
    }
}
