//! ODE-Problem Wrapper Back-End
//!
//! No model code is written: the posterior is derived from the problem
//! (vector field, priors, observations) through [`OdeBayesModel`] and
//! sampled with NUTS. Works for any [`VectorField`].

use super::{timed, InferenceBackend, InferenceOutput};
use crate::error::InferenceError;
use crate::inference::{run_chains, InferenceProblem, OdeBayesModel, SamplerConfig};
use crate::systems::VectorField;

/// Variant C: automatic model from the problem definition
#[derive(Debug, Clone, Default)]
pub struct OdeWrapperBackend;

impl<F: VectorField + Clone> InferenceBackend<F> for OdeWrapperBackend {
    fn name(&self) -> &str {
        "ode_wrapper"
    }

    fn run_inference(
        &self,
        problem: &InferenceProblem<F>,
        config: &SamplerConfig,
    ) -> Result<InferenceOutput, InferenceError> {
        timed(InferenceBackend::<F>::name(self), || {
            let model = OdeBayesModel::from_problem(problem)?;
            run_chains(&model, config)
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

    #[test]
    fn test_invalid_config_is_reported_before_sampling() {
        let problem = InferenceProblem::new(
            FitzHughNagumo,
            FHN_INITIAL_STATE.to_vec(),
            FHN_TIME_SPAN,
            SolverOptions::default(),
            ObservationTimes::benchmark(),
            Array2::zeros((2, 10)),
            PriorSet::benchmark().unwrap(),
        )
        .unwrap();
        let config = SamplerConfig {
            chains: 0,
            ..SamplerConfig::default()
        };
        let err = OdeWrapperBackend.run_inference(&problem, &config).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidConfig(_)));
        assert_eq!(
            InferenceBackend::<FitzHughNagumo>::name(&OdeWrapperBackend),
            "ode_wrapper"
        );
    }
}
