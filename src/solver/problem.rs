//! ODE Problem Definition and Solver Options

use serde::{Deserialize, Serialize};

use crate::error::IntegrationError;
use crate::systems::VectorField;

/// Tolerances and budgets for the adaptive integrator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Relative tolerance
    pub rtol: f64,
    /// Absolute tolerance
    pub atol: f64,
    /// Maximum number of attempted steps
    pub max_steps: usize,
    /// Upper bound on the step size (None = span length)
    pub max_step: Option<f64>,
    /// First trial step (None = automatic)
    pub initial_step: Option<f64>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-8,
            max_steps: 100_000,
            max_step: None,
            initial_step: None,
        }
    }
}

impl SolverOptions {
    /// Tight tolerances used to pin reference values
    pub fn reference() -> Self {
        Self {
            rtol: 1e-10,
            atol: 1e-12,
            max_steps: 1_000_000,
            ..Self::default()
        }
    }

    /// Override both tolerances
    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }
}

/// Vector field + initial condition + span + parameters
#[derive(Debug, Clone, PartialEq)]
pub struct OdeProblem<F> {
    /// Right-hand side
    pub field: F,
    /// State at `t_span.0`
    pub initial_state: Vec<f64>,
    /// Integration interval
    pub t_span: (f64, f64),
    /// Structural parameters
    pub params: Vec<f64>,
}

impl<F: VectorField> OdeProblem<F> {
    /// Build a problem, checking dimensions against the vector field
    pub fn new(
        field: F,
        initial_state: Vec<f64>,
        t_span: (f64, f64),
        params: Vec<f64>,
    ) -> Result<Self, IntegrationError> {
        if initial_state.len() != field.state_dim() {
            return Err(IntegrationError::DimensionMismatch {
                what: "initial state",
                expected: field.state_dim(),
                actual: initial_state.len(),
            });
        }
        if params.len() != field.param_dim() {
            return Err(IntegrationError::DimensionMismatch {
                what: "parameters",
                expected: field.param_dim(),
                actual: params.len(),
            });
        }
        if !(t_span.1 > t_span.0) || !t_span.0.is_finite() || !t_span.1.is_finite() {
            return Err(IntegrationError::OutOfSpan {
                t: t_span.1,
                t0: t_span.0,
                t1: t_span.1,
            });
        }

        Ok(Self {
            field,
            initial_state,
            t_span,
            params,
        })
    }

    /// Same problem with a different parameter vector
    pub fn remake(&self, params: &[f64]) -> Result<Self, IntegrationError>
    where
        F: Clone,
    {
        Self::new(
            self.field.clone(),
            self.initial_state.clone(),
            self.t_span,
            params.to_vec(),
        )
    }

    /// Check that `params` fits this problem's vector field
    pub(crate) fn check_params(&self, params: &[f64]) -> Result<(), IntegrationError> {
        if params.len() == self.field.param_dim() {
            Ok(())
        } else {
            Err(IntegrationError::DimensionMismatch {
                what: "parameters",
                expected: self.field.param_dim(),
                actual: params.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::{FitzHughNagumo, FhnParams, FHN_INITIAL_STATE, FHN_TIME_SPAN};

    #[test]
    fn test_problem_dimension_checks() {
        let ok = OdeProblem::new(
            FitzHughNagumo,
            FHN_INITIAL_STATE.to_vec(),
            FHN_TIME_SPAN,
            FhnParams::reference().to_vec(),
        );
        assert!(ok.is_ok());

        let bad_state = OdeProblem::new(FitzHughNagumo, vec![1.0], FHN_TIME_SPAN, vec![0.0; 4]);
        assert!(matches!(
            bad_state,
            Err(IntegrationError::DimensionMismatch { what: "initial state", .. })
        ));

        let bad_span = OdeProblem::new(FitzHughNagumo, vec![1.0, 1.0], (1.0, 1.0), vec![0.0; 4]);
        assert!(bad_span.is_err());
    }

    #[test]
    fn test_remake_keeps_everything_but_params() {
        let problem = OdeProblem::new(
            FitzHughNagumo,
            FHN_INITIAL_STATE.to_vec(),
            FHN_TIME_SPAN,
            FhnParams::reference().to_vec(),
        )
        .unwrap();
        let other = problem.remake(&[1.0, 1.0, 0.1, 0.2]).unwrap();
        assert_eq!(other.initial_state, problem.initial_state);
        assert_eq!(other.t_span, problem.t_span);
        assert_eq!(other.params, vec![1.0, 1.0, 0.1, 0.2]);
        assert!(problem.remake(&[1.0]).is_err());
    }
}
