//! Hand-Written Probabilistic Program for FitzHugh-Nagumo
//!
//!   a ~ TN(1.0, 0.5, 0, 1.5)      b ~ TN(1.0, 0.5, 0, 1.5)
//!   τ⁻¹ ~ TN(0.0, 0.5, 0, 0.5)    l ~ TN(0.5, 0.5, 0, 1.0)
//!   σ² ~ InverseGamma(2, 3)
//!   x(t) = solve(FHN, (1, 1), (0, 10); a, b, τ⁻¹, l)
//!   yᵢ ~ N(x(tᵢ), σ²·I)
//!
//! Hyper-parameters are read from the problem's prior set by name, so the
//! program fails loudly when handed priors it was not written for.

use ndarray::Array2;

use super::{timed, InferenceBackend, InferenceOutput};
use crate::error::InferenceError;
use crate::inference::{
    gaussian_log_likelihood, run_chains, InferenceProblem, LogDensity, SamplerConfig,
};
use crate::priors::{InverseGamma, Prior, PriorSet, TruncatedNormal, NOISE_PARAM_NAME};
use crate::solver::{OdeProblem, SolverOptions};
use crate::systems::{FhnParams, FitzHughNagumo, FHN_PARAM_NAMES};

/// The FitzHugh-Nagumo posterior written out by hand
#[derive(Debug, Clone)]
pub struct FhnProgram {
    ode: OdeProblem<FitzHughNagumo>,
    solver: SolverOptions,
    times: Vec<f64>,
    observations: Array2<f64>,
    a: TruncatedNormal,
    b: TruncatedNormal,
    tau_inv: TruncatedNormal,
    l: TruncatedNormal,
    sigma2: InverseGamma,
}

fn truncated_normal(priors: &PriorSet, name: &str) -> Result<TruncatedNormal, InferenceError> {
    match priors.iter().find(|p| p.name == name).map(|p| p.prior) {
        Some(Prior::TruncatedNormal(tn)) => Ok(tn),
        Some(other) => Err(InferenceError::invalid_problem(format!(
            "program expects a truncated normal prior on '{}', got {:?}",
            name, other
        ))),
        None => Err(InferenceError::invalid_problem(format!(
            "program expects a prior on '{}'",
            name
        ))),
    }
}

impl FhnProgram {
    /// Read data and hyper-parameters out of `problem`
    pub fn from_problem(problem: &InferenceProblem<FitzHughNagumo>) -> Result<Self, InferenceError> {
        problem.validate()?;
        let priors = &problem.priors;

        let sigma2 = match priors.noise().map(|p| p.prior) {
            Some(Prior::InverseGamma(ig)) => ig,
            _ => {
                return Err(InferenceError::invalid_problem(
                    "program models the noise variance and needs an inverse-gamma prior on it",
                ))
            }
        };

        let a = truncated_normal(priors, "a")?;
        let b = truncated_normal(priors, "b")?;
        let tau_inv = truncated_normal(priors, "tau_inv")?;
        let l = truncated_normal(priors, "l")?;
        let start = FhnParams {
            a: a.mean(),
            b: b.mean(),
            tau_inv: tau_inv.mean(),
            l: l.mean(),
        };

        Ok(Self {
            ode: OdeProblem::new(
                FitzHughNagumo,
                problem.initial_state.clone(),
                problem.t_span,
                start.to_vec(),
            )?,
            solver: problem.solver,
            times: problem.times.as_slice().to_vec(),
            observations: problem.observations.clone(),
            a,
            b,
            tau_inv,
            l,
            sigma2,
        })
    }
}

impl LogDensity for FhnProgram {
    fn dim(&self) -> usize {
        5
    }

    fn param_names(&self) -> Vec<String> {
        FHN_PARAM_NAMES
            .iter()
            .map(|s| s.to_string())
            .chain(std::iter::once(NOISE_PARAM_NAME.to_string()))
            .collect()
    }

    fn param_bounds(&self) -> Vec<(f64, f64)> {
        vec![
            self.a.support(),
            self.b.support(),
            self.tau_inv.support(),
            self.l.support(),
            self.sigma2.support(),
        ]
    }

    fn initial_point(&self) -> Vec<f64> {
        vec![
            self.a.mean(),
            self.b.mean(),
            self.tau_inv.mean(),
            self.l.mean(),
            self.sigma2.mode(),
        ]
    }

    fn log_density_grad(&self, theta: &[f64], grad: &mut [f64]) -> Result<f64, InferenceError> {
        let p = FhnParams {
            a: theta[0],
            b: theta[1],
            tau_inv: theta[2],
            l: theta[3],
        };
        let sigma2 = theta[4];

        let log_prior = self.a.ln_pdf(p.a)
            + self.b.ln_pdf(p.b)
            + self.tau_inv.ln_pdf(p.tau_inv)
            + self.l.ln_pdf(p.l)
            + self.sigma2.ln_pdf(sigma2);
        if !log_prior.is_finite() {
            return Ok(f64::NEG_INFINITY);
        }

        let solution = self
            .ode
            .solve_sensitivities(&p.to_vec(), &self.times, &self.solver)?;
        let lik = gaussian_log_likelihood(&self.observations, &solution, sigma2);

        grad[0] = self.a.grad_ln_pdf(p.a) + lik.grad_params[0];
        grad[1] = self.b.grad_ln_pdf(p.b) + lik.grad_params[1];
        grad[2] = self.tau_inv.grad_ln_pdf(p.tau_inv) + lik.grad_params[2];
        grad[3] = self.l.grad_ln_pdf(p.l) + lik.grad_params[3];
        grad[4] = self.sigma2.grad_ln_pdf(sigma2) + lik.grad_variance;

        Ok(log_prior + lik.value)
    }
}

/// Variant A: [`FhnProgram`] sampled with NUTS
#[derive(Debug, Clone, Default)]
pub struct ProgramNutsBackend;

impl InferenceBackend<FitzHughNagumo> for ProgramNutsBackend {
    fn name(&self) -> &str {
        "program_nuts"
    }

    fn run_inference(
        &self,
        problem: &InferenceProblem<FitzHughNagumo>,
        config: &SamplerConfig,
    ) -> Result<InferenceOutput, InferenceError> {
        timed(self.name(), || {
            let program = FhnProgram::from_problem(problem)?;
            run_chains(&program, config)
        })
    }
}
