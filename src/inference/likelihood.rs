//! Gaussian Observation Likelihood
//!
//! With residuals rᵢⱼ = yᵢⱼ − xᵢ(tⱼ; θ) and shared variance σ²:
//!
//!   ln L      = −½ Σ rᵢⱼ² / σ² − (N/2)·ln(2πσ²)
//!   ∂ln L/∂θₖ = Σ rᵢⱼ / σ² · ∂xᵢ(tⱼ)/∂θₖ
//!   ∂ln L/∂σ² = ½ Σ rᵢⱼ² / σ⁴ − N / (2σ²)

use std::f64::consts::PI;

use ndarray::Array2;

use crate::solver::SensitivitySolution;

/// Log-likelihood value with its gradients
#[derive(Debug, Clone, PartialEq)]
pub struct LikelihoodTerms {
    /// ln L
    pub value: f64,
    /// ∂ln L/∂θ for the structural parameters
    pub grad_params: Vec<f64>,
    /// ∂ln L/∂σ²
    pub grad_variance: f64,
}

/// Score `observations` (`n_states × n_times`) against a sensitivity solve
pub fn gaussian_log_likelihood(
    observations: &Array2<f64>,
    solution: &SensitivitySolution,
    variance: f64,
) -> LikelihoodTerms {
    let (n_states, n_times) = observations.dim();
    let n_params = solution.sensitivities.first().map_or(0, |s| s.ncols());
    let n_obs = (n_states * n_times) as f64;

    let mut ssr = 0.0;
    let mut grad_params = vec![0.0; n_params];
    for j in 0..n_times {
        let sens = &solution.sensitivities[j];
        for i in 0..n_states {
            let r = observations[[i, j]] - solution.states[[i, j]];
            ssr += r * r;
            for (k, g) in grad_params.iter_mut().enumerate() {
                *g += r * sens[[i, k]];
            }
        }
    }
    grad_params.iter_mut().for_each(|g| *g /= variance);

    LikelihoodTerms {
        value: -0.5 * ssr / variance - 0.5 * n_obs * (2.0 * PI * variance).ln(),
        grad_params,
        grad_variance: 0.5 * ssr / (variance * variance) - 0.5 * n_obs / variance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{OdeProblem, SolverOptions};
    use crate::systems::{FitzHughNagumo, FhnParams, FHN_INITIAL_STATE, FHN_TIME_SPAN};
    use approx::assert_abs_diff_eq;

    fn setup() -> (OdeProblem<FitzHughNagumo>, Vec<f64>, Array2<f64>) {
        let problem = OdeProblem::new(
            FitzHughNagumo,
            FHN_INITIAL_STATE.to_vec(),
            FHN_TIME_SPAN,
            FhnParams::reference().to_vec(),
        )
        .unwrap();
        let times: Vec<f64> = (1..=10).map(f64::from).collect();
        let clean = problem.solve_at(&times, &SolverOptions::default()).unwrap().states;
        // Deterministic perturbation in place of noise
        let observations = Array2::from_shape_fn(clean.dim(), |(i, j)| {
            clean[[i, j]] + 0.1 * ((i + 2 * j) as f64).sin()
        });
        (problem, times, observations)
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let (problem, times, obs) = setup();
        let opts = SolverOptions::reference();
        let theta = vec![0.65, 0.85, 0.1, 0.45];
        let variance = 0.05;

        let sol = problem.solve_sensitivities(&theta, &times, &opts).unwrap();
        let terms = gaussian_log_likelihood(&obs, &sol, variance);

        let h = 1e-5;
        for k in 0..4 {
            let mut up = theta.clone();
            let mut dn = theta.clone();
            up[k] += h;
            dn[k] -= h;
            let l_up = gaussian_log_likelihood(
                &obs,
                &problem.solve_sensitivities(&up, &times, &opts).unwrap(),
                variance,
            )
            .value;
            let l_dn = gaussian_log_likelihood(
                &obs,
                &problem.solve_sensitivities(&dn, &times, &opts).unwrap(),
                variance,
            )
            .value;
            let fd = (l_up - l_dn) / (2.0 * h);
            assert_abs_diff_eq!(terms.grad_params[k], fd, epsilon = 1e-4 * (1.0 + fd.abs()));
        }

        let l_up = gaussian_log_likelihood(&obs, &sol, variance + h).value;
        let l_dn = gaussian_log_likelihood(&obs, &sol, variance - h).value;
        assert_abs_diff_eq!(
            terms.grad_variance,
            (l_up - l_dn) / (2.0 * h),
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_exact_fit_value() {
        let (problem, times, _) = setup();
        let sol = problem
            .solve_sensitivities(&FhnParams::reference().to_vec(), &times, &SolverOptions::default())
            .unwrap();
        let clean = sol.states.clone();
        let terms = gaussian_log_likelihood(&clean, &sol, 0.04);
        // Zero residuals leave only the normalizer
        assert_abs_diff_eq!(terms.value, -10.0 * (2.0 * PI * 0.04).ln(), epsilon = 1e-12);
        assert!(terms.grad_params.iter().all(|g| g.abs() < 1e-12));
    }
}
