//! Solve Entry Points: Plain, Dense and Forward-Sensitivity Integration
//!
//! Forward sensitivities S = ∂x/∂θ obey
//!
//!   dS/dt = J_x(t, x; θ)·S + J_θ(t, x; θ),   S(t₀) = 0
//!
//! and are integrated together with the state as one augmented system of
//! dimension n + n·p. The error norm covers every component, so the
//! gradients are as accurate as the states.

use tracing::trace;

use super::dopri5::integrate;
use super::problem::{OdeProblem, SolverOptions};
use super::solution::{SensitivitySolution, Solution};
use crate::error::IntegrationError;
use crate::systems::VectorField;

impl<F: VectorField> OdeProblem<F> {
    /// Integrate over the whole span with a dense interpolant.
    ///
    /// Output times are the span end points; use [`Solution::at`] for
    /// anything in between.
    pub fn solve(&self, opts: &SolverOptions) -> Result<Solution, IntegrationError> {
        let times = vec![self.t_span.0, self.t_span.1];
        self.run(&self.params, times, true, opts)
    }

    /// Integrate and return states exactly at `times`
    pub fn solve_at(&self, times: &[f64], opts: &SolverOptions) -> Result<Solution, IntegrationError> {
        self.run(&self.params, times.to_vec(), false, opts)
    }

    /// Integrate at `times` under a different parameter vector
    pub fn solve_at_params(
        &self,
        params: &[f64],
        times: &[f64],
        opts: &SolverOptions,
    ) -> Result<Solution, IntegrationError> {
        self.check_params(params)?;
        self.run(params, times.to_vec(), false, opts)
    }

    /// Dense solve under a different parameter vector
    pub fn solve_dense_params(
        &self,
        params: &[f64],
        opts: &SolverOptions,
    ) -> Result<Solution, IntegrationError> {
        self.check_params(params)?;
        let times = vec![self.t_span.0, self.t_span.1];
        self.run(params, times, true, opts)
    }

    fn run(
        &self,
        params: &[f64],
        times: Vec<f64>,
        dense: bool,
        opts: &SolverOptions,
    ) -> Result<Solution, IntegrationError> {
        let field = &self.field;
        let rhs = |t: f64, y: &[f64], out: &mut [f64]| field.eval(t, y, params, out);
        let raw = integrate(rhs, &self.initial_state, self.t_span, &times, dense, opts)?;
        trace!(
            accepted = raw.stats.n_accepted,
            rejected = raw.stats.n_rejected,
            "trajectory solved"
        );

        Ok(Solution::new(
            times,
            raw.saved,
            field.state_dim(),
            raw.stats,
            self.t_span,
            raw.knots,
        ))
    }

    /// States and ∂x/∂θ at `times` under `params`
    pub fn solve_sensitivities(
        &self,
        params: &[f64],
        times: &[f64],
        opts: &SolverOptions,
    ) -> Result<SensitivitySolution, IntegrationError> {
        self.check_params(params)?;

        let field = &self.field;
        let n = field.state_dim();
        let p = params.len();
        let mut jx = vec![0.0; n * n];
        let mut jp = vec![0.0; n * p];

        let rhs = |t: f64, z: &[f64], out: &mut [f64]| {
            let (x, s) = z.split_at(n);
            let (dx, ds) = out.split_at_mut(n);
            field.eval(t, x, params, dx);
            field.jacobian_state(t, x, params, &mut jx);
            field.jacobian_params(t, x, params, &mut jp);

            for i in 0..n {
                for k in 0..p {
                    let mut acc = jp[i * p + k];
                    for m in 0..n {
                        acc += jx[i * n + m] * s[m * p + k];
                    }
                    ds[i * p + k] = acc;
                }
            }
        };

        let mut z0 = vec![0.0; n + n * p];
        z0[..n].copy_from_slice(&self.initial_state);

        let raw = integrate(rhs, &z0, self.t_span, times, false, opts)?;
        Ok(SensitivitySolution::from_augmented(
            times.to_vec(),
            raw.saved,
            n,
            p,
            raw.stats,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::{FitzHughNagumo, FhnParams, FHN_INITIAL_STATE, FHN_TIME_SPAN};
    use approx::assert_relative_eq;

    /// trajectory(1.0) at the reference parameters, computed once with a
    /// fine fixed-step RK4 (h = 2.5e-5) and stored
    const PINNED_T1: [f64; 2] = [1.126932768451952, 1.075309454456211];

    fn fhn_problem() -> OdeProblem<FitzHughNagumo> {
        OdeProblem::new(
            FitzHughNagumo,
            FHN_INITIAL_STATE.to_vec(),
            FHN_TIME_SPAN,
            FhnParams::reference().to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn test_reference_value_at_t1() {
        let sol = fhn_problem()
            .solve_at(&[1.0], &SolverOptions::reference())
            .unwrap();
        assert_relative_eq!(sol.states[[0, 0]], PINNED_T1[0], max_relative = 1e-6);
        assert_relative_eq!(sol.states[[1, 0]], PINNED_T1[1], max_relative = 1e-6);
    }

    #[test]
    fn test_default_tolerance_close_to_reference() {
        let sol = fhn_problem()
            .solve_at(&[1.0], &SolverOptions::default())
            .unwrap();
        assert_relative_eq!(sol.states[[0, 0]], PINNED_T1[0], max_relative = 1e-5);
        assert_relative_eq!(sol.states[[1, 0]], PINNED_T1[1], max_relative = 1e-5);
    }

    #[test]
    fn test_dense_solution_agrees_with_discrete() {
        let problem = fhn_problem();
        let opts = SolverOptions::reference();
        let dense = problem.solve(&opts).unwrap();
        let discrete = problem.solve_at(&[2.5, 7.0], &opts).unwrap();

        assert!(dense.is_dense());
        for (j, &t) in discrete.times.iter().enumerate() {
            let x = dense.at(t).unwrap();
            assert_relative_eq!(x[0], discrete.states[[0, j]], epsilon = 1e-7, max_relative = 1e-6);
            assert_relative_eq!(x[1], discrete.states[[1, j]], epsilon = 1e-7, max_relative = 1e-6);
        }
        assert!(dense.at(10.5).is_err());
    }

    #[test]
    fn test_discrete_solution_only_answers_at_output_times() {
        let sol = fhn_problem()
            .solve_at(&[1.0, 2.0], &SolverOptions::default())
            .unwrap();
        assert!(!sol.is_dense());
        assert!(sol.at(2.0).is_ok());
        assert!(sol.at(1.5).is_err());
    }

    #[test]
    fn test_sensitivities_match_finite_differences() {
        let problem = fhn_problem();
        let opts = SolverOptions::reference();
        let times = [1.0, 4.0, 10.0];
        let theta = FhnParams::reference().to_vec();
        let sens = problem.solve_sensitivities(&theta, &times, &opts).unwrap();

        let h = 1e-4;
        for k in 0..theta.len() {
            let mut plus = theta.clone();
            let mut minus = theta.clone();
            plus[k] += h;
            minus[k] -= h;
            let sp = problem.solve_at_params(&plus, &times, &opts).unwrap();
            let sm = problem.solve_at_params(&minus, &times, &opts).unwrap();

            for j in 0..times.len() {
                for i in 0..2 {
                    let fd = (sp.states[[i, j]] - sm.states[[i, j]]) / (2.0 * h);
                    let an = sens.sensitivities[j][[i, k]];
                    assert!(
                        (fd - an).abs() < 1e-4 * (1.0 + fd.abs()),
                        "dx{}/dθ{} at t={}: fd={} analytic={}",
                        i, k, times[j], fd, an
                    );
                }
            }
        }
    }

    #[test]
    fn test_sensitivity_states_equal_plain_states() {
        let problem = fhn_problem();
        let opts = SolverOptions::reference();
        let times = [1.0, 5.0];
        let plain = problem.solve_at(&times, &opts).unwrap();
        let sens = problem
            .solve_sensitivities(&problem.params, &times, &opts)
            .unwrap();
        for (a, b) in plain.states.iter().zip(sens.states.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-8, max_relative = 1e-8);
        }
    }

    #[test]
    fn test_uniform_sampling_of_dense_solution() {
        let sol = fhn_problem().solve(&SolverOptions::default()).unwrap();
        let (grid, values) = sol.sample_uniform(101).unwrap();
        assert_eq!(grid.len(), 101);
        assert_eq!(values.shape(), &[2, 101]);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[100], 10.0);
        assert_eq!(values[[0, 0]], 1.0);
    }
}
