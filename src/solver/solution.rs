//! Solution Types: Discrete Outputs and Continuous Interpolants

use ndarray::{Array1, Array2};

use super::dopri5::{Knots, SolverStats};
use crate::error::IntegrationError;

/// Trajectory sampled at output times, optionally with a dense interpolant
#[derive(Debug, Clone)]
pub struct Solution {
    /// Output times
    pub times: Vec<f64>,
    /// States, `n_states × n_times` (column j is the state at `times[j]`)
    pub states: Array2<f64>,
    /// Integrator counters
    pub stats: SolverStats,
    /// Integration span
    pub t_span: (f64, f64),
    knots: Option<Knots>,
}

impl Solution {
    pub(crate) fn new(
        times: Vec<f64>,
        saved: Vec<Vec<f64>>,
        n_states: usize,
        stats: SolverStats,
        t_span: (f64, f64),
        knots: Option<Knots>,
    ) -> Self {
        let mut states = Array2::zeros((n_states, times.len()));
        for (j, y) in saved.iter().enumerate() {
            for (i, &yi) in y.iter().enumerate() {
                states[[i, j]] = yi;
            }
        }
        Self {
            times,
            states,
            stats,
            t_span,
            knots,
        }
    }

    /// Number of state components
    pub fn n_states(&self) -> usize {
        self.states.nrows()
    }

    /// State at output index `j`
    pub fn state(&self, j: usize) -> Array1<f64> {
        self.states.column(j).to_owned()
    }

    /// Whether [`Solution::at`] can be queried
    pub fn is_dense(&self) -> bool {
        self.knots.is_some()
    }

    /// Evaluate the continuous interpolant at `t`.
    ///
    /// Solutions obtained without dense output only answer at their
    /// output times.
    pub fn at(&self, t: f64) -> Result<Array1<f64>, IntegrationError> {
        let (t0, t1) = self.t_span;
        if !(t0..=t1).contains(&t) {
            return Err(IntegrationError::OutOfSpan { t, t0, t1 });
        }

        match &self.knots {
            Some(knots) => {
                let mut out = vec![0.0; self.n_states()];
                knots.interpolate(t, &mut out);
                Ok(Array1::from(out))
            }
            None => self
                .times
                .iter()
                .position(|&tj| tj == t)
                .map(|j| self.state(j))
                .ok_or(IntegrationError::OutOfSpan { t, t0, t1 }),
        }
    }

    /// Evaluate the interpolant on a uniform grid of `n` points over the span
    pub fn sample_uniform(&self, n: usize) -> Result<(Vec<f64>, Array2<f64>), IntegrationError> {
        let (t0, t1) = self.t_span;
        let grid: Vec<f64> = if n < 2 {
            vec![t0]
        } else {
            (0..n)
                .map(|i| t0 + (t1 - t0) * i as f64 / (n - 1) as f64)
                .collect()
        };

        let mut values = Array2::zeros((self.n_states(), grid.len()));
        for (j, &t) in grid.iter().enumerate() {
            values.column_mut(j).assign(&self.at(t)?);
        }
        Ok((grid, values))
    }
}

/// States and parameter sensitivities at output times
#[derive(Debug, Clone)]
pub struct SensitivitySolution {
    /// Output times
    pub times: Vec<f64>,
    /// States, `n_states × n_times`
    pub states: Array2<f64>,
    /// ∂x(tⱼ)/∂θ, one `n_states × n_params` matrix per output time
    pub sensitivities: Vec<Array2<f64>>,
    /// Integrator counters
    pub stats: SolverStats,
}

impl SensitivitySolution {
    pub(crate) fn from_augmented(
        times: Vec<f64>,
        saved: Vec<Vec<f64>>,
        n_states: usize,
        n_params: usize,
        stats: SolverStats,
    ) -> Self {
        let mut states = Array2::zeros((n_states, times.len()));
        let mut sensitivities = Vec::with_capacity(times.len());

        for (j, z) in saved.iter().enumerate() {
            for i in 0..n_states {
                states[[i, j]] = z[i];
            }
            let s = Array2::from_shape_fn((n_states, n_params), |(i, k)| {
                z[n_states + i * n_params + k]
            });
            sensitivities.push(s);
        }

        Self {
            times,
            states,
            sensitivities,
            stats,
        }
    }
}
