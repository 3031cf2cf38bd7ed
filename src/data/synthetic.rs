//! Synthetic Data: Noisy Observations of an Exact Trajectory
//!
//! For each observation time tᵢ the dataset column is
//!
//!   yᵢ = x(tᵢ) + εᵢ,   εᵢ ~ N(0, σ²·I)
//!
//! Noise is drawn once, column by column with the state components in
//! order, from the generator supplied by the caller. Seeding that
//! generator makes the dataset reproducible.

use ndarray::Array2;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::observation::ObservationTimes;
use crate::error::DataError;
use crate::solver::{OdeProblem, SolverOptions};
use crate::systems::VectorField;

/// Noise standard deviation of the benchmark
pub const BENCHMARK_NOISE_STD: f64 = 0.20;

/// Noisy dataset shared read-only by every inference back-end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticDataset {
    /// Observation times
    pub times: ObservationTimes,
    /// Noisy observations, `n_states × n_times`
    pub observations: Array2<f64>,
    /// Exact trajectory at the observation times
    pub clean: Array2<f64>,
    /// Standard deviation used for the noise
    pub noise_std: f64,
}

impl SyntheticDataset {
    /// Solve `problem` at `times` and perturb with Gaussian noise
    pub fn generate<F, R>(
        problem: &OdeProblem<F>,
        times: &ObservationTimes,
        noise_std: f64,
        opts: &SolverOptions,
        rng: &mut R,
    ) -> Result<Self, DataError>
    where
        F: VectorField,
        R: Rng + ?Sized,
    {
        let solution = problem.solve_at(times.as_slice(), opts)?;
        let clean = solution.states;
        let observations = add_gaussian_noise(&clean, noise_std, rng)?;
        debug!(
            n_times = times.len(),
            noise_std,
            "synthetic dataset generated"
        );

        Ok(Self {
            times: times.clone(),
            observations,
            clean,
            noise_std,
        })
    }

    /// `(n_states, n_times)`
    pub fn shape(&self) -> (usize, usize) {
        self.observations.dim()
    }

    /// Observations minus the exact trajectory
    pub fn noise(&self) -> Array2<f64> {
        &self.observations - &self.clean
    }

    /// Observations flattened row by row (all of state 0, then state 1, …)
    pub fn flat_observations(&self) -> Vec<f64> {
        self.observations.iter().copied().collect()
    }
}

/// Add independent N(0, σ²) noise to every entry, column-major draw order
pub fn add_gaussian_noise<R: Rng + ?Sized>(
    clean: &Array2<f64>,
    noise_std: f64,
    rng: &mut R,
) -> Result<Array2<f64>, DataError> {
    if !noise_std.is_finite() || noise_std <= 0.0 {
        return Err(DataError::InvalidNoise(noise_std));
    }
    let normal = Normal::new(0.0, noise_std).map_err(|_| DataError::InvalidNoise(noise_std))?;

    let (n_states, n_times) = clean.dim();
    let mut noisy = clean.clone();
    for j in 0..n_times {
        for i in 0..n_states {
            noisy[[i, j]] += normal.sample(rng);
        }
    }
    Ok(noisy)
}
