//! Posterior Sample Collections
//!
//! Draws are kept per chain as `n_draws × n_params` matrices in the
//! constrained parameter space.

use std::collections::HashMap;

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use super::diagnostics::{effective_sample_size, nan_from_null, split_rhat};

/// Summary statistics of one parameter's marginal posterior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    /// Parameter name
    pub name: String,
    /// Posterior mean
    pub mean: f64,
    /// Posterior standard deviation
    pub std: f64,
    /// 2.5 % quantile
    pub q025: f64,
    /// Median
    pub q50: f64,
    /// 97.5 % quantile
    pub q975: f64,
    /// Bulk effective sample size
    #[serde(deserialize_with = "nan_from_null")]
    pub ess: f64,
    /// Split R-hat
    #[serde(deserialize_with = "nan_from_null")]
    pub rhat: f64,
}

impl ParameterSummary {
    /// Whether `value` lies within `k` posterior standard deviations of the mean
    pub fn within_sd(&self, value: f64, k: f64) -> bool {
        (value - self.mean).abs() <= k * self.std
    }

    /// Whether `value` lies in the central 95 % interval
    pub fn covers(&self, value: f64) -> bool {
        (self.q025..=self.q975).contains(&value)
    }
}

/// Linear-interpolated quantile of sorted data
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Named draws from one or more chains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSamples {
    param_names: Vec<String>,
    chains: Vec<Array2<f64>>,
}

impl PosteriorSamples {
    /// Collect chains; each must have one column per name
    pub fn new(param_names: Vec<String>, chains: Vec<Array2<f64>>) -> Self {
        debug_assert!(chains.iter().all(|c| c.ncols() == param_names.len()));
        Self { param_names, chains }
    }

    /// Parameter names, in column order
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Per-chain draw matrices
    pub fn chains(&self) -> &[Array2<f64>] {
        &self.chains
    }

    /// Number of chains
    pub fn n_chains(&self) -> usize {
        self.chains.len()
    }

    /// Draws in the first chain; every chain of one run has the same length
    pub fn draws_per_chain(&self) -> usize {
        self.chains.first().map_or(0, |c| c.nrows())
    }

    /// Draws in all chains together
    pub fn total_draws(&self) -> usize {
        self.chains.iter().map(|c| c.nrows()).sum()
    }

    /// Column index of `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.param_names.iter().position(|n| n == name)
    }

    fn per_chain(&self, idx: usize) -> Vec<Vec<f64>> {
        self.chains
            .iter()
            .map(|c| c.column(idx).to_vec())
            .collect()
    }

    /// All draws of `name`, chains concatenated
    pub fn get(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.index_of(name)?;
        Some(self.per_chain(idx).into_iter().flatten().collect())
    }

    /// name → flattened draws
    pub fn to_map(&self) -> HashMap<String, Vec<f64>> {
        self.param_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), self.per_chain(i).into_iter().flatten().collect()))
            .collect()
    }

    /// Draw `i` of the pooled sample as a full parameter vector
    pub fn draw(&self, mut i: usize) -> Option<Vec<f64>> {
        for chain in &self.chains {
            if i < chain.nrows() {
                return Some(chain.row(i).to_vec());
            }
            i -= chain.nrows();
        }
        None
    }

    /// Posterior mean of every parameter
    pub fn means(&self) -> Vec<f64> {
        let n = self.total_draws() as f64;
        let mut sums = vec![0.0; self.param_names.len()];
        for chain in &self.chains {
            for (s, col_sum) in sums.iter_mut().zip(chain.sum_axis(Axis(0)).iter()) {
                *s += *col_sum;
            }
        }
        sums.into_iter().map(|s| s / n).collect()
    }

    /// Summary of `name`
    pub fn summary_of(&self, name: &str) -> Option<ParameterSummary> {
        let idx = self.index_of(name)?;
        Some(self.summarize_column(idx))
    }

    /// Summary of every parameter, in column order
    pub fn summary(&self) -> Vec<ParameterSummary> {
        (0..self.param_names.len())
            .map(|i| self.summarize_column(i))
            .collect()
    }

    fn summarize_column(&self, idx: usize) -> ParameterSummary {
        let per_chain = self.per_chain(idx);
        let views: Vec<&[f64]> = per_chain.iter().map(|c| c.as_slice()).collect();

        let mut all: Vec<f64> = per_chain.iter().flatten().copied().collect();
        let n = all.len() as f64;
        let mean = all.iter().sum::<f64>() / n;
        let std = (all.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
        all.sort_by(|a, b| a.total_cmp(b));

        ParameterSummary {
            name: self.param_names[idx].clone(),
            mean,
            std,
            q025: quantile_sorted(&all, 0.025),
            q50: quantile_sorted(&all, 0.5),
            q975: quantile_sorted(&all, 0.975),
            ess: effective_sample_size(&views),
            rhat: split_rhat(&views),
        }
    }
}
