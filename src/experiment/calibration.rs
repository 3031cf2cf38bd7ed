//! Calibration: Repeated Independent Trials
//!
//! A well-calibrated sampler puts each structural parameter's truth within
//! 3 posterior standard deviations of its posterior mean in 95 % or more
//! of independent datasets. Each trial draws fresh noise and fresh sampler
//! seeds. The noise variance is sampled but not scored: its
//! InverseGamma(2, 3) prior dominates 20 observations.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::config::BenchmarkConfig;
use super::runner::Experiment;
use crate::backends::InferenceBackend;
use crate::error::BenchError;
use crate::inference::SamplerConfig;
use crate::priors::NOISE_PARAM_NAME;
use crate::systems::FitzHughNagumo;

/// Posterior mean / std distance that counts as a hit
pub const CALIBRATION_SD_MULTIPLE: f64 = 3.0;

/// Outcome of one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    /// Seed of data and sampler
    pub seed: u64,
    /// Posterior means, one per parameter
    pub means: Vec<f64>,
    /// Posterior stds
    pub stds: Vec<f64>,
    /// Whether each truth fell within the allowed distance
    pub hits: Vec<bool>,
    /// Sampler diagnostics verdict
    pub reliable: bool,
}

/// Aggregate over trials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Back-end under test
    pub backend: String,
    /// Parameter names
    pub param_names: Vec<String>,
    /// True values, same order
    pub truth: Vec<f64>,
    /// Completed trials
    pub trials: Vec<TrialResult>,
    /// Trials whose back-end raised an error
    pub failed: usize,
}

impl CalibrationReport {
    /// Fraction of completed trials that hit, per parameter
    pub fn coverage(&self) -> Vec<f64> {
        let n = self.trials.len().max(1) as f64;
        (0..self.param_names.len())
            .map(|k| self.trials.iter().filter(|t| t.hits[k]).count() as f64 / n)
            .collect()
    }

    /// Fraction of completed trials flagged reliable
    pub fn reliable_fraction(&self) -> f64 {
        let n = self.trials.len().max(1) as f64;
        self.trials.iter().filter(|t| t.reliable).count() as f64 / n
    }
}

/// Run `n_trials` independent trials of `backend`
///
/// Trial `i` uses seed `base.seed + i`. Back-end errors are counted, not
/// raised; setup errors abort the calibration.
pub fn run_calibration<B>(
    backend: &B,
    base: &BenchmarkConfig,
    sampler: &SamplerConfig,
    n_trials: usize,
) -> Result<CalibrationReport, BenchError>
where
    B: InferenceBackend<FitzHughNagumo> + ?Sized,
{
    let mut report = CalibrationReport {
        backend: backend.name().to_string(),
        param_names: Vec::new(),
        truth: Vec::new(),
        trials: Vec::with_capacity(n_trials),
        failed: 0,
    };

    for i in 0..n_trials {
        let seed = base.seed.wrapping_add(i as u64);
        let config = base.clone().with_seed(seed);
        let experiment = Experiment::setup(config)?;
        let trial_sampler = SamplerConfig {
            seed,
            ..sampler.clone()
        };

        let output = match backend.run_inference(&experiment.problem, &trial_sampler) {
            Ok(output) => output,
            Err(e) => {
                warn!(trial = i, seed, error = %e, "calibration trial failed");
                report.failed += 1;
                continue;
            }
        };

        let summary: Vec<_> = output
            .samples
            .summary()
            .into_iter()
            .filter(|s| s.name != NOISE_PARAM_NAME)
            .collect();
        if report.param_names.is_empty() {
            report.param_names = summary.iter().map(|s| s.name.clone()).collect();
            report.truth = report
                .param_names
                .iter()
                .map(|name| base.truth_of(name).unwrap_or(f64::NAN))
                .collect();
        }

        let hits = summary
            .iter()
            .zip(&report.truth)
            .map(|(s, &truth)| s.within_sd(truth, CALIBRATION_SD_MULTIPLE))
            .collect();
        report.trials.push(TrialResult {
            seed,
            means: summary.iter().map(|s| s.mean).collect(),
            stds: summary.iter().map(|s| s.std).collect(),
            hits,
            reliable: output.diagnostics.is_reliable(),
        });
        info!(trial = i, seed, "calibration trial finished");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(hits: Vec<Vec<bool>>) -> CalibrationReport {
        CalibrationReport {
            backend: "test".into(),
            param_names: vec!["a".into(), "b".into()],
            truth: vec![0.7, 0.8],
            trials: hits
                .into_iter()
                .enumerate()
                .map(|(i, hits)| TrialResult {
                    seed: i as u64,
                    means: vec![0.7, 0.8],
                    stds: vec![0.1, 0.1],
                    hits,
                    reliable: i % 2 == 0,
                })
                .collect(),
            failed: 0,
        }
    }

    #[test]
    fn test_coverage_per_parameter() {
        let r = report(vec![
            vec![true, true],
            vec![true, false],
            vec![true, true],
            vec![false, true],
        ]);
        assert_eq!(r.coverage(), vec![0.75, 0.75]);
        assert_eq!(r.reliable_fraction(), 0.5);
    }

    #[test]
    fn test_empty_report_has_zero_coverage() {
        let mut r = report(Vec::new());
        r.failed = 3;
        assert_eq!(r.coverage(), vec![0.0, 0.0]);
    }
}
