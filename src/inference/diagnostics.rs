//! Convergence Diagnostics: ESS, Split R-hat and Sampler Health
//!
//! ESS follows Geyer's initial monotone sequence over the multi-chain
//! autocorrelation estimate; R-hat is the split-chain Gelman-Rubin
//! statistic (each chain halved, so a single chain still gets a value).

use serde::{Deserialize, Deserializer, Serialize};

/// Divergences allowed before a run is flagged, as a fraction of draws
pub const MAX_DIVERGENCE_FRACTION: f64 = 0.01;
/// R-hat threshold for multi-chain runs
pub const MAX_RHAT: f64 = 1.05;
/// Minimum bulk ESS per parameter
pub const MIN_ESS: f64 = 100.0;

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn variance(xs: &[f64]) -> f64 {
    let m = mean(xs);
    xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() as f64 - 1.0)
}

/// Split potential scale reduction factor.
///
/// `NaN` when chains are shorter than 4 draws or have zero variance.
pub fn split_rhat(chains: &[&[f64]]) -> f64 {
    let n = chains.iter().map(|c| c.len()).min().unwrap_or(0);
    if chains.is_empty() || n < 4 {
        return f64::NAN;
    }

    let half = n / 2;
    let splits: Vec<&[f64]> = chains
        .iter()
        .flat_map(|c| [&c[..half], &c[n - half..n]])
        .collect();
    let m = splits.len() as f64;

    let means: Vec<f64> = splits.iter().map(|s| mean(s)).collect();
    let w = splits.iter().map(|s| variance(s)).sum::<f64>() / m;
    if w <= 0.0 || !w.is_finite() {
        return f64::NAN;
    }
    let grand = mean(&means);
    let b_over_n = means.iter().map(|x| (x - grand).powi(2)).sum::<f64>() / (m - 1.0);
    let var_plus = (half as f64 - 1.0) / half as f64 * w + b_over_n;
    (var_plus / w).sqrt()
}

/// Biased autocovariance at `lag`
fn autocovariance(xs: &[f64], m: f64, lag: usize) -> f64 {
    let n = xs.len();
    xs[..n - lag]
        .iter()
        .zip(&xs[lag..])
        .map(|(a, b)| (a - m) * (b - m))
        .sum::<f64>()
        / n as f64
}

/// Bulk effective sample size across chains.
///
/// `NaN` when chains are shorter than 4 draws or have zero variance.
pub fn effective_sample_size(chains: &[&[f64]]) -> f64 {
    let n = chains.iter().map(|c| c.len()).min().unwrap_or(0);
    if chains.is_empty() || n < 4 {
        return f64::NAN;
    }
    let chains: Vec<&[f64]> = chains.iter().map(|c| &c[..n]).collect();
    let m = chains.len() as f64;
    let nf = n as f64;

    let means: Vec<f64> = chains.iter().map(|c| mean(c)).collect();
    let w = chains.iter().map(|c| variance(c)).sum::<f64>() / m;
    if w <= 0.0 || !w.is_finite() {
        return f64::NAN;
    }
    let var_plus = if chains.len() > 1 {
        (nf - 1.0) / nf * w + variance(&means)
    } else {
        (nf - 1.0) / nf * w
    };

    let rho = |lag: usize| -> f64 {
        let acov = chains
            .iter()
            .zip(&means)
            .map(|(c, &mu)| autocovariance(c, mu, lag))
            .sum::<f64>()
            / m;
        1.0 - (w - acov) / var_plus
    };

    // Geyer: sum adjacent pairs while positive, forcing them to decrease
    let mut tau = -1.0;
    let mut prev_pair = f64::INFINITY;
    let mut lag = 0;
    while lag + 1 < n {
        let pair = rho(lag) + rho(lag + 1);
        if pair <= 0.0 {
            break;
        }
        let pair = pair.min(prev_pair);
        tau += 2.0 * pair;
        prev_pair = pair;
        lag += 2;
    }

    let total = m * nf;
    (total / tau.max(1.0 / total.log10())).min(total * total.log10())
}

/// Per-parameter convergence statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDiagnostics {
    /// Parameter name
    pub name: String,
    /// Bulk effective sample size
    #[serde(deserialize_with = "nan_from_null")]
    pub ess: f64,
    /// Split R-hat
    #[serde(deserialize_with = "nan_from_null")]
    pub rhat: f64,
}

/// serde_json writes NaN as `null`; read it back as NaN
pub(crate) fn nan_from_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Sampler health for one back-end run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Number of chains
    pub n_chains: usize,
    /// Post-warmup draws per chain
    pub n_draws: usize,
    /// Divergent transitions over all chains
    pub divergences: usize,
    /// Mean acceptance statistic
    #[serde(deserialize_with = "nan_from_null")]
    pub mean_accept_prob: f64,
    /// Adapted step size, averaged over chains
    pub step_size: f64,
    /// Mean tree depth (0 for static HMC)
    pub mean_tree_depth: f64,
    /// Mean leapfrog steps per transition
    pub mean_leapfrog: f64,
    /// Per-parameter ESS and R-hat
    pub params: Vec<ParamDiagnostics>,
}

impl Diagnostics {
    /// Total post-warmup draws
    pub fn total_draws(&self) -> usize {
        self.n_chains * self.n_draws
    }

    /// Fraction of transitions that diverged
    pub fn divergence_rate(&self) -> f64 {
        if self.total_draws() == 0 {
            return 0.0;
        }
        self.divergences as f64 / self.total_draws() as f64
    }

    /// Smallest ESS over parameters
    pub fn min_ess(&self) -> f64 {
        self.params.iter().map(|p| p.ess).fold(f64::INFINITY, f64::min)
    }

    /// Largest R-hat over parameters
    pub fn max_rhat(&self) -> f64 {
        self.params.iter().map(|p| p.rhat).fold(f64::NEG_INFINITY, f64::max)
    }

    /// Reasons the run should not be trusted; empty when reliable
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.divergence_rate() > MAX_DIVERGENCE_FRACTION {
            issues.push(format!(
                "{} divergent transitions ({:.1}% of draws)",
                self.divergences,
                100.0 * self.divergence_rate()
            ));
        }
        for p in &self.params {
            if self.n_chains > 1 && !(p.rhat < MAX_RHAT) {
                issues.push(format!("R-hat of {} is {:.3}", p.name, p.rhat));
            }
            if !(p.ess >= MIN_ESS) {
                issues.push(format!("ESS of {} is {:.0}", p.name, p.ess));
            }
        }
        issues
    }

    /// No excess divergences, R-hat < 1.05 (multi-chain) and ESS ≥ 100
    pub fn is_reliable(&self) -> bool {
        self.issues().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, StandardNormal};

    fn white_noise(seed: u64, n: usize) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n).map(|_| StandardNormal.sample(&mut rng)).collect()
    }

    fn ar1(seed: u64, n: usize, phi: f64) -> Vec<f64> {
        let eps = white_noise(seed, n);
        let mut xs = Vec::with_capacity(n);
        let mut x = 0.0;
        for e in eps {
            x = phi * x + e;
            xs.push(x);
        }
        xs
    }

    #[test]
    fn test_rhat_converged_chains_near_one() {
        let a = white_noise(1, 1000);
        let b = white_noise(2, 1000);
        let r = split_rhat(&[&a, &b]);
        assert!(r < 1.01, "R-hat {} should be ~1", r);
    }

    #[test]
    fn test_rhat_detects_shifted_chain() {
        let a = white_noise(1, 1000);
        let b: Vec<f64> = white_noise(2, 1000).iter().map(|x| x + 3.0).collect();
        let r = split_rhat(&[&a, &b]);
        assert!(r > 1.5, "R-hat {} should flag disagreement", r);
    }

    #[test]
    fn test_rhat_insufficient_draws() {
        assert!(split_rhat(&[&[1.0, 2.0, 3.0]]).is_nan());
        assert!(split_rhat(&[&[1.0; 10]]).is_nan());
    }

    #[test]
    fn test_ess_of_independent_draws_near_n() {
        let a = white_noise(3, 2000);
        let ess = effective_sample_size(&[&a]);
        assert!(ess > 1500.0 && ess < 2600.0, "ESS {} should be ~2000", ess);
    }

    #[test]
    fn test_ess_shrinks_with_autocorrelation() {
        let a = ar1(4, 4000, 0.9);
        let ess = effective_sample_size(&[&a]);
        // Theory: n (1 − φ) / (1 + φ) ≈ 210
        assert!(ess > 100.0 && ess < 450.0, "ESS {} for AR(1) 0.9", ess);
    }

    fn diagnostics(divergences: usize, ess: f64, rhat: f64, n_chains: usize) -> Diagnostics {
        Diagnostics {
            n_chains,
            n_draws: 1000,
            divergences,
            mean_accept_prob: 0.8,
            step_size: 0.1,
            mean_tree_depth: 3.0,
            mean_leapfrog: 7.0,
            params: vec![ParamDiagnostics {
                name: "a".into(),
                ess,
                rhat,
            }],
        }
    }

    #[test]
    fn test_reliability_verdict() {
        assert!(diagnostics(0, 800.0, 1.001, 4).is_reliable());
        assert!(!diagnostics(100, 800.0, 1.001, 4).is_reliable());
        assert!(!diagnostics(0, 50.0, 1.001, 4).is_reliable());
        assert!(!diagnostics(0, 800.0, 1.2, 4).is_reliable());
        // A single chain is not judged on R-hat
        assert!(diagnostics(0, 800.0, 1.2, 1).is_reliable());
        assert!(!diagnostics(0, f64::NAN, 1.0, 1).is_reliable());
    }

    #[test]
    fn test_nan_statistics_survive_json() {
        let diag = diagnostics(0, f64::NAN, f64::NAN, 1);
        let json = serde_json::to_string(&diag).unwrap();
        let back: Diagnostics = serde_json::from_str(&json).unwrap();
        assert!(back.params[0].ess.is_nan());
        assert!(back.params[0].rhat.is_nan());
        assert_eq!(back.divergences, 0);
    }
}
