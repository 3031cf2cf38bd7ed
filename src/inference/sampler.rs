//! Chain Execution: Warmup, Sampling and Multi-Chain Aggregation
//!
//! Every chain owns a `ChaCha8Rng` seeded with `seed + chain index`, so a
//! run is reproducible whether chains execute in parallel or not. Results
//! are aggregated only after all chains finish.

use std::time::Instant;

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::adapt::{find_reasonable_step_size, AdaptEvent, WindowedAdaptation};
use super::diagnostics::{Diagnostics, ParamDiagnostics};
use super::hmc::{hmc_transition, HmcState, Leapfrog};
use super::model::LogDensity;
use super::nuts::nuts_transition;
use super::posterior::Posterior;
use super::samples::PosteriorSamples;
use crate::error::InferenceError;

/// Transition kernel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Kernel {
    /// No-U-Turn Sampler
    Nuts {
        /// Maximum tree depth
        max_treedepth: usize,
    },
    /// Hamiltonian Monte Carlo with a fixed trajectory length
    StaticHmc {
        /// Leapfrog steps per transition
        n_leapfrog: usize,
    },
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::Nuts { max_treedepth: 10 }
    }
}

/// Sampler settings shared by every back-end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Warmup (adaptation) iterations per chain, discarded
    pub warmup: usize,
    /// Post-warmup draws per chain
    pub draws: usize,
    /// Number of chains
    pub chains: usize,
    /// Target mean acceptance for step-size adaptation
    pub target_accept: f64,
    /// Transition kernel
    pub kernel: Kernel,
    /// Base seed; chain `c` uses `seed + c`
    pub seed: u64,
    /// Std of the Gaussian jitter added to the unconstrained start point
    pub init_jitter: f64,
    /// Run chains on the rayon pool
    pub parallel: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            warmup: 1000,
            draws: 1000,
            chains: 4,
            target_accept: 0.8,
            kernel: Kernel::default(),
            seed: 42,
            init_jitter: 0.25,
            parallel: true,
        }
    }
}

impl SamplerConfig {
    /// Reject settings no sampler can run with
    pub fn validate(&self) -> Result<(), InferenceError> {
        if self.chains == 0 {
            return Err(InferenceError::invalid_config("chains must be at least 1"));
        }
        if self.draws < 4 {
            return Err(InferenceError::invalid_config("draws must be at least 4"));
        }
        if !(self.target_accept > 0.0 && self.target_accept < 1.0) {
            return Err(InferenceError::invalid_config(format!(
                "target_accept must be in (0, 1), got {}",
                self.target_accept
            )));
        }
        if !self.init_jitter.is_finite() || self.init_jitter < 0.0 {
            return Err(InferenceError::invalid_config(format!(
                "init_jitter must be finite and >= 0, got {}",
                self.init_jitter
            )));
        }
        match self.kernel {
            Kernel::Nuts { max_treedepth } if max_treedepth == 0 => {
                Err(InferenceError::invalid_config("max_treedepth must be at least 1"))
            }
            Kernel::StaticHmc { n_leapfrog } if n_leapfrog == 0 => {
                Err(InferenceError::invalid_config("n_leapfrog must be at least 1"))
            }
            _ => Ok(()),
        }
    }
}

/// Raw output of one chain
#[derive(Debug, Clone)]
pub struct ChainOutput {
    /// Draws in constrained space, `draws × dim`
    pub draws: Array2<f64>,
    /// Per-draw divergence flags
    pub divergent: Vec<bool>,
    /// Per-draw acceptance statistics
    pub accept_probs: Vec<f64>,
    /// Per-draw tree depths (0 for static HMC)
    pub tree_depths: Vec<usize>,
    /// Per-draw leapfrog counts
    pub n_leapfrog: Vec<usize>,
    /// Adapted step size
    pub step_size: f64,
    /// Adapted diagonal inverse mass
    pub inv_mass: Vec<f64>,
}

impl ChainOutput {
    /// Number of divergent draws
    pub fn divergences(&self) -> usize {
        self.divergent.iter().filter(|d| **d).count()
    }
}

struct Step {
    accept_prob: f64,
    divergent: bool,
    depth: usize,
    n_leapfrog: usize,
}

fn transition<M, R>(
    integrator: &Leapfrog<'_, '_, M>,
    state: &mut HmcState,
    kernel: Kernel,
    rng: &mut R,
) -> Result<Step, InferenceError>
where
    M: LogDensity + ?Sized,
    R: Rng + ?Sized,
{
    match kernel {
        Kernel::Nuts { max_treedepth } => {
            let t = nuts_transition(integrator, state, max_treedepth, rng)?;
            state.q = t.q;
            state.potential = t.potential;
            state.grad_potential = t.grad_potential;
            Ok(Step {
                accept_prob: t.accept_prob,
                divergent: t.divergent,
                depth: t.depth,
                n_leapfrog: t.n_leapfrog,
            })
        }
        Kernel::StaticHmc { n_leapfrog } => {
            let t = hmc_transition(integrator, state, n_leapfrog, rng)?;
            Ok(Step {
                accept_prob: t.accept_prob,
                divergent: t.divergent,
                depth: 0,
                n_leapfrog: t.n_leapfrog,
            })
        }
    }
}

/// Jittered unconstrained start point with a finite potential
fn initial_position<M, R>(
    posterior: &Posterior<'_, M>,
    jitter: f64,
    rng: &mut R,
) -> Result<Vec<f64>, InferenceError>
where
    M: LogDensity + ?Sized,
    R: Rng + ?Sized,
{
    let z0 = posterior.to_unconstrained(&posterior.model().initial_point());
    if z0.iter().any(|z| !z.is_finite()) {
        return Err(InferenceError::BadInitialPoint(
            "initial point lies on a parameter bound".into(),
        ));
    }
    if jitter == 0.0 {
        return Ok(z0);
    }

    let normal = Normal::new(0.0, jitter)
        .map_err(|e| InferenceError::invalid_config(format!("init_jitter: {}", e)))?;
    let mut grad = vec![0.0; z0.len()];
    for _ in 0..100 {
        let z: Vec<f64> = z0.iter().map(|z| z + normal.sample(rng)).collect();
        if posterior.potential_grad(&z, &mut grad)?.is_finite() {
            return Ok(z);
        }
    }
    Ok(z0)
}

/// Warm up and sample one chain
pub fn sample_chain<M: LogDensity + ?Sized>(
    model: &M,
    config: &SamplerConfig,
    chain: usize,
) -> Result<ChainOutput, InferenceError> {
    let posterior = Posterior::new(model);
    let dim = posterior.dim();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(chain as u64));

    let z_init = initial_position(&posterior, config.init_jitter, &mut rng)?;
    let init_eps = find_reasonable_step_size(&posterior, &z_init, &vec![1.0; dim], &mut rng)?;
    let mut adaptation = WindowedAdaptation::new(dim, config.warmup, config.target_accept, init_eps);

    let mut state = Leapfrog::new(&posterior, init_eps, vec![1.0; dim]).init_state(z_init)?;

    let mut warmup_divergences = 0;
    for i in 0..config.warmup {
        let inv_mass = adaptation.inv_mass_diag().to_vec();
        let integrator = Leapfrog::new(&posterior, adaptation.step_size(), inv_mass);
        let step = transition(&integrator, &mut state, config.kernel, &mut rng)?;
        warmup_divergences += usize::from(step.divergent);

        if adaptation.update(i, &state.q, step.accept_prob) == AdaptEvent::MassUpdated {
            let eps = find_reasonable_step_size(
                &posterior,
                &state.q,
                adaptation.inv_mass_diag(),
                &mut rng,
            )?;
            adaptation.restart_step_size(eps);
        }
    }

    let step_size = adaptation.adapted_step_size();
    let inv_mass = adaptation.inv_mass_diag().to_vec();
    debug!(
        chain,
        step_size,
        warmup_divergences,
        "warmup finished"
    );

    let integrator = Leapfrog::new(&posterior, step_size, inv_mass.clone());
    let mut draws = Array2::zeros((config.draws, dim));
    let mut divergent = Vec::with_capacity(config.draws);
    let mut accept_probs = Vec::with_capacity(config.draws);
    let mut tree_depths = Vec::with_capacity(config.draws);
    let mut n_leapfrog = Vec::with_capacity(config.draws);

    for d in 0..config.draws {
        let step = transition(&integrator, &mut state, config.kernel, &mut rng)?;
        let theta = posterior.to_constrained(&state.q);
        for (j, x) in theta.into_iter().enumerate() {
            draws[[d, j]] = x;
        }
        divergent.push(step.divergent);
        accept_probs.push(step.accept_prob);
        tree_depths.push(step.depth);
        n_leapfrog.push(step.n_leapfrog);
    }

    Ok(ChainOutput {
        draws,
        divergent,
        accept_probs,
        tree_depths,
        n_leapfrog,
        step_size,
        inv_mass,
    })
}

fn pooled_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Aggregate chains into samples plus diagnostics
pub fn collect_chains(
    param_names: Vec<String>,
    outputs: Vec<ChainOutput>,
) -> (PosteriorSamples, Diagnostics) {
    let n_chains = outputs.len();
    let n_draws = outputs.first().map_or(0, |c| c.draws.nrows());
    let divergences = outputs.iter().map(|c| c.divergences()).sum();
    let mean_accept_prob = pooled_mean(outputs.iter().flat_map(|c| c.accept_probs.iter().copied()));
    let mean_leapfrog =
        pooled_mean(outputs.iter().flat_map(|c| c.n_leapfrog.iter().map(|&n| n as f64)));
    let mean_tree_depth =
        pooled_mean(outputs.iter().flat_map(|c| c.tree_depths.iter().map(|&d| d as f64)));
    let step_size = outputs.iter().map(|c| c.step_size).sum::<f64>() / n_chains.max(1) as f64;

    let samples = PosteriorSamples::new(
        param_names,
        outputs.into_iter().map(|c| c.draws).collect(),
    );
    let params = samples
        .summary()
        .into_iter()
        .map(|s| ParamDiagnostics {
            name: s.name,
            ess: s.ess,
            rhat: s.rhat,
        })
        .collect();

    let diagnostics = Diagnostics {
        n_chains,
        n_draws,
        divergences,
        mean_accept_prob,
        step_size,
        mean_tree_depth,
        mean_leapfrog,
        params,
    };
    (samples, diagnostics)
}

/// Run `config.chains` chains on `model` and aggregate them
pub fn run_chains<M: LogDensity + ?Sized>(
    model: &M,
    config: &SamplerConfig,
) -> Result<(PosteriorSamples, Diagnostics), InferenceError> {
    config.validate()?;
    let started = Instant::now();

    let outputs: Vec<ChainOutput> = if config.parallel && config.chains > 1 {
        (0..config.chains)
            .into_par_iter()
            .map(|c| sample_chain(model, config, c))
            .collect::<Result<_, _>>()?
    } else {
        (0..config.chains)
            .map(|c| sample_chain(model, config, c))
            .collect::<Result<_, _>>()?
    };

    let (samples, diagnostics) = collect_chains(model.param_names(), outputs);
    info!(
        chains = config.chains,
        draws = config.draws,
        divergences = diagnostics.divergences,
        accept = diagnostics.mean_accept_prob,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "sampling finished"
    );
    for issue in diagnostics.issues() {
        warn!(%issue, "sampler diagnostics");
    }
    Ok((samples, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::model::test_models::{BetaTarget, IsoNormal};

    fn quick_config(seed: u64) -> SamplerConfig {
        SamplerConfig {
            warmup: 300,
            draws: 600,
            chains: 2,
            seed,
            ..SamplerConfig::default()
        }
    }

    #[test]
    fn test_nuts_chains_recover_normal_target() {
        let model = IsoNormal {
            mu: vec![2.0, -1.0],
            scale: vec![0.1, 3.0],
        };
        let (samples, diag) = run_chains(&model, &quick_config(7)).unwrap();
        assert_eq!(samples.n_chains(), 2);
        assert_eq!(samples.draws_per_chain(), 600);
        assert_eq!(samples.total_draws(), 1200);
        assert_eq!(samples.total_draws(), diag.total_draws());

        for (s, (mu, sd)) in samples.summary().iter().zip(model.mu.iter().zip(&model.scale)) {
            assert!((s.mean - mu).abs() < 0.2 * sd, "{} mean {} vs {}", s.name, s.mean, mu);
            assert!((s.std / sd - 1.0).abs() < 0.2, "{} std {} vs {}", s.name, s.std, sd);
        }
        assert!(diag.is_reliable(), "issues: {:?}", diag.issues());
    }

    #[test]
    fn test_bounded_target_stays_in_bounds() {
        let model = BetaTarget { alpha: 2.0, beta: 5.0 };
        let (samples, diag) = run_chains(&model, &quick_config(3)).unwrap();
        let p = samples.get("p").unwrap();
        assert!(p.iter().all(|x| *x > 0.0 && *x < 1.0));
        // Beta(2, 5) mean = 2/7
        let mean = p.iter().sum::<f64>() / p.len() as f64;
        assert!((mean - 2.0 / 7.0).abs() < 0.03, "mean {}", mean);
        assert_eq!(diag.divergences, 0);
    }

    #[test]
    fn test_seeded_runs_are_reproducible_in_parallel() {
        let model = IsoNormal {
            mu: vec![0.0],
            scale: vec![1.0],
        };
        let parallel = quick_config(11);
        let serial = SamplerConfig {
            parallel: false,
            ..quick_config(11)
        };
        let (a, _) = run_chains(&model, &parallel).unwrap();
        let (b, _) = run_chains(&model, &serial).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_static_hmc_kernel_runs() {
        let model = IsoNormal {
            mu: vec![0.5],
            scale: vec![1.0],
        };
        let config = SamplerConfig {
            kernel: Kernel::StaticHmc { n_leapfrog: 8 },
            ..quick_config(5)
        };
        let (samples, diag) = run_chains(&model, &config).unwrap();
        assert_eq!(diag.mean_tree_depth, 0.0);
        assert!(diag.mean_leapfrog <= 8.0);
        let mean = samples.means()[0];
        assert!((mean - 0.5).abs() < 0.3, "mean {}", mean);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let model = IsoNormal {
            mu: vec![0.0],
            scale: vec![1.0],
        };
        for bad in [
            SamplerConfig { chains: 0, ..SamplerConfig::default() },
            SamplerConfig { draws: 2, ..SamplerConfig::default() },
            SamplerConfig { target_accept: 1.0, ..SamplerConfig::default() },
            SamplerConfig { kernel: Kernel::Nuts { max_treedepth: 0 }, ..SamplerConfig::default() },
        ] {
            assert!(matches!(run_chains(&model, &bad), Err(InferenceError::InvalidConfig(_))));
        }
    }
}
