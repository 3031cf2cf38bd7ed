//! No-U-Turn Sampler (NUTS)
//!
//! Multinomial NUTS with tree doubling:
//!
//! - each leaf carries weight exp(H₀ − H); proposals inside a subtree are
//!   drawn in proportion to weight, and across the top-level doubling with
//!   the biased progressive rule min(1, w_new / w_old)
//! - the trajectory stops when the generalized no-U-turn criterion
//!   ρ·M⁻¹p < 0 holds at either end (ρ = Σ p over the subtree), when an
//!   energy error exceeds [`DIVERGENCE_THRESHOLD`], or at the maximum depth

use rand::Rng;

use super::hmc::{HmcState, Leapfrog, DIVERGENCE_THRESHOLD};
use super::model::LogDensity;
use crate::error::InferenceError;

/// Result of one NUTS transition
#[derive(Debug, Clone)]
pub struct NutsTransition {
    /// New position
    pub q: Vec<f64>,
    /// U at the new position
    pub potential: f64,
    /// ∇U at the new position
    pub grad_potential: Vec<f64>,
    /// Depth of the final tree
    pub depth: usize,
    /// Leapfrog steps taken
    pub n_leapfrog: usize,
    /// Any leaf diverged
    pub divergent: bool,
    /// Mean Metropolis acceptance over all leaves
    pub accept_prob: f64,
    /// Hamiltonian at the start
    pub energy: f64,
}

/// Subtree under construction
struct NutsTree {
    left: HmcState,
    right: HmcState,
    proposal: HmcState,
    rho: Vec<f64>,
    log_sum_weight: f64,
    n_leapfrog: usize,
    sum_accept_prob: f64,
    divergent: bool,
    turning: bool,
}

impl NutsTree {
    fn edge(&self, direction: i32) -> &HmcState {
        if direction > 0 {
            &self.right
        } else {
            &self.left
        }
    }
}

fn log_sum_exp(a: f64, b: f64) -> f64 {
    let max = a.max(b);
    if max == f64::NEG_INFINITY {
        f64::NEG_INFINITY
    } else {
        max + ((a - max).exp() + (b - max).exp()).ln()
    }
}

/// ρ·M⁻¹p at both ends
fn is_turning(rho: &[f64], p_left: &[f64], p_right: &[f64], inv_mass: &[f64]) -> bool {
    let dot = |p: &[f64]| -> f64 {
        rho.iter()
            .zip(p)
            .zip(inv_mass)
            .map(|((r, p), m)| r * p * m)
            .sum()
    };
    dot(p_left) <= 0.0 || dot(p_right) <= 0.0
}

fn build_leaf<M: LogDensity + ?Sized>(
    integrator: &Leapfrog<'_, '_, M>,
    start: &HmcState,
    direction: i32,
    h0: f64,
) -> Result<NutsTree, InferenceError> {
    let mut state = start.clone();
    integrator.step(&mut state, direction)?;

    let h = state.hamiltonian(integrator.inv_mass());
    let energy_error = h - h0;
    let divergent = !energy_error.is_finite() || energy_error > DIVERGENCE_THRESHOLD;
    let (log_weight, accept_prob) = if energy_error.is_finite() {
        (-energy_error, (-energy_error).exp().min(1.0))
    } else {
        (f64::NEG_INFINITY, 0.0)
    };

    Ok(NutsTree {
        rho: state.p.clone(),
        left: state.clone(),
        right: state.clone(),
        proposal: state,
        log_sum_weight: log_weight,
        n_leapfrog: 1,
        sum_accept_prob: accept_prob,
        divergent,
        turning: false,
    })
}

/// Balanced subtree of 2^depth leapfrog steps starting next to `start`
fn build_tree<M, R>(
    integrator: &Leapfrog<'_, '_, M>,
    start: &HmcState,
    depth: usize,
    direction: i32,
    h0: f64,
    rng: &mut R,
) -> Result<NutsTree, InferenceError>
where
    M: LogDensity + ?Sized,
    R: Rng + ?Sized,
{
    if depth == 0 {
        return build_leaf(integrator, start, direction, h0);
    }

    let mut inner = build_tree(integrator, start, depth - 1, direction, h0, rng)?;
    if inner.divergent || inner.turning {
        return Ok(inner);
    }

    let outer = build_tree(integrator, inner.edge(direction), depth - 1, direction, h0, rng)?;

    inner.n_leapfrog += outer.n_leapfrog;
    inner.sum_accept_prob += outer.sum_accept_prob;
    if outer.divergent || outer.turning {
        inner.divergent |= outer.divergent;
        inner.turning |= outer.turning;
        return Ok(inner);
    }

    let merged_weight = log_sum_exp(inner.log_sum_weight, outer.log_sum_weight);
    if rng.random::<f64>() < (outer.log_sum_weight - merged_weight).exp() {
        inner.proposal = outer.proposal;
    }
    inner.log_sum_weight = merged_weight;

    for (r, o) in inner.rho.iter_mut().zip(&outer.rho) {
        *r += o;
    }
    if direction > 0 {
        inner.right = outer.right;
    } else {
        inner.left = outer.left;
    }
    inner.turning = is_turning(&inner.rho, &inner.left.p, &inner.right.p, integrator.inv_mass());
    Ok(inner)
}

/// One NUTS transition from `current` (momentum is resampled)
pub fn nuts_transition<M, R>(
    integrator: &Leapfrog<'_, '_, M>,
    current: &HmcState,
    max_treedepth: usize,
    rng: &mut R,
) -> Result<NutsTransition, InferenceError>
where
    M: LogDensity + ?Sized,
    R: Rng + ?Sized,
{
    let inv_mass = integrator.inv_mass();
    let mut start = current.clone();
    start.resample_momentum(inv_mass, rng);
    let h0 = start.hamiltonian(inv_mass);

    let mut tree = NutsTree {
        rho: start.p.clone(),
        left: start.clone(),
        right: start.clone(),
        proposal: start,
        log_sum_weight: 0.0,
        n_leapfrog: 0,
        sum_accept_prob: 0.0,
        divergent: false,
        turning: false,
    };

    let mut depth = 0;
    while depth < max_treedepth {
        let direction: i32 = if rng.random::<bool>() { 1 } else { -1 };
        let subtree = build_tree(integrator, tree.edge(direction), depth, direction, h0, rng)?;
        depth += 1;

        tree.n_leapfrog += subtree.n_leapfrog;
        tree.sum_accept_prob += subtree.sum_accept_prob;
        if subtree.divergent {
            tree.divergent = true;
            break;
        }
        if subtree.turning {
            break;
        }

        if rng.random::<f64>() < (subtree.log_sum_weight - tree.log_sum_weight).exp() {
            tree.proposal = subtree.proposal;
        }
        tree.log_sum_weight = log_sum_exp(tree.log_sum_weight, subtree.log_sum_weight);

        for (r, s) in tree.rho.iter_mut().zip(&subtree.rho) {
            *r += s;
        }
        if direction > 0 {
            tree.right = subtree.right;
        } else {
            tree.left = subtree.left;
        }
        if is_turning(&tree.rho, &tree.left.p, &tree.right.p, inv_mass) {
            break;
        }
    }

    let accept_prob = tree.sum_accept_prob / tree.n_leapfrog.max(1) as f64;
    Ok(NutsTransition {
        q: tree.proposal.q,
        potential: tree.proposal.potential,
        grad_potential: tree.proposal.grad_potential,
        depth,
        n_leapfrog: tree.n_leapfrog,
        divergent: tree.divergent,
        accept_prob,
        energy: h0,
    })
}
