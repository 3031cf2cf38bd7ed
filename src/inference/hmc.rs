//! Hamiltonian Dynamics: Leapfrog Integration and Static HMC
//!
//! H(z, p) = U(z) + ½ pᵀ M⁻¹ p with a diagonal mass matrix M.
//!
//! Static HMC runs a fixed number of leapfrog steps and applies one
//! Metropolis test on the energy change. It is kept as the comparison
//! kernel behind NUTS.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use super::posterior::Posterior;
use super::model::LogDensity;
use crate::error::InferenceError;

/// Energy error beyond which a trajectory counts as divergent
pub const DIVERGENCE_THRESHOLD: f64 = 1000.0;

/// Position, momentum, potential and its gradient
#[derive(Debug, Clone)]
pub struct HmcState {
    /// Position (unconstrained)
    pub q: Vec<f64>,
    /// Momentum
    pub p: Vec<f64>,
    /// U(q)
    pub potential: f64,
    /// ∇U(q)
    pub grad_potential: Vec<f64>,
}

impl HmcState {
    /// ½ pᵀ M⁻¹ p
    pub fn kinetic(&self, inv_mass: &[f64]) -> f64 {
        0.5 * self
            .p
            .iter()
            .zip(inv_mass)
            .map(|(p, m)| p * p * m)
            .sum::<f64>()
    }

    /// U + K; +∞ when the potential is not finite
    pub fn hamiltonian(&self, inv_mass: &[f64]) -> f64 {
        if !self.potential.is_finite() {
            return f64::INFINITY;
        }
        self.potential + self.kinetic(inv_mass)
    }

    /// Draw p ~ N(0, M)
    pub fn resample_momentum<R: Rng + ?Sized>(&mut self, inv_mass: &[f64], rng: &mut R) {
        for (p, m) in self.p.iter_mut().zip(inv_mass) {
            let z: f64 = StandardNormal.sample(rng);
            *p = z / m.sqrt();
        }
    }
}

/// Leapfrog integrator with fixed step size and diagonal inverse mass
pub struct Leapfrog<'p, 'm, M: ?Sized> {
    posterior: &'p Posterior<'m, M>,
    step_size: f64,
    inv_mass: Vec<f64>,
}

impl<'p, 'm, M: LogDensity + ?Sized> Leapfrog<'p, 'm, M> {
    /// New integrator
    pub fn new(posterior: &'p Posterior<'m, M>, step_size: f64, inv_mass: Vec<f64>) -> Self {
        Self {
            posterior,
            step_size,
            inv_mass,
        }
    }

    /// Step size ε
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Diagonal of M⁻¹
    pub fn inv_mass(&self) -> &[f64] {
        &self.inv_mass
    }

    /// Evaluate U and ∇U at `q`, momentum zeroed
    pub fn init_state(&self, q: Vec<f64>) -> Result<HmcState, InferenceError> {
        let mut grad = vec![0.0; q.len()];
        let potential = self.posterior.potential_grad(&q, &mut grad)?;
        Ok(HmcState {
            p: vec![0.0; q.len()],
            q,
            potential,
            grad_potential: grad,
        })
    }

    /// One leapfrog step forward (`direction = 1`) or backward (`-1`)
    pub fn step(&self, state: &mut HmcState, direction: i32) -> Result<(), InferenceError> {
        let eps = self.step_size * f64::from(direction);
        let n = state.q.len();

        for i in 0..n {
            state.p[i] -= 0.5 * eps * state.grad_potential[i];
        }
        for i in 0..n {
            state.q[i] += eps * self.inv_mass[i] * state.p[i];
        }
        state.potential = self
            .posterior
            .potential_grad(&state.q, &mut state.grad_potential)?;
        if !state.potential.is_finite() {
            return Ok(());
        }
        for i in 0..n {
            state.p[i] -= 0.5 * eps * state.grad_potential[i];
        }
        Ok(())
    }
}

/// Outcome of one static HMC transition
#[derive(Debug, Clone)]
pub struct HmcTransition {
    /// Metropolis acceptance probability
    pub accept_prob: f64,
    /// Whether the proposal was accepted
    pub accepted: bool,
    /// Energy error exceeded the threshold or became non-finite
    pub divergent: bool,
    /// Leapfrog steps taken
    pub n_leapfrog: usize,
    /// Hamiltonian at the start
    pub energy: f64,
}

/// Fixed-length HMC transition; updates `state` in place on acceptance
pub fn hmc_transition<M, R>(
    integrator: &Leapfrog<'_, '_, M>,
    state: &mut HmcState,
    n_leapfrog: usize,
    rng: &mut R,
) -> Result<HmcTransition, InferenceError>
where
    M: LogDensity + ?Sized,
    R: Rng + ?Sized,
{
    let inv_mass = integrator.inv_mass();
    state.resample_momentum(inv_mass, rng);
    let h0 = state.hamiltonian(inv_mass);

    let mut proposal = state.clone();
    let mut steps = 0;
    let mut divergent = false;
    for _ in 0..n_leapfrog {
        integrator.step(&mut proposal, 1)?;
        steps += 1;
        let h = proposal.hamiltonian(inv_mass);
        if !h.is_finite() || h - h0 > DIVERGENCE_THRESHOLD {
            divergent = true;
            break;
        }
    }

    let h1 = proposal.hamiltonian(inv_mass);
    let accept_prob = if divergent || !h1.is_finite() {
        0.0
    } else {
        (h0 - h1).exp().min(1.0)
    };
    let accepted = rng.random::<f64>() < accept_prob;
    if accepted {
        *state = proposal;
    }

    Ok(HmcTransition {
        accept_prob,
        accepted,
        divergent,
        n_leapfrog: steps,
        energy: h0,
    })
}
