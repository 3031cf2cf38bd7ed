//! FitzHugh-Nagumo Model: Excitable Neuron Dynamics
//!
//! The FitzHugh-Nagumo model is a 2D simplification of Hodgkin-Huxley,
//! capturing the essential dynamics of neuronal excitability. The variant
//! benchmarked here reads
//!
//!   dv/dt = v - 0.33·v³ - w + l
//!   dw/dt = τ⁻¹·(v + a - b·w)
//!
//! where:
//! - v: membrane potential (fast variable)
//! - w: recovery variable (slow variable)
//! - τ⁻¹: timescale separation (small, ~0.08)
//! - a, b: shape parameters
//! - l: external current
//!
//! ## Parameter Estimation Setting
//!
//! The trajectory starts at (v, w) = (1, 1) and is followed over t ∈ [0, 10].
//! Data are generated at the reference parameters (0.7, 0.8, 0.08, 0.5).
//!
//! ## References
//!
//! - FitzHugh, R. (1961). Impulses and physiological states in theoretical
//!   models of nerve membrane. Biophysical Journal, 1(6), 445-466.
//! - Nagumo, J., et al. (1962). An active pulse transmission line
//!   simulating nerve axon. Proceedings of the IRE, 50(10), 2061-2070.

use serde::{Deserialize, Serialize};

use super::traits::VectorField;

/// Coefficient of the cubic term
pub const CUBIC_COEFFICIENT: f64 = 0.33;

/// Initial state (v, w)
pub const FHN_INITIAL_STATE: [f64; 2] = [1.0, 1.0];

/// Integration span
pub const FHN_TIME_SPAN: (f64, f64) = (0.0, 10.0);

/// Parameter names in vector order
pub const FHN_PARAM_NAMES: [&str; 4] = ["a", "b", "tau_inv", "l"];

/// State (v, w)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FhnState {
    /// Membrane potential
    pub v: f64,
    /// Recovery variable
    pub w: f64,
}

impl FhnState {
    /// State as a slice-compatible array
    pub fn to_array(self) -> [f64; 2] {
        [self.v, self.w]
    }
}

impl From<[f64; 2]> for FhnState {
    fn from(x: [f64; 2]) -> Self {
        Self { v: x[0], w: x[1] }
    }
}

/// Structural parameters (a, b, τ⁻¹, l)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FhnParams {
    /// Recovery offset
    pub a: f64,
    /// Recovery damping
    pub b: f64,
    /// Inverse timescale of the recovery variable
    pub tau_inv: f64,
    /// External current
    pub l: f64,
}

impl FhnParams {
    /// Data-generating parameters of the benchmark
    pub const fn reference() -> Self {
        Self {
            a: 0.7,
            b: 0.8,
            tau_inv: 0.08,
            l: 0.5,
        }
    }

    /// Parameters in vector order
    pub fn to_array(self) -> [f64; 4] {
        [self.a, self.b, self.tau_inv, self.l]
    }

    /// Parameters as an owned vector
    pub fn to_vec(self) -> Vec<f64> {
        self.to_array().to_vec()
    }
}

impl Default for FhnParams {
    fn default() -> Self {
        Self::reference()
    }
}

impl From<[f64; 4]> for FhnParams {
    fn from(p: [f64; 4]) -> Self {
        Self {
            a: p[0],
            b: p[1],
            tau_inv: p[2],
            l: p[3],
        }
    }
}

/// FitzHugh-Nagumo vector field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FitzHughNagumo;

impl FitzHughNagumo {
    /// FHN dynamics at a single state
    pub fn derivatives(&self, state: FhnState, p: &FhnParams) -> (f64, f64) {
        let FhnState { v, w } = state;
        let dv = v - CUBIC_COEFFICIENT * v.powi(3) - w + p.l;
        let dw = p.tau_inv * (v + p.a - p.b * w);
        (dv, dw)
    }
}

impl VectorField for FitzHughNagumo {
    fn model_id(&self) -> &'static str {
        "fitzhugh_nagumo"
    }

    fn state_dim(&self) -> usize {
        2
    }

    fn param_names(&self) -> &'static [&'static str] {
        &FHN_PARAM_NAMES
    }

    fn state_names(&self) -> &'static [&'static str] {
        &["v", "w"]
    }

    fn eval(&self, _t: f64, state: &[f64], params: &[f64], out: &mut [f64]) {
        let p = FhnParams::from([params[0], params[1], params[2], params[3]]);
        let (dv, dw) = self.derivatives(FhnState::from([state[0], state[1]]), &p);
        out[0] = dv;
        out[1] = dw;
    }

    fn jacobian_state(&self, _t: f64, state: &[f64], params: &[f64], out: &mut [f64]) {
        let v = state[0];
        let (b, tau_inv) = (params[1], params[2]);
        out[0] = 1.0 - 3.0 * CUBIC_COEFFICIENT * v * v;
        out[1] = -1.0;
        out[2] = tau_inv;
        out[3] = -tau_inv * b;
    }

    fn jacobian_params(&self, _t: f64, state: &[f64], params: &[f64], out: &mut [f64]) {
        let (v, w) = (state[0], state[1]);
        let (a, b, tau_inv) = (params[0], params[1], params[2]);
        // dv row: only l enters
        out[0] = 0.0;
        out[1] = 0.0;
        out[2] = 0.0;
        out[3] = 1.0;
        // dw row
        out[4] = tau_inv;
        out[5] = -tau_inv * w;
        out[6] = v + a - b * w;
        out[7] = 0.0;
    }
}
