//! Transforms Between Constrained and Unconstrained Space
//!
//! | support      | θ(z)                     | ln|dθ/dz|                      |
//! |--------------|--------------------------|--------------------------------|
//! | (lo, hi)     | lo + (hi − lo)·σ(z)      | ln(hi − lo) + ln σ + ln(1 − σ) |
//! | (lo, ∞)      | lo + eᶻ                  | z                              |
//! | (−∞, hi)     | hi − eᶻ                  | z                              |
//! | (−∞, ∞)      | z                        | 0                              |

use serde::{Deserialize, Serialize};

/// Transform of a single coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamTransform {
    /// Scaled logistic onto a finite interval
    Interval {
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },
    /// Shifted exponential onto `(lower, ∞)`
    LowerBounded(f64),
    /// Reflected exponential onto `(−∞, upper)`
    UpperBounded(f64),
    /// No constraint
    Identity,
}

/// ln(1 + eˣ) without overflow
fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

fn logistic(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl ParamTransform {
    /// Pick the transform for `(lower, upper)`
    pub fn from_bounds(lower: f64, upper: f64) -> Self {
        match (lower.is_finite(), upper.is_finite()) {
            (true, true) => ParamTransform::Interval { lower, upper },
            (true, false) => ParamTransform::LowerBounded(lower),
            (false, true) => ParamTransform::UpperBounded(upper),
            (false, false) => ParamTransform::Identity,
        }
    }

    /// z ↦ θ
    pub fn to_constrained(&self, z: f64) -> f64 {
        match *self {
            ParamTransform::Interval { lower, upper } => {
                (lower + (upper - lower) * logistic(z)).clamp(lower, upper)
            }
            ParamTransform::LowerBounded(lower) => lower + z.exp(),
            ParamTransform::UpperBounded(upper) => upper - z.exp(),
            ParamTransform::Identity => z,
        }
    }

    /// θ ↦ z; points on a finite bound map to ±∞
    pub fn to_unconstrained(&self, theta: f64) -> f64 {
        match *self {
            ParamTransform::Interval { lower, upper } => {
                let u = (theta - lower) / (upper - lower);
                (u / (1.0 - u)).ln()
            }
            ParamTransform::LowerBounded(lower) => (theta - lower).ln(),
            ParamTransform::UpperBounded(upper) => (upper - theta).ln(),
            ParamTransform::Identity => theta,
        }
    }

    /// dθ/dz
    pub fn jacobian(&self, z: f64) -> f64 {
        match *self {
            ParamTransform::Interval { lower, upper } => {
                let s = logistic(z);
                (upper - lower) * s * (1.0 - s)
            }
            ParamTransform::LowerBounded(_) => z.exp(),
            ParamTransform::UpperBounded(_) => -z.exp(),
            ParamTransform::Identity => 1.0,
        }
    }

    /// ln|dθ/dz|
    pub fn ln_abs_jacobian(&self, z: f64) -> f64 {
        match *self {
            ParamTransform::Interval { lower, upper } => {
                (upper - lower).ln() - softplus(-z) - softplus(z)
            }
            ParamTransform::LowerBounded(_) | ParamTransform::UpperBounded(_) => z,
            ParamTransform::Identity => 0.0,
        }
    }

    /// d ln|dθ/dz| / dz
    pub fn grad_ln_abs_jacobian(&self, z: f64) -> f64 {
        match *self {
            ParamTransform::Interval { .. } => 1.0 - 2.0 * logistic(z),
            ParamTransform::LowerBounded(_) | ParamTransform::UpperBounded(_) => 1.0,
            ParamTransform::Identity => 0.0,
        }
    }
}

/// Coordinate-wise transform of a whole parameter vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    coords: Vec<ParamTransform>,
}

impl Transform {
    /// One transform per `(lower, upper)` pair
    pub fn from_bounds(bounds: &[(f64, f64)]) -> Self {
        Self {
            coords: bounds
                .iter()
                .map(|&(lo, hi)| ParamTransform::from_bounds(lo, hi))
                .collect(),
        }
    }

    /// Number of coordinates
    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    /// Per-coordinate transforms
    pub fn coords(&self) -> &[ParamTransform] {
        &self.coords
    }

    /// z ↦ θ
    pub fn to_constrained(&self, z: &[f64]) -> Vec<f64> {
        self.coords.iter().zip(z).map(|(t, &zi)| t.to_constrained(zi)).collect()
    }

    /// θ ↦ z
    pub fn to_unconstrained(&self, theta: &[f64]) -> Vec<f64> {
        self.coords
            .iter()
            .zip(theta)
            .map(|(t, &x)| t.to_unconstrained(x))
            .collect()
    }

    /// Σ ln|dθᵢ/dzᵢ|
    pub fn ln_abs_det_jacobian(&self, z: &[f64]) -> f64 {
        self.coords.iter().zip(z).map(|(t, &zi)| t.ln_abs_jacobian(zi)).sum()
    }
}
