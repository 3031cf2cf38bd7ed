//! Inverse-Gamma Prior
//!
//!   p(x) = βᵅ / Γ(α) · x^(−α−1) · exp(−β/x),   x > 0
//!
//! If G ~ Gamma(α, scale = 1/β) then 1/G ~ InverseGamma(α, β).

use rand::Rng;
use rand_distr::{Distribution, Gamma};
use serde::{Deserialize, Serialize};

use super::special::ln_gamma;
use crate::error::PriorError;

/// Inverse-gamma distribution with shape α and scale β
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InverseGamma {
    /// Shape α
    pub shape: f64,
    /// Scale β
    pub scale: f64,
}

impl InverseGamma {
    /// Build and validate; `name` labels the error
    pub fn new(name: &str, shape: f64, scale: f64) -> Result<Self, PriorError> {
        let prior = Self { shape, scale };
        prior.validate(name)?;
        Ok(prior)
    }

    /// Check hyper-parameters
    pub fn validate(&self, name: &str) -> Result<(), PriorError> {
        for value in [self.shape, self.scale] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PriorError::InvalidScale {
                    name: name.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Log density; −∞ for x ≤ 0
    pub fn ln_pdf(&self, x: f64) -> f64 {
        if x <= 0.0 || !x.is_finite() {
            return f64::NEG_INFINITY;
        }
        let (a, b) = (self.shape, self.scale);
        a * b.ln() - ln_gamma(a) - (a + 1.0) * x.ln() - b / x
    }

    /// d ln p / dx for x > 0
    pub fn grad_ln_pdf(&self, x: f64) -> f64 {
        -(self.shape + 1.0) / x + self.scale / (x * x)
    }

    /// Reciprocal of a gamma draw
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, PriorError> {
        let gamma = Gamma::new(self.shape, 1.0 / self.scale).map_err(|_| PriorError::InvalidScale {
            name: "inverse_gamma".into(),
            value: self.shape,
        })?;
        Ok(1.0 / gamma.sample(rng))
    }

    /// Support `(0, ∞)`
    pub fn support(&self) -> (f64, f64) {
        (0.0, f64::INFINITY)
    }

    /// Mean β/(α−1), infinite when α ≤ 1
    pub fn mean(&self) -> f64 {
        if self.shape > 1.0 {
            self.scale / (self.shape - 1.0)
        } else {
            f64::INFINITY
        }
    }

    /// Mode β/(α+1)
    pub fn mode(&self) -> f64 {
        self.scale / (self.shape + 1.0)
    }
}
