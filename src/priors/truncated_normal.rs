//! Truncated Normal Prior
//!
//! N(μ, σ²) restricted to [lower, upper] and renormalized:
//!
//!   p(x) = φ((x−μ)/σ) / (σ·Z),   Z = Φ(β) − Φ(α)
//!
//! with α = (lower−μ)/σ, β = (upper−μ)/σ.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::special::{normal_cdf, normal_pdf, normal_quantile, LN_SQRT_2PI};
use crate::error::PriorError;

/// Mass below which inverse-CDF sampling is abandoned for rejection
const MIN_MASS: f64 = 1e-12;

/// Normal distribution truncated to a finite interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruncatedNormal {
    /// Location of the untruncated normal
    pub mu: f64,
    /// Scale of the untruncated normal
    pub sigma: f64,
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
}

impl TruncatedNormal {
    /// Build and validate; `name` labels the error
    pub fn new(name: &str, mu: f64, sigma: f64, lower: f64, upper: f64) -> Result<Self, PriorError> {
        let prior = Self { mu, sigma, lower, upper };
        prior.validate(name)?;
        Ok(prior)
    }

    /// Check hyper-parameters (useful after deserialization)
    pub fn validate(&self, name: &str) -> Result<(), PriorError> {
        if !self.mu.is_finite() {
            return Err(PriorError::InvalidLocation {
                name: name.to_string(),
                value: self.mu,
            });
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(PriorError::InvalidScale {
                name: name.to_string(),
                value: self.sigma,
            });
        }
        if !self.lower.is_finite() || !self.upper.is_finite() || self.lower >= self.upper {
            return Err(PriorError::InvalidBounds {
                name: name.to_string(),
                lower: self.lower,
                upper: self.upper,
            });
        }
        Ok(())
    }

    fn standardized_bounds(&self) -> (f64, f64) {
        (
            (self.lower - self.mu) / self.sigma,
            (self.upper - self.mu) / self.sigma,
        )
    }

    /// Normalizing mass Z = Φ(β) − Φ(α)
    pub fn mass(&self) -> f64 {
        let (alpha, beta) = self.standardized_bounds();
        // Work in the lower tail where Φ keeps its relative accuracy
        if alpha > 0.0 {
            normal_cdf(-alpha) - normal_cdf(-beta)
        } else {
            normal_cdf(beta) - normal_cdf(alpha)
        }
    }

    /// Log density; −∞ outside the bounds
    pub fn ln_pdf(&self, x: f64) -> f64 {
        if !(self.lower..=self.upper).contains(&x) {
            return f64::NEG_INFINITY;
        }
        let z = (x - self.mu) / self.sigma;
        -0.5 * z * z - LN_SQRT_2PI - self.sigma.ln() - self.mass().ln()
    }

    /// d ln p / dx inside the bounds
    pub fn grad_ln_pdf(&self, x: f64) -> f64 {
        -(x - self.mu) / (self.sigma * self.sigma)
    }

    /// Draw by inverse CDF; always lands in `[lower, upper]`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let (alpha, beta) = self.standardized_bounds();
        if self.mass() < MIN_MASS {
            return self.sample_rejection(rng);
        }

        let u: f64 = rng.random();
        let z = if alpha > 0.0 {
            // Mirror into the lower tail
            let lo = normal_cdf(-beta);
            let hi = normal_cdf(-alpha);
            -normal_quantile(lo + u * (hi - lo))
        } else {
            let lo = normal_cdf(alpha);
            let hi = normal_cdf(beta);
            normal_quantile(lo + u * (hi - lo))
        };
        (self.mu + self.sigma * z).clamp(self.lower, self.upper)
    }

    /// Uniform proposals on the interval, accepted with φ(z)/φ(z*) where z*
    /// is the standardized point of the interval closest to the mode
    fn sample_rejection<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let (alpha, beta) = self.standardized_bounds();
        let z_star = 0.0f64.clamp(alpha, beta);
        loop {
            let z = alpha + (beta - alpha) * rng.random::<f64>();
            let accept = (-0.5 * (z * z - z_star * z_star)).exp();
            if rng.random::<f64>() < accept {
                return (self.mu + self.sigma * z).clamp(self.lower, self.upper);
            }
        }
    }

    /// Support `[lower, upper]`
    pub fn support(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    /// Mean of the truncated distribution
    pub fn mean(&self) -> f64 {
        let (alpha, beta) = self.standardized_bounds();
        self.mu + self.sigma * (normal_pdf(alpha) - normal_pdf(beta)) / self.mass()
    }
}
