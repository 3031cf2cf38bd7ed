//! Prior Set: Named Priors over Structural and Noise Parameters

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::inverse_gamma::InverseGamma;
use super::truncated_normal::TruncatedNormal;
use crate::error::PriorError;

/// Name of the observation-noise variance parameter
pub const NOISE_PARAM_NAME: &str = "sigma2";

/// One-dimensional prior distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prior {
    /// Normal restricted to a finite interval
    TruncatedNormal(TruncatedNormal),
    /// Inverse-gamma on (0, ∞)
    InverseGamma(InverseGamma),
}

impl Prior {
    /// Check hyper-parameters
    pub fn validate(&self, name: &str) -> Result<(), PriorError> {
        match self {
            Prior::TruncatedNormal(p) => p.validate(name),
            Prior::InverseGamma(p) => p.validate(name),
        }
    }

    /// Log density
    pub fn ln_pdf(&self, x: f64) -> f64 {
        match self {
            Prior::TruncatedNormal(p) => p.ln_pdf(x),
            Prior::InverseGamma(p) => p.ln_pdf(x),
        }
    }

    /// d ln p / dx
    pub fn grad_ln_pdf(&self, x: f64) -> f64 {
        match self {
            Prior::TruncatedNormal(p) => p.grad_ln_pdf(x),
            Prior::InverseGamma(p) => p.grad_ln_pdf(x),
        }
    }

    /// One draw
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, PriorError> {
        match self {
            Prior::TruncatedNormal(p) => Ok(p.sample(rng)),
            Prior::InverseGamma(p) => p.sample(rng),
        }
    }

    /// `(lower, upper)`, possibly infinite above
    pub fn support(&self) -> (f64, f64) {
        match self {
            Prior::TruncatedNormal(p) => p.support(),
            Prior::InverseGamma(p) => p.support(),
        }
    }

    /// Prior mean
    pub fn mean(&self) -> f64 {
        match self {
            Prior::TruncatedNormal(p) => p.mean(),
            Prior::InverseGamma(p) => p.mean(),
        }
    }

    /// A point well inside the support, used to start chains
    pub fn central_value(&self) -> f64 {
        match self {
            Prior::TruncatedNormal(p) => p.mean(),
            Prior::InverseGamma(p) => p.mode(),
        }
    }
}

/// A prior bound to a parameter name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPrior {
    /// Parameter name
    pub name: String,
    /// Distribution
    pub prior: Prior,
}

/// Priors over the structural parameters, in vector-field order, plus an
/// optional prior over the noise variance σ²
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorSet {
    structural: Vec<NamedPrior>,
    noise: Option<NamedPrior>,
}

impl PriorSet {
    /// Validate every prior and reject duplicate names
    pub fn new(structural: Vec<NamedPrior>, noise: Option<InverseGamma>) -> Result<Self, PriorError> {
        let noise = noise.map(|p| NamedPrior {
            name: NOISE_PARAM_NAME.to_string(),
            prior: Prior::InverseGamma(p),
        });
        let set = Self { structural, noise };
        set.validate()?;
        Ok(set)
    }

    /// Re-run validation, e.g. after deserialization
    pub fn validate(&self) -> Result<(), PriorError> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.len());
        for named in self.iter() {
            named.prior.validate(&named.name)?;
            if seen.contains(&named.name.as_str()) {
                return Err(PriorError::Duplicate {
                    name: named.name.clone(),
                });
            }
            seen.push(&named.name);
        }
        Ok(())
    }

    /// Truncated normals over (a, b, tau_inv, l) and σ² ~ InverseGamma(2, 3)
    pub fn benchmark() -> Result<Self, PriorError> {
        let tn = |name: &str, mu, sigma, lower, upper| -> Result<NamedPrior, PriorError> {
            Ok(NamedPrior {
                name: name.to_string(),
                prior: Prior::TruncatedNormal(TruncatedNormal::new(name, mu, sigma, lower, upper)?),
            })
        };
        Self::new(
            vec![
                tn("a", 1.0, 0.5, 0.0, 1.5)?,
                tn("b", 1.0, 0.5, 0.0, 1.5)?,
                tn("tau_inv", 0.0, 0.5, 0.0, 0.5)?,
                tn("l", 0.5, 0.5, 0.0, 1.0)?,
            ],
            Some(InverseGamma::new(NOISE_PARAM_NAME, 2.0, 3.0)?),
        )
    }

    /// Same structural priors with the noise variance fixed instead
    pub fn without_noise(&self) -> Self {
        Self {
            structural: self.structural.clone(),
            noise: None,
        }
    }

    /// Structural priors in vector-field order
    pub fn structural(&self) -> &[NamedPrior] {
        &self.structural
    }

    /// Noise-variance prior, if σ² is inferred
    pub fn noise(&self) -> Option<&NamedPrior> {
        self.noise.as_ref()
    }

    /// Structural then noise
    pub fn iter(&self) -> impl Iterator<Item = &NamedPrior> {
        self.structural.iter().chain(self.noise.iter())
    }

    /// Total number of priors
    pub fn len(&self) -> usize {
        self.structural.len() + usize::from(self.noise.is_some())
    }

    /// Whether the set holds no priors
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parameter names, structural then noise
    pub fn names(&self) -> Vec<String> {
        self.iter().map(|p| p.name.clone()).collect()
    }

    /// One joint draw, in the order of [`names`](Self::names)
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<f64>, PriorError> {
        self.iter().map(|p| p.prior.sample(rng)).collect()
    }
}
