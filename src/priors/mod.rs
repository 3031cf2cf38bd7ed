//! Priors Module: Distributions over Model Parameters
//!
//! - `truncated_normal.rs`: bounded priors on the structural parameters
//! - `inverse_gamma.rs`: prior on the observation-noise variance
//! - `prior_set.rs`: named, validated collections of priors
//!
//! Hyper-parameters are validated when the set is built; a bad prior is a
//! [`PriorError`](crate::error::PriorError) before any sampling starts.

mod special;
mod truncated_normal;
mod inverse_gamma;
mod prior_set;

pub use truncated_normal::TruncatedNormal;
pub use inverse_gamma::InverseGamma;
pub use prior_set::{NamedPrior, Prior, PriorSet, NOISE_PARAM_NAME};
