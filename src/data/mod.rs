//! Data Module: Observation Grid and Synthetic Noisy Dataset
//!
//! The dataset is computed once per run and then treated as read-only, so
//! every inference back-end is compared on identical observations.

mod observation;
mod synthetic;

pub use observation::ObservationTimes;
pub use synthetic::{add_gaussian_noise, SyntheticDataset, BENCHMARK_NOISE_STD};
