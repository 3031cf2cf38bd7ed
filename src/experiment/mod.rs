//! Experiment Module: Data, Back-End Runs and Calibration
//!
//! - `config.rs`: every constant of a run in one serializable struct
//! - `runner.rs`: dataset generation and sequential back-end runs
//! - `calibration.rs`: repeated trials with fresh seeds

mod config;
mod runner;
mod calibration;

pub use config::BenchmarkConfig;
pub use runner::{BackendOutcome, Experiment, ExperimentReport};
pub use calibration::{run_calibration, CalibrationReport, TrialResult, CALIBRATION_SD_MULTIPLE};
