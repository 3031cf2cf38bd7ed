//! Error Types: Failure Taxonomy of the Benchmark
//!
//! Each layer owns its own error enum; [`BenchError`] collects them for
//! callers that drive the whole experiment.
//!
//! - [`IntegrationError`]: the solver could not produce valid states
//! - [`PriorError`]: a prior was configured with invalid hyper-parameters
//! - [`DataError`]: synthetic data could not be generated
//! - [`InferenceError`]: a sampler or back-end failed to produce draws
//!
//! Sampler non-convergence is deliberately absent: it is reported through
//! diagnostics, not through `Err`.

use thiserror::Error;

/// Result alias for whole-experiment operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Failure of the adaptive ODE solver
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    /// State or derivative became NaN/inf
    #[error("non-finite state encountered at t = {t}")]
    NonFinite {
        /// Time of the last accepted step
        t: f64,
    },

    /// Controller shrank the step below the representable minimum
    #[error("step size {h:e} too small at t = {t}")]
    StepSizeTooSmall {
        /// Time of the last accepted step
        t: f64,
        /// Rejected step size
        h: f64,
    },

    /// Step budget exhausted before reaching the end of the span
    #[error("exceeded {max_steps} steps before t = {t_end} (stopped at t = {t})")]
    MaxStepsExceeded {
        /// Configured budget
        max_steps: usize,
        /// Time reached
        t: f64,
        /// Requested end time
        t_end: f64,
    },

    /// Requested output time lies outside the integration span
    #[error("output time {t} outside span [{t0}, {t1}]")]
    OutOfSpan {
        /// Requested time
        t: f64,
        /// Span start
        t0: f64,
        /// Span end
        t1: f64,
    },

    /// Output times are not sorted ascending
    #[error("output times must be non-decreasing")]
    UnsortedOutputTimes,

    /// Initial state or parameter vector has the wrong length
    #[error("dimension mismatch: expected {expected}, got {actual} ({what})")]
    DimensionMismatch {
        /// What was being checked
        what: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },
}

/// Invalid prior hyper-parameters, raised when the prior set is built
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PriorError {
    /// Truncation interval is empty or not finite
    #[error("invalid truncation bounds for '{name}': lower = {lower}, upper = {upper}")]
    InvalidBounds {
        /// Parameter name
        name: String,
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },

    /// Scale parameter is not a positive finite number
    #[error("invalid scale for '{name}': {value} (must be finite and > 0)")]
    InvalidScale {
        /// Parameter name
        name: String,
        /// Offending value
        value: f64,
    },

    /// Location parameter is not finite
    #[error("invalid location for '{name}': {value}")]
    InvalidLocation {
        /// Parameter name
        name: String,
        /// Offending value
        value: f64,
    },

    /// Two priors share the same parameter name
    #[error("duplicate prior for parameter '{name}'")]
    Duplicate {
        /// Parameter name
        name: String,
    },
}

/// Synthetic data generation failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    /// Noise standard deviation must be finite and positive
    #[error("invalid noise standard deviation: {0}")]
    InvalidNoise(f64),

    /// Observation grid cannot be built
    #[error("invalid observation grid: {0}")]
    InvalidGrid(String),

    /// Underlying trajectory could not be computed
    #[error(transparent)]
    Integration(#[from] IntegrationError),
}

/// Sampler or back-end failure
#[derive(Debug, Error)]
pub enum InferenceError {
    /// ODE solve failed at a proposed parameter vector
    #[error("integration failed during inference: {0}")]
    Integration(#[from] IntegrationError),

    /// Log density is not finite at the initial point
    #[error("log density is not finite at the initial point ({0})")]
    BadInitialPoint(String),

    /// Inconsistent model / dataset / config
    #[error("invalid inference problem: {0}")]
    InvalidProblem(String),

    /// Sampler configuration rejected
    #[error("invalid sampler configuration: {0}")]
    InvalidConfig(String),

    /// Invalid prior passed through the problem
    #[error(transparent)]
    Prior(#[from] PriorError),

    /// Request/response could not be (de)serialized
    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    /// External runtime could not be spawned or talked to
    #[error("external runtime error: {0}")]
    Transport(String),

    /// External runtime reported a failure
    #[error("external runtime failed: {0}")]
    Remote(String),
}

impl InferenceError {
    /// Create an invalid problem error
    pub fn invalid_problem(reason: impl Into<String>) -> Self {
        Self::InvalidProblem(reason.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Create a transport error
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport(reason.into())
    }
}

/// Top-level error for experiment setup and reporting
#[derive(Debug, Error)]
pub enum BenchError {
    /// Solver failure while building the reference trajectory
    #[error(transparent)]
    Integration(#[from] IntegrationError),

    /// Prior misconfiguration
    #[error(transparent)]
    Prior(#[from] PriorError),

    /// Synthetic data failure
    #[error(transparent)]
    Data(#[from] DataError),

    /// Inference failure
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// Report could not be written
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Report could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = IntegrationError::NonFinite { t: 2.5 };
        assert_eq!(err.to_string(), "non-finite state encountered at t = 2.5");

        let err = PriorError::InvalidBounds {
            name: "a".into(),
            lower: 1.0,
            upper: 0.0,
        };
        assert!(err.to_string().contains("'a'"));
    }

    #[test]
    fn test_error_conversion_chain() {
        let inner = IntegrationError::NonFinite { t: 0.0 };
        let inference: InferenceError = inner.clone().into();
        let bench: BenchError = inference.into();
        assert!(matches!(
            bench,
            BenchError::Inference(InferenceError::Integration(_))
        ));

        let data: DataError = inner.into();
        assert!(matches!(data, DataError::Integration(_)));
    }
}
