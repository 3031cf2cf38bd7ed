//! Observation Grid: Times at Which the Trajectory Is Measured

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Strictly increasing observation times
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationTimes {
    times: Vec<f64>,
}

impl ObservationTimes {
    /// `n` equally spaced points on `[start, end]`, both ends included
    pub fn uniform(start: f64, end: f64, n: usize) -> Result<Self, DataError> {
        if n < 2 {
            return Err(DataError::InvalidGrid(format!("need at least 2 points, got {}", n)));
        }
        if !start.is_finite() || !end.is_finite() || end <= start {
            return Err(DataError::InvalidGrid(format!(
                "empty interval [{}, {}]",
                start, end
            )));
        }

        let step = (end - start) / (n - 1) as f64;
        let mut times: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
        // Pin the last point so floating error cannot push it past `end`
        times[n - 1] = end;
        Ok(Self { times })
    }

    /// 10 points at t = 1, 2, …, 10
    pub fn benchmark() -> Self {
        Self {
            times: (1..=10).map(f64::from).collect(),
        }
    }

    /// Build from explicit times, which must be finite and strictly increasing
    pub fn from_vec(times: Vec<f64>) -> Result<Self, DataError> {
        if times.is_empty() {
            return Err(DataError::InvalidGrid("no observation times".into()));
        }
        if times.iter().any(|t| !t.is_finite()) {
            return Err(DataError::InvalidGrid("non-finite observation time".into()));
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(DataError::InvalidGrid("times must be strictly increasing".into()));
        }
        Ok(Self { times })
    }

    /// Times as a slice
    pub fn as_slice(&self) -> &[f64] {
        &self.times
    }

    /// Number of observation times
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the grid is empty (never true for a constructed grid)
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// First time
    pub fn first(&self) -> f64 {
        self.times[0]
    }

    /// Last time
    pub fn last(&self) -> f64 {
        self.times[self.times.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benchmark_grid() {
        let times = ObservationTimes::benchmark();
        assert_eq!(times.len(), 10);
        assert_eq!(times.first(), 1.0);
        assert_eq!(times.last(), 10.0);
        for w in times.as_slice().windows(2) {
            assert!(w[1] > w[0], "times must be strictly increasing");
            assert!((w[1] - w[0] - 1.0).abs() < 1e-12, "spacing must be 1.0");
        }
    }

    #[test]
    fn test_uniform_matches_benchmark() {
        let uniform = ObservationTimes::uniform(1.0, 10.0, 10).unwrap();
        assert_eq!(uniform, ObservationTimes::benchmark());
    }

    #[test]
    fn test_invalid_grids() {
        assert!(ObservationTimes::uniform(1.0, 10.0, 1).is_err());
        assert!(ObservationTimes::uniform(5.0, 1.0, 10).is_err());
        assert!(ObservationTimes::from_vec(vec![1.0, 1.0]).is_err());
        assert!(ObservationTimes::from_vec(vec![]).is_err());
        assert!(ObservationTimes::from_vec(vec![0.5, f64::NAN]).is_err());
    }
}
