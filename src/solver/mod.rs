//! Solver Module: Adaptive Integration of Parameterized ODEs
//!
//! Turns a [`VectorField`](crate::systems::VectorField) plus initial state,
//! span and parameters into trajectories:
//!
//! - `problem.rs`: [`OdeProblem`] and [`SolverOptions`]
//! - `dopri5.rs`: Dormand-Prince 5(4) stepping with PI step control
//! - `solution.rs`: discrete outputs and the dense Hermite interpolant
//! - `solve.rs`: entry points, including forward sensitivities
//!
//! Integration failures (non-finite states, step size underflow, exhausted
//! step budget) surface as [`IntegrationError`](crate::error::IntegrationError);
//! invalid states are never returned.

mod problem;
mod dopri5;
mod solution;
mod solve;

pub use problem::{OdeProblem, SolverOptions};
pub use dopri5::SolverStats;
pub use solution::{Solution, SensitivitySolution};
