//! Systems Module: Dynamical Models for Parameter Estimation
//!
//! Implements the vector fields that the solver integrates and the
//! inference back-ends fit:
//!
//! - **FitzHugh-Nagumo**: Excitable neuron, 2 states, 4 parameters
//!
//! New models only need to implement [`VectorField`].

mod traits;
mod fitzhugh_nagumo;

pub use traits::VectorField;
pub use fitzhugh_nagumo::{
    FitzHughNagumo,
    FhnParams,
    FhnState,
    CUBIC_COEFFICIENT,
    FHN_INITIAL_STATE,
    FHN_PARAM_NAMES,
    FHN_TIME_SPAN,
};
