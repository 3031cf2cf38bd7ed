//! Vector Field Traits: Standardized API for Parameterized ODE Models
//!
//! Every model that the solver integrates and the samplers fit implements
//! [`VectorField`]. This enables:
//!
//! - A single adaptive solver for all models
//! - Forward-sensitivity gradients for Hamiltonian samplers
//! - Automatic construction of ODE Bayesian models
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     VectorField Trait                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  + eval()             - dx/dt = f(t, x; θ)                  │
//! │  + jacobian_state()   - ∂f/∂x   (n × n, row-major)          │
//! │  + jacobian_params()  - ∂f/∂θ   (n × p, row-major)          │
//! │  + state_dim()        - n                                   │
//! │  + param_names()      - θ labels, length p                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The Jacobians default to central finite differences; models with a
//! closed form should override them.

/// Relative step for finite-difference Jacobians
const FD_REL_STEP: f64 = 1e-7;

/// A parameterized right-hand side `dx/dt = f(t, x; θ)`
pub trait VectorField: Send + Sync {
    /// Stable identifier, used across process boundaries
    fn model_id(&self) -> &'static str;

    /// Dimension of the state vector
    fn state_dim(&self) -> usize;

    /// Names of the structural parameters, in vector order
    fn param_names(&self) -> &'static [&'static str];

    /// Number of structural parameters
    fn param_dim(&self) -> usize {
        self.param_names().len()
    }

    /// Names of the state components
    fn state_names(&self) -> &'static [&'static str];

    /// Evaluate the derivative into `out`
    fn eval(&self, t: f64, state: &[f64], params: &[f64], out: &mut [f64]);

    /// Jacobian ∂f/∂x, row-major `n × n`
    fn jacobian_state(&self, t: f64, state: &[f64], params: &[f64], out: &mut [f64]) {
        let n = self.state_dim();
        let mut x = state.to_vec();
        let mut f_plus = vec![0.0; n];
        let mut f_minus = vec![0.0; n];

        for j in 0..n {
            let h = FD_REL_STEP * state[j].abs().max(1.0);
            x[j] = state[j] + h;
            self.eval(t, &x, params, &mut f_plus);
            x[j] = state[j] - h;
            self.eval(t, &x, params, &mut f_minus);
            x[j] = state[j];

            for i in 0..n {
                out[i * n + j] = (f_plus[i] - f_minus[i]) / (2.0 * h);
            }
        }
    }

    /// Jacobian ∂f/∂θ, row-major `n × p`
    fn jacobian_params(&self, t: f64, state: &[f64], params: &[f64], out: &mut [f64]) {
        let n = self.state_dim();
        let p = params.len();
        let mut theta = params.to_vec();
        let mut f_plus = vec![0.0; n];
        let mut f_minus = vec![0.0; n];

        for j in 0..p {
            let h = FD_REL_STEP * params[j].abs().max(1.0);
            theta[j] = params[j] + h;
            self.eval(t, state, &theta, &mut f_plus);
            theta[j] = params[j] - h;
            self.eval(t, state, &theta, &mut f_minus);
            theta[j] = params[j];

            for i in 0..n {
                out[i * p + j] = (f_plus[i] - f_minus[i]) / (2.0 * h);
            }
        }
    }
}

impl<F: VectorField + ?Sized> VectorField for &F {
    fn model_id(&self) -> &'static str {
        (**self).model_id()
    }

    fn state_dim(&self) -> usize {
        (**self).state_dim()
    }

    fn param_names(&self) -> &'static [&'static str] {
        (**self).param_names()
    }

    fn state_names(&self) -> &'static [&'static str] {
        (**self).state_names()
    }

    fn eval(&self, t: f64, state: &[f64], params: &[f64], out: &mut [f64]) {
        (**self).eval(t, state, params, out)
    }

    fn jacobian_state(&self, t: f64, state: &[f64], params: &[f64], out: &mut [f64]) {
        (**self).jacobian_state(t, state, params, out)
    }

    fn jacobian_params(&self, t: f64, state: &[f64], params: &[f64], out: &mut [f64]) {
        (**self).jacobian_params(t, state, params, out)
    }
}
