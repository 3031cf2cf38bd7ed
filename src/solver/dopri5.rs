//! Dormand-Prince 5(4): Adaptive Explicit Runge-Kutta Integration
//!
//! Seven-stage embedded pair with the first-same-as-last property. The
//! fifth-order solution is propagated; the embedded fourth-order solution
//! only feeds the error estimate
//!
//!   err = sqrt( (1/n) Σᵢ (eᵢ / (atol + rtol·max(|y₀ᵢ|, |y₁ᵢ|)))² )
//!
//! and a step is accepted when err ≤ 1. Step sizes follow a PI controller
//!
//!   h_new = h · safety · err^(-α) · err_prev^β
//!
//! with α = 0.17, β = 0.04 (Hairer's dopri5 defaults).
//!
//! Requested output times are hit exactly: the step is shortened to land on
//! the next output time instead of interpolating.
//!
//! ## References
//!
//! - Dormand, J. R. & Prince, P. J. (1980). A family of embedded Runge-Kutta
//!   formulae. J. Comp. Appl. Math. 6(1), 19-26.
//! - Hairer, Nørsett & Wanner, "Solving Ordinary Differential Equations I"

use tracing::debug;

use super::problem::SolverOptions;
use crate::error::IntegrationError;

const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const A71: f64 = 35.0 / 384.0;
const A73: f64 = 500.0 / 1113.0;
const A74: f64 = 125.0 / 192.0;
const A75: f64 = -2187.0 / 6784.0;
const A76: f64 = 11.0 / 84.0;

// b - b*, fifth minus fourth order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const ALPHA: f64 = 0.17;
const BETA: f64 = 0.04;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;

/// Counters collected during one integration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    /// Accepted steps
    pub n_accepted: usize,
    /// Rejected steps
    pub n_rejected: usize,
    /// Right-hand side evaluations
    pub n_evals: usize,
}

/// Raw integrator output before it is shaped into a solution type
#[derive(Debug, Clone)]
pub(crate) struct RawOutput {
    /// States at the requested output times
    pub saved: Vec<Vec<f64>>,
    /// Accepted step knots (t, y, f) for Hermite interpolation
    pub knots: Option<Knots>,
    pub stats: SolverStats,
}

/// Accepted-step history
#[derive(Debug, Clone, Default)]
pub(crate) struct Knots {
    pub t: Vec<f64>,
    pub y: Vec<Vec<f64>>,
    pub f: Vec<Vec<f64>>,
}

impl Knots {
    fn push(&mut self, t: f64, y: &[f64], f: &[f64]) {
        self.t.push(t);
        self.y.push(y.to_vec());
        self.f.push(f.to_vec());
    }

    /// Cubic Hermite interpolation between the bracketing knots
    pub fn interpolate(&self, t: f64, out: &mut [f64]) {
        let last = self.t.len() - 1;
        if t >= self.t[last] {
            out.copy_from_slice(&self.y[last]);
            return;
        }
        let i = match self.t.partition_point(|&tk| tk <= t) {
            0 => 0,
            k => k - 1,
        };
        let (t0, t1) = (self.t[i], self.t[i + 1]);
        let h = t1 - t0;
        let s = (t - t0) / h;
        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        for (k, o) in out.iter_mut().enumerate() {
            *o = h00 * self.y[i][k]
                + h10 * h * self.f[i][k]
                + h01 * self.y[i + 1][k]
                + h11 * h * self.f[i + 1][k];
        }
    }
}

fn all_finite(x: &[f64]) -> bool {
    x.iter().all(|v| v.is_finite())
}

/// Scaled RMS norm used by the initial step heuristic
fn scaled_norm(x: &[f64], scale_ref: &[f64], opts: &SolverOptions) -> f64 {
    let n = x.len() as f64;
    let sum: f64 = x
        .iter()
        .zip(scale_ref)
        .map(|(&xi, &yi)| {
            let sc = opts.atol + opts.rtol * yi.abs();
            (xi / sc).powi(2)
        })
        .sum();
    (sum / n).sqrt()
}

/// Hairer's starting step heuristic
fn initial_step<R>(
    rhs: &mut R,
    t0: f64,
    y0: &[f64],
    f0: &[f64],
    span: f64,
    opts: &SolverOptions,
    stats: &mut SolverStats,
) -> f64
where
    R: FnMut(f64, &[f64], &mut [f64]),
{
    let d0 = scaled_norm(y0, y0, opts);
    let d1 = scaled_norm(f0, y0, opts);
    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };
    let h0 = h0.min(span);

    let y1: Vec<f64> = y0.iter().zip(f0).map(|(&y, &f)| y + h0 * f).collect();
    let mut f1 = vec![0.0; y0.len()];
    rhs(t0 + h0, &y1, &mut f1);
    stats.n_evals += 1;

    let df: Vec<f64> = f1.iter().zip(f0).map(|(&a, &b)| (a - b) / h0).collect();
    let d2 = scaled_norm(&df, y0, opts);

    let h1 = if d1.max(d2) <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(1.0 / 5.0)
    };

    (100.0 * h0).min(h1).min(span)
}

/// Integrate `rhs` from `t_span.0` to `t_span.1`.
///
/// `saveat` must be sorted and inside the span; the returned `saved`
/// vector has one state per requested time. With `dense` set, every
/// accepted step is recorded for interpolation.
pub(crate) fn integrate<R>(
    mut rhs: R,
    y0: &[f64],
    t_span: (f64, f64),
    saveat: &[f64],
    dense: bool,
    opts: &SolverOptions,
) -> Result<RawOutput, IntegrationError>
where
    R: FnMut(f64, &[f64], &mut [f64]),
{
    let (t0, t_end) = t_span;
    for w in saveat.windows(2) {
        if w[1] < w[0] {
            return Err(IntegrationError::UnsortedOutputTimes);
        }
    }
    if let Some(&t) = saveat.iter().find(|&&t| t < t0 || t > t_end || !t.is_finite()) {
        return Err(IntegrationError::OutOfSpan { t, t0, t1: t_end });
    }

    let n = y0.len();
    let mut stats = SolverStats::default();
    let mut saved = Vec::with_capacity(saveat.len());
    let mut knots = dense.then(Knots::default);

    let mut t = t0;
    let mut y = y0.to_vec();
    let mut f = vec![0.0; n];
    rhs(t, &y, &mut f);
    stats.n_evals += 1;
    if !all_finite(&y) || !all_finite(&f) {
        return Err(IntegrationError::NonFinite { t });
    }
    if let Some(k) = knots.as_mut() {
        k.push(t, &y, &f);
    }

    let mut next_out = 0;
    while next_out < saveat.len() && saveat[next_out] <= t {
        saved.push(y.clone());
        next_out += 1;
    }

    let span = t_end - t0;
    let max_step = opts.max_step.unwrap_or(span).min(span);
    let mut h = match opts.initial_step {
        Some(h) => h.min(max_step),
        None => initial_step(&mut rhs, t, &y, &f, span, opts, &mut stats).min(max_step),
    };

    let mut k2 = vec![0.0; n];
    let mut k3 = vec![0.0; n];
    let mut k4 = vec![0.0; n];
    let mut k5 = vec![0.0; n];
    let mut k6 = vec![0.0; n];
    let mut k7 = vec![0.0; n];
    let mut y_stage = vec![0.0; n];
    let mut y_new = vec![0.0; n];

    let mut err_prev: f64 = 1e-4;
    let mut rejected_last = false;
    let mut attempts = 0usize;

    while t < t_end {
        if attempts >= opts.max_steps {
            debug!(t, t_end, max_steps = opts.max_steps, "solver step budget exhausted");
            return Err(IntegrationError::MaxStepsExceeded {
                max_steps: opts.max_steps,
                t,
                t_end,
            });
        }
        attempts += 1;

        let h_min = 16.0 * f64::EPSILON * t.abs().max(1.0);
        if h < h_min {
            debug!(t, h, "solver step size underflow");
            return Err(IntegrationError::StepSizeTooSmall { t, h });
        }

        // Land exactly on the next output time or the end of the span
        let target = if next_out < saveat.len() {
            saveat[next_out].min(t_end)
        } else {
            t_end
        };
        let mut landing = false;
        if t + h * (1.0 + 1e-10) >= target {
            h = target - t;
            landing = true;
        }

        for i in 0..n {
            y_stage[i] = y[i] + h * A21 * f[i];
        }
        rhs(t + C2 * h, &y_stage, &mut k2);
        for i in 0..n {
            y_stage[i] = y[i] + h * (A31 * f[i] + A32 * k2[i]);
        }
        rhs(t + C3 * h, &y_stage, &mut k3);
        for i in 0..n {
            y_stage[i] = y[i] + h * (A41 * f[i] + A42 * k2[i] + A43 * k3[i]);
        }
        rhs(t + C4 * h, &y_stage, &mut k4);
        for i in 0..n {
            y_stage[i] = y[i] + h * (A51 * f[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
        }
        rhs(t + C5 * h, &y_stage, &mut k5);
        for i in 0..n {
            y_stage[i] = y[i]
                + h * (A61 * f[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]);
        }
        rhs(t + h, &y_stage, &mut k6);
        for i in 0..n {
            y_new[i] = y[i]
                + h * (A71 * f[i] + A73 * k3[i] + A74 * k4[i] + A75 * k5[i] + A76 * k6[i]);
        }
        rhs(t + h, &y_new, &mut k7);
        stats.n_evals += 6;

        let mut err_sum = 0.0;
        for i in 0..n {
            let e = h
                * (E1 * f[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i] + E7 * k7[i]);
            let sc = opts.atol + opts.rtol * y[i].abs().max(y_new[i].abs());
            err_sum += (e / sc).powi(2);
        }
        let err = (err_sum / n as f64).sqrt();

        if !err.is_finite() || !all_finite(&y_new) || !all_finite(&k7) {
            // Shrink and retry; a persistent blow-up ends in NonFinite
            stats.n_rejected += 1;
            rejected_last = true;
            h *= MIN_FACTOR;
            if h < h_min {
                debug!(t, "non-finite state during integration");
                return Err(IntegrationError::NonFinite { t });
            }
            continue;
        }

        if err <= 1.0 {
            t = if landing { target } else { t + h };
            std::mem::swap(&mut y, &mut y_new);
            std::mem::swap(&mut f, &mut k7);
            stats.n_accepted += 1;

            if let Some(k) = knots.as_mut() {
                k.push(t, &y, &f);
            }
            while next_out < saveat.len() && saveat[next_out] <= t {
                saved.push(y.clone());
                next_out += 1;
            }

            let err_c = err.max(1e-10);
            let mut factor = SAFETY * err_c.powf(-ALPHA) * err_prev.powf(BETA);
            factor = factor.clamp(MIN_FACTOR, MAX_FACTOR);
            if rejected_last {
                factor = factor.min(1.0);
            }
            h = (h * factor).min(max_step);
            err_prev = err_c;
            rejected_last = false;
        } else {
            stats.n_rejected += 1;
            rejected_last = true;
            let factor = (SAFETY * err.powf(-0.2)).max(MIN_FACTOR);
            h *= factor;
        }
    }

    Ok(RawOutput {
        saved,
        knots,
        stats,
    })
}
