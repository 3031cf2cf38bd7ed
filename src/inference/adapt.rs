//! Warmup Adaptation: Step Size and Diagonal Mass Matrix
//!
//! - Initial step size: double or halve ε until the one-step acceptance
//!   crosses 0.8 (Hoffman & Gelman, 2014, Alg. 4)
//! - Dual averaging of log ε toward the target acceptance
//! - Windowed estimation of the diagonal inverse mass matrix from the
//!   warmup draws, using an initial fast buffer, doubling slow windows and
//!   a terminal fast buffer

use rand::Rng;

use super::hmc::{HmcState, Leapfrog};
use super::model::LogDensity;
use super::posterior::Posterior;
use crate::error::InferenceError;

const INIT_BUFFER: usize = 75;
const TERM_BUFFER: usize = 50;
const BASE_WINDOW: usize = 25;
/// Below this many warmup iterations the mass matrix stays at identity
const MIN_MASS_WARMUP: usize = 20;

/// Heuristic initial step size at `q`
pub fn find_reasonable_step_size<M, R>(
    posterior: &Posterior<'_, M>,
    q: &[f64],
    inv_mass: &[f64],
    rng: &mut R,
) -> Result<f64, InferenceError>
where
    M: LogDensity + ?Sized,
    R: Rng + ?Sized,
{
    let mut eps = 1.0;
    let probe = Leapfrog::new(posterior, eps, inv_mass.to_vec());
    let mut start = probe.init_state(q.to_vec())?;
    start.resample_momentum(inv_mass, rng);
    let h0 = start.hamiltonian(inv_mass);
    if !h0.is_finite() {
        return Err(InferenceError::BadInitialPoint(format!(
            "non-finite potential at {:?}",
            q
        )));
    }

    let log_accept = |eps: f64| -> Result<f64, InferenceError> {
        let lf = Leapfrog::new(posterior, eps, inv_mass.to_vec());
        let mut s: HmcState = start.clone();
        lf.step(&mut s, 1)?;
        let h = s.hamiltonian(inv_mass);
        Ok(if h.is_finite() { h0 - h } else { f64::NEG_INFINITY })
    };

    let target = 0.8f64.ln();
    let direction = if log_accept(eps)? > target { 1.0 } else { -1.0 };
    for _ in 0..100 {
        let next = eps * 2.0f64.powf(direction);
        let la = log_accept(next)?;
        let crossed = if direction > 0.0 { la <= target } else { la > target };
        eps = next;
        if crossed || !(1e-10..=1e3).contains(&eps) {
            break;
        }
    }
    Ok(eps.clamp(1e-10, 1e3))
}

/// Nesterov dual averaging of log ε
#[derive(Debug, Clone)]
pub struct DualAveraging {
    target_accept: f64,
    mu: f64,
    log_eps: f64,
    log_eps_bar: f64,
    h_bar: f64,
    counter: f64,
}

impl DualAveraging {
    const GAMMA: f64 = 0.05;
    const T0: f64 = 10.0;
    const KAPPA: f64 = 0.75;

    /// Start from step size `eps`
    pub fn new(target_accept: f64, eps: f64) -> Self {
        let mut da = Self {
            target_accept,
            mu: 0.0,
            log_eps: 0.0,
            log_eps_bar: 0.0,
            h_bar: 0.0,
            counter: 0.0,
        };
        da.restart(eps);
        da
    }

    /// Forget the history and shrink toward 10·`eps`
    pub fn restart(&mut self, eps: f64) {
        self.mu = (10.0 * eps).ln();
        self.log_eps = eps.ln();
        self.log_eps_bar = 0.0;
        self.h_bar = 0.0;
        self.counter = 0.0;
    }

    /// Feed one acceptance statistic
    pub fn update(&mut self, accept_prob: f64) {
        let accept = if accept_prob.is_finite() { accept_prob.clamp(0.0, 1.0) } else { 0.0 };
        self.counter += 1.0;
        let eta = 1.0 / (self.counter + Self::T0);
        self.h_bar = (1.0 - eta) * self.h_bar + eta * (self.target_accept - accept);
        self.log_eps = self.mu - self.counter.sqrt() / Self::GAMMA * self.h_bar;
        let x = self.counter.powf(-Self::KAPPA);
        self.log_eps_bar = x * self.log_eps + (1.0 - x) * self.log_eps_bar;
    }

    /// Step size for the next iteration
    pub fn current(&self) -> f64 {
        self.log_eps.exp()
    }

    /// Averaged step size used after warmup
    pub fn averaged(&self) -> f64 {
        if self.counter == 0.0 {
            self.current()
        } else {
            self.log_eps_bar.exp()
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone)]
struct RunningVariance {
    n: usize,
    mean: Vec<f64>,
    m2: Vec<f64>,
}

impl RunningVariance {
    fn new(dim: usize) -> Self {
        Self {
            n: 0,
            mean: vec![0.0; dim],
            m2: vec![0.0; dim],
        }
    }

    fn push(&mut self, x: &[f64]) {
        self.n += 1;
        let n = self.n as f64;
        for i in 0..x.len() {
            let delta = x[i] - self.mean[i];
            self.mean[i] += delta / n;
            self.m2[i] += delta * (x[i] - self.mean[i]);
        }
    }

    /// Sample variance shrunk toward 1e-3 (Stan's regularization)
    fn regularized(&self) -> Vec<f64> {
        let n = self.n as f64;
        self.m2
            .iter()
            .map(|m2| {
                let var = m2 / (n - 1.0);
                (n / (n + 5.0)) * var + 1e-3 * (5.0 / (n + 5.0))
            })
            .collect()
    }
}

/// What the sampler must do after an adaptation update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptEvent {
    /// Nothing beyond using the new step size
    Continue,
    /// The mass matrix changed; re-run the step-size heuristic and call
    /// [`WindowedAdaptation::restart_step_size`]
    MassUpdated,
}

/// Step-size and mass-matrix adaptation over a fixed warmup length
#[derive(Debug, Clone)]
pub struct WindowedAdaptation {
    n_warmup: usize,
    step: DualAveraging,
    inv_mass: Vec<f64>,
    estimator: RunningVariance,
    window_ends: Vec<usize>,
    slow_start: usize,
}

impl WindowedAdaptation {
    /// Plan the windows for `n_warmup` iterations
    pub fn new(dim: usize, n_warmup: usize, target_accept: f64, init_eps: f64) -> Self {
        let (slow_start, window_ends) = plan_windows(n_warmup);
        Self {
            n_warmup,
            step: DualAveraging::new(target_accept, init_eps),
            inv_mass: vec![1.0; dim],
            estimator: RunningVariance::new(dim),
            window_ends,
            slow_start,
        }
    }

    /// Step size for the next warmup iteration
    pub fn step_size(&self) -> f64 {
        self.step.current()
    }

    /// Final step size once warmup is over
    pub fn adapted_step_size(&self) -> f64 {
        self.step.averaged()
    }

    /// Current diagonal of M⁻¹
    pub fn inv_mass_diag(&self) -> &[f64] {
        &self.inv_mass
    }

    /// Restart dual averaging after a mass-matrix update
    pub fn restart_step_size(&mut self, eps: f64) {
        self.step.restart(eps);
    }

    /// Record warmup iteration `iter` at position `q`
    pub fn update(&mut self, iter: usize, q: &[f64], accept_prob: f64) -> AdaptEvent {
        self.step.update(accept_prob);
        if iter >= self.n_warmup || iter < self.slow_start {
            return AdaptEvent::Continue;
        }
        if self.window_ends.is_empty() || iter > *self.window_ends.last().unwrap_or(&0) {
            return AdaptEvent::Continue;
        }

        self.estimator.push(q);
        if self.window_ends.contains(&iter) && self.estimator.n >= 3 {
            self.inv_mass = self.estimator.regularized();
            self.estimator = RunningVariance::new(self.inv_mass.len());
            return AdaptEvent::MassUpdated;
        }
        AdaptEvent::Continue
    }
}

/// Start of the first slow window and the last iteration of every slow
/// window
fn plan_windows(n_warmup: usize) -> (usize, Vec<usize>) {
    if n_warmup < MIN_MASS_WARMUP {
        return (n_warmup, Vec::new());
    }

    let (init, term, base) = if INIT_BUFFER + TERM_BUFFER + BASE_WINDOW > n_warmup {
        let init = (0.15 * n_warmup as f64) as usize;
        let term = (0.1 * n_warmup as f64) as usize;
        (init, term, n_warmup - init - term)
    } else {
        (INIT_BUFFER, TERM_BUFFER, BASE_WINDOW)
    };

    let slow_end = n_warmup - term;
    let mut ends = Vec::new();
    let mut start = init;
    let mut size = base;
    while start < slow_end {
        let mut end = start + size;
        // Fold a too-short trailing window into the current one
        if end + 2 * size > slow_end {
            end = slow_end;
        }
        ends.push(end - 1);
        start = end;
        size *= 2;
    }
    (init, ends)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::model::test_models::IsoNormal;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_windows_cover_slow_phase() {
        let (start, ends) = plan_windows(1000);
        assert_eq!(start, 75);
        assert_eq!(*ends.last().unwrap(), 1000 - 50 - 1);
        // 75..100, 100..150, 150..250, 250..450, 450..950
        assert_eq!(ends, vec![99, 149, 249, 449, 949]);
    }

    #[test]
    fn test_short_warmup_windows() {
        let (start, ends) = plan_windows(100);
        assert_eq!(start, 15);
        assert_eq!(ends, vec![89]);

        let (start, ends) = plan_windows(10);
        assert_eq!(start, 10);
        assert!(ends.is_empty());
    }

    #[test]
    fn test_dual_averaging_moves_toward_target() {
        let mut da = DualAveraging::new(0.8, 1.0);
        // Always accepting: step size must grow
        for _ in 0..50 {
            da.update(1.0);
        }
        assert!(da.averaged() > 1.0);

        let mut da = DualAveraging::new(0.8, 1.0);
        // Never accepting: step size must shrink
        for _ in 0..50 {
            da.update(0.0);
        }
        assert!(da.averaged() < 1.0);
    }

    #[test]
    fn test_reasonable_step_size_scales_with_target_width() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let narrow = IsoNormal {
            mu: vec![0.0],
            scale: vec![0.01],
        };
        let wide = IsoNormal {
            mu: vec![0.0],
            scale: vec![10.0],
        };
        let eps_narrow =
            find_reasonable_step_size(&Posterior::new(&narrow), &[0.0], &[1.0], &mut rng).unwrap();
        let eps_wide =
            find_reasonable_step_size(&Posterior::new(&wide), &[0.0], &[1.0], &mut rng).unwrap();
        assert!(eps_narrow < 0.1, "narrow eps {}", eps_narrow);
        assert!(eps_wide > 1.0, "wide eps {}", eps_wide);
    }

    #[test]
    fn test_mass_matrix_learns_scales() {
        let mut adapt = WindowedAdaptation::new(2, 200, 0.8, 0.1);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut updated = false;
        for i in 0..200 {
            let q = [
                3.0 * rng.random::<f64>() - 1.5,
                0.3 * rng.random::<f64>() - 0.15,
            ];
            if adapt.update(i, &q, 0.8) == AdaptEvent::MassUpdated {
                updated = true;
            }
        }
        assert!(updated);
        let inv_mass = adapt.inv_mass_diag();
        // Uniform widths 3.0 and 0.3 → variances 0.75 and 0.0075
        assert!(inv_mass[0] > 10.0 * inv_mass[1]);
    }
}
