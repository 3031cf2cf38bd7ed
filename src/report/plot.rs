//! Trajectory Plot (SVG)
//!
//! One panel per state component: noisy observations as dots, the true
//! trajectory as a solid line, and posterior-predictive trajectories
//! (parameter draws pushed through the solver) as faint lines.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tracing::{info, warn};

use crate::error::{BenchError, IntegrationError};
use crate::experiment::ExperimentReport;
use crate::inference::PosteriorSamples;
use crate::solver::{OdeProblem, SolverOptions};
use crate::systems::{FitzHughNagumo, VectorField};

/// File name of the plot
pub const PLOT_FILE: &str = "trajectories.svg";

const WIDTH: f64 = 800.0;
const PANEL_HEIGHT: f64 = 260.0;
const MARGIN: f64 = 50.0;

/// Data behind the plot
#[derive(Debug, Clone)]
pub struct TrajectoryPlot {
    /// State names, one panel each
    pub state_names: Vec<String>,
    /// Dense time grid
    pub grid: Vec<f64>,
    /// True trajectory on the grid, `n_states × n_grid`
    pub truth: Array2<f64>,
    /// Posterior-predictive trajectories on the grid
    pub predictive: Vec<Array2<f64>>,
    /// Observation times
    pub times: Vec<f64>,
    /// Observations, `n_states × n_times`
    pub observations: Array2<f64>,
    /// Back-end whose draws were used
    pub source: Option<String>,
}

/// Solve the ODE for `n_draws` evenly spaced posterior draws
///
/// The first `param_dim` columns of each draw are the structural
/// parameters; anything after (σ²) is ignored.
pub fn posterior_predictive<F: VectorField>(
    ode: &OdeProblem<F>,
    samples: &PosteriorSamples,
    n_draws: usize,
    n_points: usize,
    opts: &SolverOptions,
) -> Result<Vec<Array2<f64>>, IntegrationError> {
    let total = samples.total_draws();
    if total == 0 || n_draws == 0 {
        return Ok(Vec::new());
    }
    let p = ode.field.param_dim();
    let n_draws = n_draws.min(total);
    let stride = total / n_draws;

    let mut trajectories = Vec::with_capacity(n_draws);
    for k in 0..n_draws {
        let Some(draw) = samples.draw(k * stride) else {
            break;
        };
        let solution = ode.solve_dense_params(&draw[..p], opts)?;
        trajectories.push(solution.sample_uniform(n_points)?.1);
    }
    Ok(trajectories)
}

impl TrajectoryPlot {
    /// Truth, data and predictive draws from the first completed back-end
    pub fn from_report(report: &ExperimentReport) -> Result<Self, IntegrationError> {
        let config = &report.config;
        let ode = OdeProblem::new(
            FitzHughNagumo,
            config.initial_state.clone(),
            config.t_span,
            config.truth.to_vec(),
        )?;
        let (grid, truth) = ode
            .solve(&config.data_solver)?
            .sample_uniform(config.plot_points)?;

        let source = report.completed().next();
        let predictive = match source {
            Some(output) => posterior_predictive(
                &ode,
                &output.samples,
                config.n_predictive_draws,
                config.plot_points,
                &config.likelihood_solver,
            )?,
            None => Vec::new(),
        };

        Ok(Self {
            state_names: ode.field.state_names().iter().map(|s| s.to_string()).collect(),
            grid,
            truth,
            predictive,
            times: report.dataset.times.as_slice().to_vec(),
            observations: report.dataset.observations.clone(),
            source: source.map(|o| o.backend.clone()),
        })
    }

    /// Render as a standalone SVG document
    pub fn to_svg(&self) -> String {
        let n_panels = self.truth.nrows();
        let height = n_panels as f64 * PANEL_HEIGHT + MARGIN;
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12">"#,
            w = WIDTH,
            h = height
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let title = match &self.source {
            Some(name) => format!("FitzHugh-Nagumo: data, truth and posterior draws ({})", name),
            None => "FitzHugh-Nagumo: data and truth".to_string(),
        };
        let _ = writeln!(svg, r#"<text x="{}" y="20">{}</text>"#, MARGIN, title);

        for i in 0..n_panels {
            self.write_panel(&mut svg, i);
        }
        svg.push_str("</svg>\n");
        svg
    }

    fn write_panel(&self, svg: &mut String, i: usize) {
        let top = MARGIN * 0.6 + i as f64 * PANEL_HEIGHT;
        let plot_h = PANEL_HEIGHT - MARGIN;
        let plot_w = WIDTH - 2.0 * MARGIN;

        let t0 = self.grid.first().copied().unwrap_or(0.0);
        let t1 = self.grid.last().copied().unwrap_or(1.0);
        let values = self
            .truth
            .row(i)
            .into_iter()
            .chain(self.observations.row(i).into_iter())
            .chain(self.predictive.iter().flat_map(|p| p.row(i).into_iter()))
            .copied()
            .filter(|y| y.is_finite());
        let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
            (lo.min(y), hi.max(y))
        });
        let (lo, hi) = if lo < hi { (lo, hi) } else { (lo - 1.0, lo + 1.0) };
        let pad = 0.05 * (hi - lo);
        let (lo, hi) = (lo - pad, hi + pad);

        let x = |t: f64| MARGIN + (t - t0) / (t1 - t0) * plot_w;
        let y = |v: f64| top + plot_h - (v - lo) / (hi - lo) * plot_h;

        let _ = writeln!(
            svg,
            r##"<rect x="{}" y="{:.1}" width="{}" height="{:.1}" fill="none" stroke="#444"/>"##,
            MARGIN, top, plot_w, plot_h
        );
        let name = self.state_names.get(i).map_or("x", String::as_str);
        let _ = writeln!(svg, r#"<text x="10" y="{:.1}">{}</text>"#, top + plot_h / 2.0, name);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{:.1}">{:.2}</text><text x="{}" y="{:.1}">{:.2}</text>"#,
            MARGIN + 4.0,
            top + 12.0,
            hi,
            MARGIN + 4.0,
            top + plot_h - 4.0,
            lo
        );

        let polyline = |row: ndarray::ArrayView1<f64>| -> String {
            self.grid
                .iter()
                .zip(row.iter())
                .filter(|(_, v)| v.is_finite())
                .map(|(&t, &v)| format!("{:.1},{:.1}", x(t), y(v)))
                .collect::<Vec<_>>()
                .join(" ")
        };

        for trajectory in &self.predictive {
            let _ = writeln!(
                svg,
                r##"<polyline points="{}" fill="none" stroke="#1f77b4" stroke-opacity="0.15"/>"##,
                polyline(trajectory.row(i))
            );
        }
        let _ = writeln!(
            svg,
            r##"<polyline points="{}" fill="none" stroke="#000" stroke-width="1.5"/>"##,
            polyline(self.truth.row(i))
        );
        for (&t, &v) in self.times.iter().zip(self.observations.row(i).iter()) {
            let _ = writeln!(
                svg,
                r##"<circle cx="{:.1}" cy="{:.1}" r="3.5" fill="#d62728"/>"##,
                x(t),
                y(v)
            );
        }
    }
}

/// Build the plot for `report` and write `dir/trajectories.svg`
pub fn write_trajectory_plot(report: &ExperimentReport, dir: &Path) -> Result<PathBuf, BenchError> {
    let plot = TrajectoryPlot::from_report(report)?;
    if plot.source.is_none() {
        warn!("no completed back-end, plotting data and truth only");
    }
    fs::create_dir_all(dir)?;
    let path = dir.join(PLOT_FILE);
    fs::write(&path, plot.to_svg())?;
    info!(path = %path.display(), draws = plot.predictive.len(), "trajectory plot written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{BenchmarkConfig, Experiment};
    use ndarray::Array2;

    fn report() -> ExperimentReport {
        let experiment = Experiment::setup(BenchmarkConfig::default()).unwrap();
        ExperimentReport {
            config: experiment.config.clone(),
            priors: experiment.problem.priors.clone(),
            dataset: experiment.dataset.clone(),
            outcomes: Vec::new(),
        }
    }

    #[test]
    fn test_predictive_uses_structural_columns() {
        let ode = OdeProblem::new(FitzHughNagumo, vec![1.0, 1.0], (0.0, 10.0), vec![0.7, 0.8, 0.08, 0.5])
            .unwrap();
        let chain = Array2::from_shape_fn((6, 5), |(_, k)| [0.7, 0.8, 0.08, 0.5, 0.04][k]);
        let samples = PosteriorSamples::new(
            ["a", "b", "tau_inv", "l", "sigma2"].iter().map(|s| s.to_string()).collect(),
            vec![chain],
        );
        let draws = posterior_predictive(&ode, &samples, 3, 11, &SolverOptions::default()).unwrap();
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0].dim(), (2, 11));
        assert!((draws[0][[0, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_svg_without_backends_has_data_and_truth() {
        let plot = TrajectoryPlot::from_report(&report()).unwrap();
        assert!(plot.predictive.is_empty());
        assert_eq!(plot.grid.len(), 201);

        let svg = plot.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<circle").count(), 20);
        assert_eq!(svg.matches("<polyline").count(), 2);
    }

    #[test]
    fn test_plot_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_trajectory_plot(&report(), dir.path()).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("FitzHugh-Nagumo"));
    }
}
