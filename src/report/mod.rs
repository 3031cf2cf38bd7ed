//! Report Module: Console Tables, JSON and SVG
//!
//! - `summary.rs`: per-back-end tables printed to stdout
//! - `json.rs`: `report.json` with config, dataset and every outcome
//! - `plot.rs`: `trajectories.svg` with data, truth and posterior draws

mod summary;
mod json;
mod plot;

use std::path::{Path, PathBuf};

use crate::error::BenchError;
use crate::experiment::ExperimentReport;

pub use summary::{print_summary, render_summary};
pub use json::{read_json_report, write_json_report, REPORT_FILE};
pub use plot::{posterior_predictive, write_trajectory_plot, TrajectoryPlot, PLOT_FILE};

/// Write the JSON report and the plot into `dir`
pub fn write_reports(report: &ExperimentReport, dir: &Path) -> Result<(PathBuf, PathBuf), BenchError> {
    let json = write_json_report(report, dir)?;
    let svg = write_trajectory_plot(report, dir)?;
    Ok((json, svg))
}
