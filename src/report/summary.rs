//! Console Summary
//!
//! Per back-end: status, wall-clock time, a parameter table with the truth
//! alongside, and sampler health.

use std::fmt::Write;

use crate::experiment::{BackendOutcome, ExperimentReport};

const RULE: &str = "═══════════════════════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────────────────────";

/// Render the report as text
pub fn render_summary(report: &ExperimentReport) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_summary(&mut out, report);
    out
}

/// Print the report to stdout
pub fn print_summary(report: &ExperimentReport) {
    print!("{}", render_summary(report));
}

fn write_summary(out: &mut String, report: &ExperimentReport) -> std::fmt::Result {
    let config = &report.config;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "  FitzHugh-Nagumo Bayesian Parameter Estimation")?;
    writeln!(out, "{}\n", RULE)?;

    writeln!(out, "Data:")?;
    writeln!(
        out,
        "  {} observation times on [{}, {}], σ = {:.2}, seed {}",
        report.dataset.times.len(),
        report.dataset.times.first(),
        report.dataset.times.last(),
        config.noise_std,
        config.seed
    )?;
    writeln!(
        out,
        "  truth: a = {}, b = {}, τ⁻¹ = {}, l = {}",
        config.truth.a, config.truth.b, config.truth.tau_inv, config.truth.l
    )?;

    for outcome in &report.outcomes {
        writeln!(out, "\n{}", THIN_RULE)?;
        match outcome {
            BackendOutcome::Completed(output) => {
                let d = &output.diagnostics;
                let verdict = if d.is_reliable() { "reliable" } else { "UNRELIABLE" };
                writeln!(
                    out,
                    "  {}  [completed, {}]  {:.2} s",
                    output.backend,
                    verdict,
                    output.elapsed.as_secs_f64()
                )?;
                writeln!(out, "{}", THIN_RULE)?;
                writeln!(
                    out,
                    "  {:<8} {:>9} {:>9} {:>9} {:>9} {:>9} {:>8} {:>7}",
                    "param", "truth", "mean", "std", "2.5%", "97.5%", "ESS", "R-hat"
                )?;
                for s in output.samples.summary() {
                    let truth = config.truth_of(&s.name).unwrap_or(f64::NAN);
                    writeln!(
                        out,
                        "  {:<8} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>8.0} {:>7.3}",
                        s.name, truth, s.mean, s.std, s.q025, s.q975, s.ess, s.rhat
                    )?;
                }
                writeln!(
                    out,
                    "\n  divergences: {} / {}   accept: {:.3}   step: {:.4}   depth: {:.2}   leapfrog: {:.1}",
                    d.divergences,
                    d.total_draws(),
                    d.mean_accept_prob,
                    d.step_size,
                    d.mean_tree_depth,
                    d.mean_leapfrog
                )?;
                for issue in d.issues() {
                    writeln!(out, "  ⚠ {}", issue)?;
                }
            }
            BackendOutcome::Failed { backend, error } => {
                writeln!(out, "  {}  [failed]", backend)?;
                writeln!(out, "  {}", error)?;
            }
            BackendOutcome::Excluded { backend, reason } => {
                writeln!(out, "  {}  [excluded]", backend)?;
                writeln!(out, "  {}", reason)?;
            }
        }
    }

    writeln!(out, "\n{}", RULE)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SyntheticDataset;
    use crate::experiment::BenchmarkConfig;
    use crate::priors::PriorSet;
    use ndarray::Array2;
    use crate::data::ObservationTimes;

    fn report(outcomes: Vec<BackendOutcome>) -> ExperimentReport {
        ExperimentReport {
            config: BenchmarkConfig::default(),
            priors: PriorSet::benchmark().unwrap(),
            dataset: SyntheticDataset {
                times: ObservationTimes::benchmark(),
                observations: Array2::zeros((2, 10)),
                clean: Array2::zeros((2, 10)),
                noise_std: 0.2,
            },
            outcomes,
        }
    }

    #[test]
    fn test_failed_and_excluded_are_listed() {
        let text = render_summary(&report(vec![
            BackendOutcome::Failed {
                backend: "external".into(),
                error: "worker exited".into(),
            },
            BackendOutcome::Excluded {
                backend: "static_hmc".into(),
                reason: "does not converge".into(),
            },
        ]));
        assert!(text.contains("external  [failed]"));
        assert!(text.contains("worker exited"));
        assert!(text.contains("static_hmc  [excluded]"));
        assert!(text.contains("10 observation times"));
    }
}
