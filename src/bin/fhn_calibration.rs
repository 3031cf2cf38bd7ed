//! Calibration of the Inference Back-Ends
//!
//! Repeats the benchmark on independent datasets (fresh noise seed and
//! fresh sampler seed per trial) and reports, per parameter, the fraction
//! of trials whose posterior mean lies within 3 posterior standard
//! deviations of the truth.

use tracing_subscriber::EnvFilter;

use fhn_bayes_bench::experiment::CALIBRATION_SD_MULTIPLE;
use fhn_bayes_bench::{
    run_calibration, BenchmarkConfig, CalibrationReport, InferenceBackend, OdeWrapperBackend,
    ProgramNutsBackend, FitzHughNagumo,
};

const N_TRIALS: usize = 20;
const TARGET_COVERAGE: f64 = 0.95;

fn print_report(report: &CalibrationReport) {
    println!("\n{}  ({} trials, {} failed)", report.backend, report.trials.len(), report.failed);
    println!("─────────────────────────────────────────────────────────────");
    println!("  {:<8} {:>9} {:>10}", "param", "truth", "coverage");
    for ((name, truth), coverage) in report
        .param_names
        .iter()
        .zip(&report.truth)
        .zip(report.coverage())
    {
        let mark = if coverage >= TARGET_COVERAGE { "✓" } else { "✗" };
        println!("  {:<8} {:>9.4} {:>9.1}% {}", name, truth, 100.0 * coverage, mark);
    }
    println!("  reliable runs: {:.1}%", 100.0 * report.reliable_fraction());
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    println!("═══════════════════════════════════════════════════════════════");
    println!("  FitzHugh-Nagumo: Calibration over Independent Datasets");
    println!("═══════════════════════════════════════════════════════════════");
    println!(
        "\n  {} trials, hit = |mean − truth| ≤ {} posterior std, target {:.0}%",
        N_TRIALS,
        CALIBRATION_SD_MULTIPLE,
        100.0 * TARGET_COVERAGE
    );

    let base = BenchmarkConfig::default();
    let backends: [(&dyn InferenceBackend<FitzHughNagumo>, _); 2] = [
        (&ProgramNutsBackend, base.program_nuts.clone()),
        (&OdeWrapperBackend, base.ode_wrapper.clone()),
    ];

    for (backend, sampler) in backends {
        let report = run_calibration(backend, &base, &sampler, N_TRIALS)?;
        print_report(&report);
    }

    println!("\n═══════════════════════════════════════════════════════════════");
    Ok(())
}
