//! FitzHugh-Nagumo Bayesian Benchmark
//!
//! Generates the noisy dataset, fits it with every inference back-end in
//! turn, prints a comparison against the truth, and writes
//! `report.json` and `trajectories.svg` to the output directory.
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use fhn_bayes_bench::report::{print_summary, write_reports};
use fhn_bayes_bench::{BenchmarkConfig, Experiment};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    println!("═══════════════════════════════════════════════════════════════");
    println!("  FitzHugh-Nagumo: Bayesian Parameter Estimation Benchmark");
    println!("═══════════════════════════════════════════════════════════════\n");

    let config = BenchmarkConfig::default();
    println!("Sampler Settings:");
    println!(
        "  program_nuts: {} chains × {} draws (warmup {})",
        config.program_nuts.chains, config.program_nuts.draws, config.program_nuts.warmup
    );
    println!(
        "  external:     {} chain  × {} draws (warmup {}), target accept {:.2}",
        config.external.chains,
        config.external.draws,
        config.external.warmup,
        config.external.target_accept
    );
    println!(
        "  ode_wrapper:  {} chains × {} draws (warmup {})",
        config.ode_wrapper.chains, config.ode_wrapper.draws, config.ode_wrapper.warmup
    );
    println!(
        "  static_hmc:   {}",
        if config.include_excluded { "enabled" } else { "excluded" }
    );
    println!();

    let output_dir = config.output_dir.clone();
    let experiment = Experiment::setup(config).context("setting up the experiment")?;
    let report = experiment.run();

    print_summary(&report);

    let (json, svg) = write_reports(&report, &output_dir)
        .with_context(|| format!("writing reports to {}", output_dir.display()))?;
    println!("\nReports:");
    println!("  {}", json.display());
    println!("  {}", svg.display());

    Ok(())
}
