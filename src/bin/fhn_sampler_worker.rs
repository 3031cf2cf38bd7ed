//! External Sampler Runtime
//!
//! Reads one JSON `SamplerRequest` from stdin and writes one JSON
//! `SamplerResponse` line to stdout. Logs go to stderr so stdout carries
//! nothing but the response.

use tracing_subscriber::EnvFilter;

use fhn_bayes_bench::backends::serve;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    serve(stdin.lock(), stdout.lock())?;
    Ok(())
}
