//! End-to-end runs on the benchmark dataset
//!
//! Short seeded runs of each back-end must place every structural
//! parameter's truth within 3 posterior standard deviations of the
//! posterior mean. The full calibration over independent datasets is slow
//! and marked `#[ignore]`.

use fhn_bayes_bench::backends::{InProcessTransport, SamplerRequest};
use fhn_bayes_bench::experiment::CALIBRATION_SD_MULTIPLE;
use fhn_bayes_bench::{
    run_calibration, BenchmarkConfig, Experiment, ExternalBackend, FitzHughNagumo,
    InferenceBackend, InferenceOutput, OdeWrapperBackend, ProgramNutsBackend, SamplerConfig,
    FHN_PARAM_NAMES,
};

fn short_run(seed: u64) -> SamplerConfig {
    SamplerConfig {
        warmup: 300,
        draws: 300,
        chains: 2,
        seed,
        ..SamplerConfig::default()
    }
}

fn assert_recovers_truth(config: &BenchmarkConfig, output: &InferenceOutput) {
    for name in FHN_PARAM_NAMES {
        let summary = output.samples.summary_of(name).expect("parameter present");
        let truth = config.truth_of(name).expect("truth known");
        assert!(
            summary.within_sd(truth, CALIBRATION_SD_MULTIPLE),
            "{}: {} = {:.4} ± {:.4}, truth {}",
            output.backend,
            name,
            summary.mean,
            summary.std,
            truth
        );
    }
}

fn assert_draws_in_prior_support(experiment: &Experiment, output: &InferenceOutput) {
    for named in experiment.problem.priors.iter() {
        let (lo, hi) = named.prior.support();
        let draws = output.samples.get(&named.name).expect("parameter present");
        assert!(
            draws.iter().all(|&x| x > lo && x < hi),
            "{} left its support ({}, {})",
            named.name,
            lo,
            hi
        );
    }
}

#[test]
fn test_program_nuts_recovers_structural_parameters() {
    let experiment = Experiment::setup(BenchmarkConfig::default()).unwrap();
    let output = ProgramNutsBackend
        .run_inference(&experiment.problem, &short_run(11))
        .unwrap();

    assert_eq!(output.samples.n_chains(), 2);
    assert_eq!(output.samples.draws_per_chain(), 300);
    assert_eq!(output.samples.total_draws(), 600);
    assert_eq!(output.samples.param_names().len(), 5);
    assert_recovers_truth(&experiment.config, &output);
    assert_draws_in_prior_support(&experiment, &output);
}

#[test]
fn test_ode_wrapper_recovers_structural_parameters() {
    let experiment = Experiment::setup(BenchmarkConfig::default()).unwrap();
    let output = OdeWrapperBackend
        .run_inference(&experiment.problem, &short_run(12))
        .unwrap();

    assert_recovers_truth(&experiment.config, &output);
    assert_draws_in_prior_support(&experiment, &output);
}

#[test]
fn test_program_and_wrapper_agree_on_same_seed() {
    // Both describe the same posterior, so identical seeds give identical chains
    let experiment = Experiment::setup(BenchmarkConfig::default()).unwrap();
    let config = SamplerConfig {
        warmup: 50,
        draws: 20,
        chains: 1,
        seed: 5,
        ..SamplerConfig::default()
    };
    let a = ProgramNutsBackend.run_inference(&experiment.problem, &config).unwrap();
    let c = OdeWrapperBackend.run_inference(&experiment.problem, &config).unwrap();

    for (x, y) in a.samples.chains()[0].iter().zip(c.samples.chains()[0].iter()) {
        assert!((x - y).abs() < 1e-8, "{} vs {}", x, y);
    }
}

#[test]
fn test_external_backend_through_in_process_transport() {
    let experiment = Experiment::setup(BenchmarkConfig::default()).unwrap();
    let backend = ExternalBackend::new(InProcessTransport);
    let config = SamplerConfig {
        warmup: 300,
        draws: 600,
        chains: 1,
        target_accept: 0.65,
        seed: 13,
        ..SamplerConfig::default()
    };
    let output = backend.run_inference(&experiment.problem, &config).unwrap();

    assert_eq!(output.backend, "external");
    assert_eq!(output.samples.n_chains(), 1);
    assert_eq!(output.samples.draws_per_chain(), 600);
    assert_eq!(output.samples.total_draws(), 600);
    assert_eq!(
        output.samples.param_names(),
        &["a", "b", "tau_inv", "l", "sigma2"]
    );
    assert_recovers_truth(&experiment.config, &output);
}

#[test]
fn test_every_backend_sees_the_same_dataset() {
    let mut config = BenchmarkConfig::quick(30, 20);
    config.transport = fhn_bayes_bench::TransportKind::InProcess;
    let experiment = Experiment::setup(config).unwrap();
    let report = experiment.run();

    assert_eq!(report.dataset.observations, experiment.problem.observations);

    // What the external runtime decodes must match to the last bit
    let request = SamplerRequest::from_problem(&experiment.problem, &experiment.config.external);
    let json = serde_json::to_string(&request).unwrap();
    let decoded: SamplerRequest = serde_json::from_str(&json).unwrap();
    let rebuilt = decoded.to_problem(FitzHughNagumo).unwrap();
    let to_bits = |a: &ndarray::Array2<f64>| a.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(to_bits(&rebuilt.observations), to_bits(&report.dataset.observations));
    assert_eq!(report.completed().count(), 3);
    for output in report.completed() {
        assert_eq!(output.samples.param_names().len(), 5);
    }
}

#[test]
#[ignore = "runs 40 independent trials, takes minutes"]
fn test_calibration_over_independent_datasets() {
    let base = BenchmarkConfig::default();
    let sampler = SamplerConfig {
        warmup: 500,
        draws: 500,
        chains: 2,
        ..SamplerConfig::default()
    };
    let backend: &dyn InferenceBackend<FitzHughNagumo> = &ProgramNutsBackend;
    let report = run_calibration(backend, &base, &sampler, 40).unwrap();

    assert_eq!(report.failed, 0);
    assert_eq!(report.param_names, FHN_PARAM_NAMES.to_vec());
    for (name, coverage) in report.param_names.iter().zip(report.coverage()) {
        assert!(coverage >= 0.95, "{} covered in only {:.0}% of trials", name, 100.0 * coverage);
    }
}
