//! External Sampler Runtime
//!
//! Reads one [`SamplerRequest`], rebuilds the model named by its
//! `model_id`, samples it, and answers with one [`SamplerResponse`].
//! Failures become `status: "error"` responses; the runtime itself only
//! errors when it cannot read or write its streams.

use std::io::{BufRead, Read, Write};

use tracing::{info, warn};

use super::protocol::{SamplerRequest, SamplerResponse};
use crate::error::InferenceError;
use crate::inference::{run_chains, OdeBayesModel};
use crate::systems::{FitzHughNagumo, VectorField};

fn sample<F: VectorField + Clone>(
    request: &SamplerRequest,
    field: F,
) -> Result<SamplerResponse, InferenceError> {
    let problem = request.to_problem(field)?;
    let model = OdeBayesModel::from_problem(&problem)?;
    let (samples, diagnostics) = run_chains(&model, &request.sampler)?;
    Ok(SamplerResponse::Ok {
        samples,
        diagnostics,
    })
}

fn dispatch(request: &SamplerRequest) -> Result<SamplerResponse, InferenceError> {
    match request.model_id.as_str() {
        "fitzhugh_nagumo" => sample(request, FitzHughNagumo),
        other => Err(InferenceError::invalid_problem(format!(
            "unknown model '{}'",
            other
        ))),
    }
}

/// Answer one JSON request with one JSON response
pub fn handle_request(input: &str) -> String {
    let response = serde_json::from_str::<SamplerRequest>(input)
        .map_err(InferenceError::from)
        .and_then(|request| {
            info!(
                model = %request.model_id,
                chains = request.sampler.chains,
                draws = request.sampler.draws,
                "worker request received"
            );
            dispatch(&request)
        })
        .unwrap_or_else(|e| {
            warn!(error = %e, "worker request failed");
            SamplerResponse::Error {
                message: e.to_string(),
            }
        });

    serde_json::to_string(&response).unwrap_or_else(|e| {
        format!(
            r#"{{"status":"error","message":"response could not be encoded: {}"}}"#,
            e.to_string().replace('"', "'")
        )
    })
}

/// Read a whole request from `input`, write the response line to `output`
pub fn serve<R: BufRead, W: Write>(mut input: R, mut output: W) -> std::io::Result<()> {
    let mut request = String::new();
    input.read_to_string(&mut request)?;
    let response = handle_request(&request);
    writeln!(output, "{}", response)?;
    output.flush()
}
