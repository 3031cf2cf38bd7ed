//! Message Transports for the External Runtime
//!
//! A [`Transport`] moves one JSON request to the runtime and brings one
//! JSON response back. [`ProcessTransport`] talks to the
//! `fhn_sampler_worker` executable over stdin/stdout; [`InProcessTransport`]
//! hands the same text to the worker entry point directly.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use super::worker::handle_request;
use crate::error::InferenceError;

/// File name of the worker executable (without platform suffix)
pub const WORKER_BIN: &str = "fhn_sampler_worker";

/// One request/response exchange with the runtime
pub trait Transport: Send + Sync {
    /// Short label for logs and reports
    fn describe(&self) -> String;

    /// Send `request`, return the runtime's reply
    fn exchange(&self, request: &str) -> Result<String, InferenceError>;
}

/// Runs the worker entry point in the calling process
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcessTransport;

impl Transport for InProcessTransport {
    fn describe(&self) -> String {
        "in-process".to_string()
    }

    fn exchange(&self, request: &str) -> Result<String, InferenceError> {
        Ok(handle_request(request))
    }
}

/// Spawns the worker executable once per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTransport {
    program: PathBuf,
}

impl ProcessTransport {
    /// Use the executable at `program`
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Path of the executable
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Find the worker next to the running executable
    ///
    /// Test binaries live one directory below the others (`target/*/deps`),
    /// so the parent directory is searched as well.
    pub fn locate() -> Option<Self> {
        let exe = std::env::current_exe().ok()?;
        let file_name = format!("{}{}", WORKER_BIN, std::env::consts::EXE_SUFFIX);
        exe.ancestors()
            .skip(1)
            .take(2)
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
            .map(Self::new)
    }
}

impl Transport for ProcessTransport {
    fn describe(&self) -> String {
        format!("process {}", self.program.display())
    }

    fn exchange(&self, request: &str) -> Result<String, InferenceError> {
        debug!(program = %self.program.display(), bytes = request.len(), "spawning worker");
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                InferenceError::transport(format!(
                    "cannot start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        // The worker reads its whole input before answering
        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| InferenceError::transport("worker stdin unavailable"))?;
            stdin
                .write_all(request.as_bytes())
                .map_err(|e| InferenceError::transport(format!("writing request: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| InferenceError::transport(format!("waiting for worker: {}", e)))?;
        if !output.status.success() {
            return Err(InferenceError::transport(format!(
                "worker exited with {}",
                output.status
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|e| InferenceError::transport(format!("worker reply is not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::SamplerResponse;

    #[test]
    fn test_in_process_exchange_reaches_worker() {
        let reply = InProcessTransport.exchange("{}").unwrap();
        let response: SamplerResponse = serde_json::from_str(&reply).unwrap();
        assert!(matches!(response, SamplerResponse::Error { .. }));
    }

    #[test]
    fn test_missing_program_is_transport_error() {
        let transport = ProcessTransport::new("/nonexistent/fhn_sampler_worker");
        let err = transport.exchange("{}").unwrap_err();
        assert!(matches!(err, InferenceError::Transport(_)));
        assert!(transport.describe().contains("nonexistent"));
    }
}
