//! JSON Report

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::BenchError;
use crate::experiment::ExperimentReport;

/// File name of the JSON report
pub const REPORT_FILE: &str = "report.json";

/// Write `report` as pretty JSON to `dir/report.json`
pub fn write_json_report(report: &ExperimentReport, dir: &Path) -> Result<PathBuf, BenchError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(REPORT_FILE);
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    info!(path = %path.display(), "JSON report written");
    Ok(path)
}

/// Read a report written by [`write_json_report`]
pub fn read_json_report(path: &Path) -> Result<ExperimentReport, BenchError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
