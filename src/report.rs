//! Trial report files.
//!
//! Each template gets two append-only files in the results directory: a
//! human-readable `<template>.txt` with one block per execution and a
//! `;`-delimited `<template>.csv` with one row per execution.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::metrics::{TrialResult, TrialState};
use crate::trial::error::Result;

/// Placeholder for values a trial did not produce.
const MISSING: &str = "NA";

const CSV_HEADERS: [&str; 12] = [
    "execution",
    "name",
    "kind",
    "state",
    "terminal_state",
    "total_hops",
    "average_hops",
    "average_initialization_secs",
    "allocation_time",
    "allocated_ratio",
    "phases",
    "error",
];

/// Sink for trial results.
pub trait ReportWriter {
    fn write(&self, result: &TrialResult) -> Result<()>;
}

/// Discards every result.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReportWriter;

impl ReportWriter for NullReportWriter {
    fn write(&self, _result: &TrialResult) -> Result<()> {
        Ok(())
    }
}

/// Appends results to files named after the trial template.
#[derive(Clone, Debug)]
pub struct FileReportWriter {
    text_path: PathBuf,
    csv_path: PathBuf,
}

impl FileReportWriter {
    /// Writer for `<results_dir>/<template>.txt` and `<results_dir>/<template>.csv`.
    pub fn new(results_dir: &Path, template: &str) -> Self {
        Self {
            text_path: results_dir.join(format!("{template}.txt")),
            csv_path: results_dir.join(format!("{template}.csv")),
        }
    }

    pub fn text_path(&self) -> &Path {
        &self.text_path
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    fn append_text(&self, result: &TrialResult) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.text_path)?;
        file.write_all(render_text(result).as_bytes())?;
        Ok(())
    }

    fn append_row(&self, result: &TrialResult) -> Result<()> {
        let is_new = !self.csv_path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)?;
        let mut csv_wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(file);
        if is_new {
            csv_wtr.write_record(CSV_HEADERS)?;
        }
        csv_wtr.write_record(csv_row(result))?;
        csv_wtr.flush()?;
        Ok(())
    }
}

impl ReportWriter for FileReportWriter {
    fn write(&self, result: &TrialResult) -> Result<()> {
        if let Some(dir) = self.text_path.parent() {
            fs::create_dir_all(dir)?;
        }
        self.append_text(result)?;
        self.append_row(result)?;
        debug!(path = %self.text_path.display(), execution = result.execution, "Trial report written");
        Ok(())
    }
}

fn or_missing<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

fn phase_trail(result: &TrialResult) -> String {
    result
        .phases
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" > ")
}

/// Text block for one execution.
pub fn render_text(result: &TrialResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Execution {}:", result.execution);
    let _ = writeln!(out, "State: {}", result.state);
    if let Some(terminal) = result.terminal_state.filter(|t| *t != result.state) {
        let _ = writeln!(out, "Terminal state: {terminal}");
    }
    if result.state == TrialState::Failed && !result.phases.is_empty() {
        let _ = writeln!(out, "phases: {}", phase_trail(result));
    }

    if let Some(error) = &result.error {
        let _ = writeln!(out, "error: {error}");
    }
    let Some(metrics) = result.metrics.as_ref() else {
        return out;
    };

    if !metrics.links_bandwidth.is_empty() {
        let _ = writeln!(out, "links bandwidth: ");
        for (link, remaining) in &metrics.links_bandwidth {
            let _ = writeln!(out, "  {link}: {remaining}");
        }
    }
    let _ = writeln!(out, "creation timestamp: {:?}", metrics.creation_timestamps);
    let _ = writeln!(out, "initialization timestamp: {:?}", metrics.initialization_timestamps);
    let _ = writeln!(out, "placement: ");
    for (split, a) in &metrics.placements {
        let _ = writeln!(
            out,
            "  {split}: cu={} du={} ru={} status={}",
            a.cu_node, a.du_node, a.ru_node, a.status
        );
    }
    let _ = writeln!(out, "hops ({}): {:?}", metrics.hop_strategy, metrics.hops.per_split);
    let _ = writeln!(out, "total hops: {}", metrics.hops.total_hops);
    let _ = writeln!(out, "average hops: {}", metrics.hops.average_hops);
    let _ = writeln!(
        out,
        "average initialization time: {}",
        metrics.average_initialization_secs
    );
    if let Some(allocation) = &metrics.allocation {
        let _ = writeln!(out, "allocation time: {}", or_missing(allocation.allocation_time));
        let _ = writeln!(
            out,
            "allocated RUs: {}/{} ({}%)",
            allocation.allocated,
            allocation.requested,
            or_missing(allocation.allocated_ratio)
        );
    }
    out
}

fn csv_row(result: &TrialResult) -> Vec<String> {
    let metrics = result.metrics.as_ref();
    let allocation = metrics.and_then(|m| m.allocation.as_ref());
    vec![
        result.execution.to_string(),
        result.name.clone(),
        result.kind.to_string(),
        result.state.to_string(),
        or_missing(result.terminal_state),
        or_missing(metrics.map(|m| m.hops.total_hops)),
        or_missing(metrics.map(|m| m.hops.average_hops)),
        or_missing(metrics.map(|m| m.average_initialization_secs)),
        or_missing(allocation.and_then(|a| a.allocation_time)),
        or_missing(allocation.and_then(|a| a.allocated_ratio)),
        phase_trail(result),
        result.error.clone().unwrap_or_default(),
    ]
}
