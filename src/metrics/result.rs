//! Trial result records handed to report writers.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::topology::{HopStrategy, PlacementScore, SplitAssignment};
use crate::trial::runner::TrialKind;
use crate::trial::state_machine::TrialPhase;

/// How a trial ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TrialState {
    /// The controller reached its success state and metrics were collected.
    Finished,
    /// The controller reported its error state.
    Errored,
    /// The validator aborted the trial.
    Failed,
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialState::Finished => write!(f, "Finished"),
            TrialState::Errored => write!(f, "Error"),
            TrialState::Failed => write!(f, "Failed"),
        }
    }
}

/// Allocation statistics reported by a coordinated placement request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AllocationStats {
    /// Seconds the controller spent computing the placement.
    pub allocation_time: Option<f64>,
    pub allocated: i64,
    pub requested: usize,
    /// `allocated / requested * 100`, absent when nothing was requested.
    pub allocated_ratio: Option<f64>,
}

impl AllocationStats {
    pub fn new(allocation_time: Option<f64>, allocated: i64, requested: usize) -> Self {
        let allocated_ratio =
            (requested > 0).then(|| allocated as f64 / requested as f64 * 100.0);
        Self {
            allocation_time,
            allocated,
            requested,
            allocated_ratio,
        }
    }
}

/// Everything measured for a trial that reached its success state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialMetrics {
    pub hop_strategy: HopStrategy,
    pub placements: BTreeMap<String, SplitAssignment>,
    pub hops: PlacementScore,
    /// Split name to creation timestamp.
    pub creation_timestamps: BTreeMap<String, String>,
    /// Pod name to first log line.
    pub initialization_timestamps: BTreeMap<String, String>,
    /// Pod name to seconds between its split's creation and its first log line.
    pub initialization_secs: BTreeMap<String, f64>,
    pub average_initialization_secs: f64,
    /// Remaining capacity per link, when the controller reports it.
    pub links_bandwidth: BTreeMap<String, f64>,
    pub allocation: Option<AllocationStats>,
}

/// Outcome of one trial.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialResult {
    /// Zero-based position in the batch.
    pub execution: u32,
    pub name: String,
    pub kind: TrialKind,
    pub state: TrialState,
    /// What the controller reported, even when the trial later failed.
    pub terminal_state: Option<TrialState>,
    /// Phases visited, in order.
    pub phases: Vec<TrialPhase>,
    /// Set when the trial was aborted.
    pub error: Option<String>,
    /// Present when the controller finished and collection succeeded.
    pub metrics: Option<TrialMetrics>,
}

impl TrialResult {
    /// Result of a trial aborted before it produced metrics.
    pub fn failed(
        execution: u32,
        name: impl Into<String>,
        kind: TrialKind,
        phases: Vec<TrialPhase>,
        error: impl fmt::Display,
    ) -> Self {
        Self {
            execution,
            name: name.into(),
            kind,
            state: TrialState::Failed,
            terminal_state: None,
            phases,
            error: Some(error.to_string()),
            metrics: None,
        }
    }
}
