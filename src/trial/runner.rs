//! The capability set shared by both trial kinds.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;

use crate::client::ClusterClient;
use crate::config::ValidatorConfig;
use crate::metrics::AllocationStats;
use crate::topology::{HopStrategy, NodeName, SplitAssignment};
use crate::trial::error::Result;

/// Which kind of placement request a trial submits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TrialKind {
    /// One coordinated `SplitsPlacer` for every split.
    Placer,
    /// One independent `Split` per split.
    Splits,
}

impl fmt::Display for TrialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialKind::Placer => write!(f, "placer"),
            TrialKind::Splits => write!(f, "splits"),
        }
    }
}

impl FromStr for TrialKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "placer" => Ok(TrialKind::Placer),
            "splits" => Ok(TrialKind::Splits),
            other => Err(format!("unknown trial kind '{other}'")),
        }
    }
}

/// Terminal state observed while polling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalOutcome {
    Finished,
    Errored,
}

/// Placement data read back from the cluster once a trial finished.
#[derive(Clone, Debug, Default)]
pub struct PlacementReport {
    pub hop_strategy: HopStrategy,
    /// Split name to reported role placement.
    pub placements: BTreeMap<String, SplitAssignment>,
    /// Split name to controller-reported path, if any.
    pub reported_paths: BTreeMap<String, Option<Vec<NodeName>>>,
    /// Split name to creation timestamp.
    pub creation_timestamps: BTreeMap<String, String>,
    pub links_bandwidth: BTreeMap<String, f64>,
    pub allocation: Option<AllocationStats>,
}

/// One create, observe, measure and delete cycle.
///
/// Implementations own the resources they submit and must make `delete` safe
/// to call in any phase, including before `submit` succeeded.
#[async_trait]
pub trait TrialRunner: Send {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    fn kind(&self) -> TrialKind;

    /// Pods that must be running before metrics are collected.
    fn expected_pods(&self, config: &ValidatorConfig) -> usize;

    /// Create the trial's resources. "Already exists" counts as created.
    async fn submit(&mut self, client: &dyn ClusterClient, config: &ValidatorConfig) -> Result<()>;

    /// Poll until the controller reports a terminal state.
    async fn await_terminal(
        &mut self,
        client: &dyn ClusterClient,
        config: &ValidatorConfig,
    ) -> Result<TerminalOutcome>;

    /// Read the final placement and timing fields.
    async fn collect_placement(
        &mut self,
        client: &dyn ClusterClient,
        config: &ValidatorConfig,
    ) -> Result<PlacementReport>;

    /// Delete the trial's resources. "Not found" counts as deleted.
    async fn delete(&mut self, client: &dyn ClusterClient, config: &ValidatorConfig) -> Result<()>;
}

/// Map a 409 on create to success.
pub fn conflict_as_created<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(created) => Ok(Some(created)),
        Err(e) if e.is_conflict() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Map a 404 on delete to success.
pub fn not_found_as_deleted(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}

/// Operation label of the terminal-status wait.
pub const AWAIT_TERMINAL_OPERATION: &str = "await terminal status";
