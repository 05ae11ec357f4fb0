//! Pod snapshots and naming.

use serde::Serialize;

/// Phase reported by a pod whose containers have started.
pub const POD_RUNNING_PHASE: &str = "Running";

/// Name and phase of one pod at the time it was listed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PodSummary {
    pub name: String,
    pub phase: Option<String>,
}

impl PodSummary {
    pub fn new(name: impl Into<String>, phase: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: Some(phase.into()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase.as_deref() == Some(POD_RUNNING_PHASE)
    }

    /// Split this pod belongs to, see [`split_name_from_pod`].
    pub fn split_name(&self) -> Option<&str> {
        split_name_from_pod(&self.name)
    }
}

/// Split owning a pod named `<role>-<split>-<suffix>`.
///
/// Returns `None` when the name has fewer than two dash-separated segments.
pub fn split_name_from_pod(pod: &str) -> Option<&str> {
    pod.split('-').nth(1).filter(|s| !s.is_empty())
}
