//! Combines timing, placement and allocation observations into [`TrialMetrics`].

use std::collections::BTreeMap;

use tracing::debug;

use crate::client::split_name_from_pod;
use crate::metrics::result::{AllocationStats, TrialMetrics};
use crate::metrics::timestamps::{initialization_secs, parse_creation_timestamp, parse_init_timestamp};
use crate::topology::{HopStrategy, PlacementScore, SplitAssignment};
use crate::trial::error::{Error, Result};

/// Raw observations gathered while a trial was in `CollectingMetrics`.
#[derive(Clone, Debug, Default)]
pub struct Observations {
    /// Split name to `metadata.creationTimestamp`.
    pub creation_timestamps: BTreeMap<String, String>,
    /// Pod name to first log line.
    pub initialization_timestamps: BTreeMap<String, String>,
    pub placements: BTreeMap<String, SplitAssignment>,
    pub links_bandwidth: BTreeMap<String, f64>,
    pub allocation: Option<AllocationStats>,
}

/// Builds trial metrics from observations and a hop score.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Aggregate one trial.
    ///
    /// A pod contributes a duration when its split (second dash segment of the
    /// pod name) has a creation timestamp. Fails with `NoData` when no pod
    /// does, and with `Timestamp` when a matched value cannot be parsed.
    pub fn aggregate(
        &self,
        observations: Observations,
        hop_strategy: HopStrategy,
        hops: PlacementScore,
    ) -> Result<TrialMetrics> {
        let mut created_at = BTreeMap::new();
        for (split, value) in &observations.creation_timestamps {
            created_at.insert(split.as_str(), parse_creation_timestamp(value)?);
        }

        let mut durations = BTreeMap::new();
        for (pod, line) in &observations.initialization_timestamps {
            let Some(created) = split_name_from_pod(pod).and_then(|s| created_at.get(s)) else {
                debug!(pod = %pod, "Pod does not belong to a tracked split");
                continue;
            };
            let initialized = parse_init_timestamp(line)?;
            durations.insert(pod.clone(), initialization_secs(*created, initialized));
        }

        let average_initialization_secs = mean(durations.values().copied())
            .ok_or_else(|| Error::NoData("no pod initialization durations".into()))?;

        Ok(TrialMetrics {
            hop_strategy,
            placements: observations.placements,
            hops,
            creation_timestamps: observations.creation_timestamps,
            initialization_timestamps: observations.initialization_timestamps,
            initialization_secs: durations,
            average_initialization_secs,
            links_bandwidth: observations.links_bandwidth,
            allocation: observations.allocation,
        })
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}
