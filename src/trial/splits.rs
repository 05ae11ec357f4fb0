//! Trials submitting a group of independent `Split` resources.

use std::collections::BTreeMap;

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::client::ClusterClient;
use crate::config::{TerminalStates, ValidatorConfig};
use crate::crd::Split;
use crate::metrics::creation_timestamp_text;
use crate::topology::HopStrategy;
use crate::trial::error::{Error, Result};
use crate::trial::runner::{
    AWAIT_TERMINAL_OPERATION, PlacementReport, TerminalOutcome, TrialKind, TrialRunner,
    conflict_as_created, not_found_as_deleted,
};

/// A trial driven by one `Split` per split.
///
/// Splits carry no controller-reported path, so hops are always recomputed
/// over the topology.
pub struct SplitsTrial {
    name: String,
    splits: Vec<Split>,
}

impl SplitsTrial {
    pub fn new(splits: Vec<Split>) -> Self {
        let name = splits
            .iter()
            .map(|s| s.name_any())
            .collect::<Vec<_>>()
            .join(",");
        Self { name, splits }
    }

    fn split_names(&self) -> Vec<String> {
        self.splits.iter().map(|s| s.name_any()).collect()
    }
}

/// Outcome once every tracked split reports a terminal state.
///
/// Splits the controller has not reported yet keep the group pending.
fn group_outcome(
    names: &[String],
    listed: &[Split],
    states: &TerminalStates,
) -> Result<TerminalOutcome> {
    let mut errored = false;
    for name in names {
        let split = listed
            .iter()
            .find(|s| s.name_any() == *name)
            .ok_or_else(|| Error::Transient(format!("Split {name} not listed yet")))?;
        let state = split
            .state()
            .ok_or_else(|| Error::malformed(name, "status.state missing"))?;
        if !states.is_terminal(state) {
            return Err(Error::Transient(format!("Split {name} in state {state}")));
        }
        errored |= states.is_error(state);
    }

    Ok(if errored {
        TerminalOutcome::Errored
    } else {
        TerminalOutcome::Finished
    })
}

#[async_trait]
impl TrialRunner for SplitsTrial {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> TrialKind {
        TrialKind::Splits
    }

    fn expected_pods(&self, config: &ValidatorConfig) -> usize {
        self.splits.len() * config.pods_per_split
    }

    async fn submit(&mut self, client: &dyn ClusterClient, config: &ValidatorConfig) -> Result<()> {
        for split in &mut self.splits {
            let template = &*split;
            let created = config
                .retry
                .create
                .execute("create Split", || async move {
                    conflict_as_created(client.create_split(template).await)
                })
                .await?;

            match created {
                Some(created) => *split = created,
                None => info!(split = %split.name_any(), "Split already exists"),
            }
        }
        Ok(())
    }

    async fn await_terminal(
        &mut self,
        client: &dyn ClusterClient,
        config: &ValidatorConfig,
    ) -> Result<TerminalOutcome> {
        let names = self.split_names();
        let names = names.as_slice();
        let states = &config.split_states;

        let outcome = config
            .retry
            .terminal_status
            .execute(AWAIT_TERMINAL_OPERATION, || async move {
                let listed = client.list_splits().await?;
                group_outcome(names, &listed, states)
            })
            .await?;

        debug!(trial = %self.name, ?outcome, "Splits reached terminal state");
        Ok(outcome)
    }

    async fn collect_placement(
        &mut self,
        client: &dyn ClusterClient,
        config: &ValidatorConfig,
    ) -> Result<PlacementReport> {
        if config.hop_strategy == Some(HopStrategy::ReportedPath) {
            warn!(trial = %self.name, "Splits report no path; scoring shortest paths instead");
        }

        let names = self.split_names();
        let names = names.as_slice();
        let (listed, placements) = config
            .retry
            .get
            .execute("collect Split placements", || async move {
                let listed = client.list_splits().await?;
                let mut placements = BTreeMap::new();
                for name in names {
                    let split = listed
                        .iter()
                        .find(|s| s.name_any() == *name)
                        .ok_or_else(|| Error::malformed(name, "not listed"))?;
                    placements.insert(name.clone(), split.assignment()?);
                }
                Ok((listed, placements))
            })
            .await?;

        let mut creation_timestamps = BTreeMap::new();
        for split in listed.iter().filter(|s| names.contains(&s.name_any())) {
            let created = split
                .metadata
                .creation_timestamp
                .as_ref()
                .ok_or_else(|| Error::malformed(split.name_any(), "metadata.creationTimestamp missing"))?;
            creation_timestamps.insert(split.name_any(), creation_timestamp_text(created)?);
        }

        Ok(PlacementReport {
            hop_strategy: HopStrategy::ShortestPath,
            placements,
            creation_timestamps,
            ..PlacementReport::default()
        })
    }

    async fn delete(&mut self, client: &dyn ClusterClient, config: &ValidatorConfig) -> Result<()> {
        let mut first_error = None;
        for name in self.split_names() {
            let split_name = name.as_str();
            let result = config
                .retry
                .delete
                .execute("delete Split", || async move {
                    not_found_as_deleted(client.delete_split(split_name).await)
                })
                .await;

            if let Err(e) = result {
                warn!(split = %name, error = %e, "Failed to delete Split");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
