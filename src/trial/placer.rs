//! Trials submitting one coordinated `SplitsPlacer`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::client::ClusterClient;
use crate::config::ValidatorConfig;
use crate::crd::{RuPosition, SplitsPlacer};
use crate::metrics::{AllocationStats, creation_timestamp_text};
use crate::topology::{HopStrategy, SplitAssignment};
use crate::trial::error::{Error, Result};
use crate::trial::runner::{
    AWAIT_TERMINAL_OPERATION, PlacementReport, TerminalOutcome, TrialKind, TrialRunner,
    conflict_as_created, not_found_as_deleted,
};

/// A trial driven by a single `SplitsPlacer`.
///
/// Hop counts default to the path the controller wrote into `spec.rus[].path`;
/// with [`HopStrategy::ShortestPath`] the `Split` resources the controller
/// provisioned are read and scored against the topology instead.
pub struct PlacerTrial {
    name: String,
    placer: SplitsPlacer,
}

impl PlacerTrial {
    pub fn new(placer: SplitsPlacer) -> Self {
        Self {
            name: placer.name_any(),
            placer,
        }
    }

    fn hop_strategy(config: &ValidatorConfig) -> HopStrategy {
        config.hop_strategy.unwrap_or(HopStrategy::ReportedPath)
    }

    async fn fetch(&self, client: &dyn ClusterClient, config: &ValidatorConfig) -> Result<SplitsPlacer> {
        let name = self.name.as_str();
        config
            .retry
            .get
            .execute("get SplitsPlacer", || async move {
                client.get_splits_placer(name).await
            })
            .await
    }
}

/// Placement written by the controller into the request itself.
fn reported_assignment(ru: &RuPosition, state: &str) -> Option<SplitAssignment> {
    Some(SplitAssignment {
        name: ru.split_name.clone(),
        cu_node: ru.cu_node.clone()?,
        du_node: ru.du_node.clone()?,
        ru_node: ru.ru_node.clone()?,
        status: state.to_string(),
    })
}

#[async_trait]
impl TrialRunner for PlacerTrial {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> TrialKind {
        TrialKind::Placer
    }

    fn expected_pods(&self, config: &ValidatorConfig) -> usize {
        self.placer.spec.rus.len() * config.pods_per_split
    }

    async fn submit(&mut self, client: &dyn ClusterClient, config: &ValidatorConfig) -> Result<()> {
        let placer = &self.placer;
        let created = config
            .retry
            .create
            .execute("create SplitsPlacer", || async move {
                conflict_as_created(client.create_splits_placer(placer).await)
            })
            .await?;

        match created {
            Some(created) => self.placer = created,
            None => info!(trial = %self.name, "SplitsPlacer already exists"),
        }
        Ok(())
    }

    async fn await_terminal(
        &mut self,
        client: &dyn ClusterClient,
        config: &ValidatorConfig,
    ) -> Result<TerminalOutcome> {
        let name = self.name.as_str();
        let states = &config.placer_states;

        let (placer, outcome) = config
            .retry
            .terminal_status
            .execute(AWAIT_TERMINAL_OPERATION, || async move {
                let placer = client.get_splits_placer(name).await.map_err(|e| {
                    if e.is_not_found() {
                        Error::Transient(format!("SplitsPlacer {name} not visible yet"))
                    } else {
                        e
                    }
                })?;

                let state = placer
                    .state()
                    .ok_or_else(|| Error::malformed(name, "status.state missing"))?;
                if !states.is_terminal(state) {
                    return Err(Error::Transient(format!("SplitsPlacer {name} in state {state}")));
                }

                let outcome = if states.is_error(state) {
                    TerminalOutcome::Errored
                } else {
                    TerminalOutcome::Finished
                };
                Ok((placer, outcome))
            })
            .await?;

        debug!(trial = %self.name, ?outcome, "SplitsPlacer reached terminal state");
        self.placer = placer;
        Ok(outcome)
    }

    async fn collect_placement(
        &mut self,
        client: &dyn ClusterClient,
        config: &ValidatorConfig,
    ) -> Result<PlacementReport> {
        let placer = self.fetch(client, config).await?;
        let status = placer
            .status
            .clone()
            .ok_or_else(|| Error::malformed(&self.name, "status missing"))?;
        let state = status.state.clone().unwrap_or_default();
        let created = placer
            .metadata
            .creation_timestamp
            .as_ref()
            .ok_or_else(|| Error::malformed(&self.name, "metadata.creationTimestamp missing"))
            .and_then(creation_timestamp_text)?;

        let hop_strategy = Self::hop_strategy(config);
        let rus = &placer.spec.rus;

        let mut placements = BTreeMap::new();
        match hop_strategy {
            HopStrategy::ReportedPath => {
                for ru in rus {
                    if let Some(assignment) = reported_assignment(ru, &state) {
                        placements.insert(ru.split_name.clone(), assignment);
                    }
                }
            }
            HopStrategy::ShortestPath => {
                for ru in rus {
                    let split_name = ru.split_name.as_str();
                    let assignment = config
                        .retry
                        .get
                        .execute("get Split", || async move {
                            client.get_split(split_name).await?.assignment()
                        })
                        .await?;
                    placements.insert(ru.split_name.clone(), assignment);
                }
            }
        }

        let reported_paths = rus
            .iter()
            .map(|ru| (ru.split_name.clone(), ru.path.clone()))
            .collect();
        // Every split is provisioned by this placer, so they share its creation time.
        let creation_timestamps = rus
            .iter()
            .map(|ru| (ru.split_name.clone(), created.clone()))
            .collect();

        let allocation = status
            .allocated_rus
            .map(|allocated| AllocationStats::new(status.allocation_time, allocated, rus.len()));

        self.placer = placer;
        Ok(PlacementReport {
            hop_strategy,
            placements,
            reported_paths,
            creation_timestamps,
            links_bandwidth: status.remaining_bandwidth.unwrap_or_default(),
            allocation,
        })
    }

    async fn delete(&mut self, client: &dyn ClusterClient, config: &ValidatorConfig) -> Result<()> {
        let name = self.name.as_str();
        config
            .retry
            .delete
            .execute("delete SplitsPlacer", || async move {
                not_found_as_deleted(client.delete_splits_placer(name).await)
            })
            .await
            .inspect_err(|e| warn!(trial = %name, error = %e, "Failed to delete SplitsPlacer"))
    }
}
