//! Drives a single trial through its phases.
//!
//! The orchestrator owns the state machine; runners only talk to the cluster.
//! Whatever happens while the trial is observed, the runner's resources are
//! deleted and the namespace is polled until no pod remains before the trial
//! returns, so the next trial always starts on an empty namespace.

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use crate::client::{ClusterClient, PodSummary};
use crate::config::ValidatorConfig;
use crate::metrics::{MetricsAggregator, Observations, TrialMetrics, TrialResult, TrialState};
use crate::topology::{
    HopStrategy, PlacementScore, PlacementScorer, ShortestPathFinder, TopologyGraph,
    score_reported_paths,
};
use crate::trial::error::{Error, Result};
use crate::trial::runner::{PlacementReport, TerminalOutcome, TrialRunner};
use crate::trial::state_machine::{TrialEvent, TrialPhase, TrialStateMachine, TransitionResult};

/// A trial that did not complete, with the phases it went through.
#[derive(thiserror::Error, Debug)]
#[error("trial failed in {}: {error}", last_phase(.phases))]
pub struct TrialFailure {
    pub error: Error,
    pub phases: Vec<TrialPhase>,
    /// Terminal status the controller reached before the failure, if any.
    pub terminal_state: Option<TrialState>,
    /// Metrics collected before cleanup failed.
    pub metrics: Option<Box<TrialMetrics>>,
}

fn last_phase(phases: &[TrialPhase]) -> TrialPhase {
    phases.last().copied().unwrap_or_default()
}

/// Terminal status recorded in a phase history.
pub fn observed_terminal_state(phases: &[TrialPhase]) -> Option<TrialState> {
    phases.iter().find_map(|phase| match phase {
        TrialPhase::Finished => Some(TrialState::Finished),
        TrialPhase::Errored => Some(TrialState::Errored),
        _ => None,
    })
}

/// Current phase plus every phase visited so far.
struct PhaseTracker<'m> {
    machine: &'m TrialStateMachine,
    trial: String,
    phase: TrialPhase,
    history: Vec<TrialPhase>,
}

impl<'m> PhaseTracker<'m> {
    fn new(machine: &'m TrialStateMachine, trial: &str) -> Self {
        Self {
            machine,
            trial: trial.to_string(),
            phase: TrialPhase::Created,
            history: vec![TrialPhase::Created],
        }
    }

    fn apply(&mut self, event: TrialEvent) {
        match self.machine.transition(&self.phase, event) {
            TransitionResult::Success {
                from,
                to,
                description,
                ..
            } => {
                debug!(trial = %self.trial, %from, %to, %event, "{}", description);
                self.phase = to;
                self.history.push(to);
            }
            TransitionResult::InvalidTransition { current, event } => {
                error!(trial = %self.trial, phase = %current, %event, "Invalid trial transition");
            }
        }
    }
}

/// Runs trials against one cluster namespace and topology.
pub struct TrialOrchestrator<'a> {
    client: &'a dyn ClusterClient,
    config: &'a ValidatorConfig,
    graph: &'a TopologyGraph,
    machine: TrialStateMachine,
    aggregator: MetricsAggregator,
}

impl<'a> TrialOrchestrator<'a> {
    pub fn new(
        client: &'a dyn ClusterClient,
        config: &'a ValidatorConfig,
        graph: &'a TopologyGraph,
    ) -> Self {
        Self {
            client,
            config,
            graph,
            machine: TrialStateMachine::new(),
            aggregator: MetricsAggregator,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        self.config
    }

    /// Run one trial to completion, cleanup included.
    ///
    /// When both the trial and its cleanup fail, the trial's error is returned
    /// and the cleanup error is logged.
    pub async fn run(
        &self,
        runner: &mut dyn TrialRunner,
        execution: u32,
    ) -> std::result::Result<TrialResult, TrialFailure> {
        let name = runner.name().to_string();
        let mut tracker = PhaseTracker::new(&self.machine, &name);
        info!(trial = %name, kind = %runner.kind(), execution, "Starting trial");

        let observed = self.observe(runner, &mut tracker).await;
        if let Err(e) = &observed {
            error!(trial = %name, phase = %tracker.phase, error = %e, "Trial aborted");
            tracker.apply(TrialEvent::Aborted);
        }
        if matches!(tracker.phase, TrialPhase::Errored | TrialPhase::Aborted) {
            tracker.apply(TrialEvent::DeletionStarted);
        }

        let cleaned = self.cleanup(runner, &mut tracker).await;
        let phases = tracker.history;

        match (observed, cleaned) {
            (Ok((state, metrics)), Ok(())) => {
                info!(trial = %name, %state, "Trial complete");
                Ok(TrialResult {
                    execution,
                    name,
                    kind: runner.kind(),
                    state,
                    terminal_state: Some(state),
                    phases,
                    error: None,
                    metrics,
                })
            }
            (Ok((state, metrics)), Err(error)) => {
                warn!(trial = %name, %state, error = %error, "Cleanup failed after terminal status");
                Err(TrialFailure {
                    error,
                    phases,
                    terminal_state: Some(state),
                    metrics: metrics.map(Box::new),
                })
            }
            (Err(error), cleaned) => {
                if let Err(cleanup) = cleaned {
                    warn!(trial = %name, error = %cleanup, "Cleanup failed after aborted trial");
                }
                let terminal_state = observed_terminal_state(&phases);
                Err(TrialFailure {
                    error,
                    phases,
                    terminal_state,
                    metrics: None,
                })
            }
        }
    }

    async fn observe(
        &self,
        runner: &mut dyn TrialRunner,
        tracker: &mut PhaseTracker<'_>,
    ) -> Result<(TrialState, Option<TrialMetrics>)> {
        tracker.apply(TrialEvent::SubmitStarted);
        runner.submit(self.client, self.config).await?;
        tracker.apply(TrialEvent::Submitted);

        match runner.await_terminal(self.client, self.config).await? {
            TerminalOutcome::Errored => {
                tracker.apply(TrialEvent::ReachedError);
                return Ok((TrialState::Errored, None));
            }
            TerminalOutcome::Finished => tracker.apply(TrialEvent::ReachedFinished),
        }

        tracker.apply(TrialEvent::CollectionStarted);
        let metrics = self.collect_metrics(runner).await?;
        tracker.apply(TrialEvent::MetricsCollected);
        Ok((TrialState::Finished, Some(metrics)))
    }

    async fn collect_metrics(&self, runner: &mut dyn TrialRunner) -> Result<TrialMetrics> {
        let pods = self.wait_for_pods(runner.expected_pods(self.config)).await?;
        let initialization_timestamps = self.first_log_lines(&pods).await?;
        let report = runner.collect_placement(self.client, self.config).await?;
        let hops = self.score(&report)?;

        let observations = Observations {
            creation_timestamps: report.creation_timestamps,
            initialization_timestamps,
            placements: report.placements,
            links_bandwidth: report.links_bandwidth,
            allocation: report.allocation,
        };
        self.aggregator
            .aggregate(observations, report.hop_strategy, hops)
    }

    /// Poll until at least `expected` pods exist and all of them are running.
    async fn wait_for_pods(&self, expected: usize) -> Result<Vec<PodSummary>> {
        let client = self.client;
        let pods = self
            .config
            .retry
            .pod_readiness
            .execute("wait for pods running", || async move {
                let pods = client.list_pods().await?;
                if pods.len() < expected {
                    return Err(Error::Transient(format!(
                        "{} of {expected} pods created",
                        pods.len()
                    )));
                }
                if let Some(pod) = pods.iter().find(|p| !p.is_running()) {
                    return Err(Error::Transient(format!(
                        "pod {} in phase {}",
                        pod.name,
                        pod.phase.as_deref().unwrap_or("Unknown")
                    )));
                }
                Ok(pods)
            })
            .await?;

        info!(pods = pods.len(), "All pods running");
        Ok(pods)
    }

    async fn first_log_lines(&self, pods: &[PodSummary]) -> Result<BTreeMap<String, String>> {
        let client = self.client;
        let mut lines = BTreeMap::new();
        for pod in pods {
            let pod_name = pod.name.as_str();
            let line = self
                .config
                .retry
                .get
                .execute("read pod log", || async move {
                    let line = client.pod_log_first_line(pod_name).await?;
                    if line.trim().is_empty() {
                        return Err(Error::Transient(format!("pod {pod_name} has not logged yet")));
                    }
                    Ok(line)
                })
                .await?;
            lines.insert(pod.name.clone(), line);
        }
        Ok(lines)
    }

    fn score(&self, report: &PlacementReport) -> Result<PlacementScore> {
        match report.hop_strategy {
            HopStrategy::ShortestPath => {
                // One finder per trial so cached paths never outlive the trial.
                let finder = ShortestPathFinder::new(self.graph);
                PlacementScorer::new(finder, self.config.root.clone()).score(&report.placements)
            }
            HopStrategy::ReportedPath => score_reported_paths(&report.reported_paths),
        }
    }

    async fn cleanup(&self, runner: &mut dyn TrialRunner, tracker: &mut PhaseTracker<'_>) -> Result<()> {
        runner.delete(self.client, self.config).await?;
        tracker.apply(TrialEvent::DeletionIssued);

        let client = self.client;
        self.config
            .retry
            .cleanup
            .execute("wait for namespace cleanup", || async move {
                let remaining = client.list_pods().await?.len();
                if remaining > 0 {
                    return Err(Error::Transient(format!("{remaining} pods remaining")));
                }
                Ok(())
            })
            .await?;

        tracker.apply(TrialEvent::CleanupObserved);
        debug!(trial = %tracker.trial, "Namespace empty");
        Ok(())
    }
}
