//! End-to-end trial scenarios against the mock cluster.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use placement_validator::config::ValidatorConfig;
use placement_validator::crd::{SplitStatus, SplitsPlacerStatus};
use placement_validator::metrics::TrialState;
use placement_validator::topology::{HopStrategy, TopologyGraph};
use placement_validator::trial::runner::AWAIT_TERMINAL_OPERATION;
use placement_validator::trial::{
    Error, PlacerTrial, SplitsTrial, TrialOrchestrator, TrialPhase, TrialRunner,
};

use crate::common::fixtures::{SplitBuilder, SplitsPlacerBuilder};
use crate::common::init_tracing;
use crate::mock_cluster::{Call, MockCluster, split_pods};

const HAPPY_PHASES: [TrialPhase; 8] = [
    TrialPhase::Created,
    TrialPhase::Submitting,
    TrialPhase::AwaitingTerminalStatus,
    TrialPhase::Finished,
    TrialPhase::CollectingMetrics,
    TrialPhase::Deleting,
    TrialPhase::AwaitingCleanup,
    TrialPhase::Done,
];

fn placer_template() -> PlacerTrial {
    PlacerTrial::new(
        SplitsPlacerBuilder::new("placer")
            .ru("split1", "node6")
            .ru("split2", "node10")
            .build(),
    )
}

/// Status of a placer the controller finished, with paths for both splits.
fn finished_placer_status() -> SplitsPlacerStatus {
    SplitsPlacerBuilder::new("placer")
        .state("Finished")
        .allocated(2, 0.75)
        .remaining_bandwidth("link-16-14", 800.0)
        .build()
        .status
        .unwrap()
}

/// The placer the controller rewrote with paths.
fn placed_placer() -> placement_validator::crd::SplitsPlacer {
    SplitsPlacerBuilder::new("placer")
        .ru("split1", "node6")
        .placed("node14", "node3", &["node16", "node14", "node3", "node6"])
        .ru("split2", "node10")
        .placed("node15", "node4", &["node16", "node15", "node4", "node10"])
        .created()
        .build()
}

fn status(state: &str) -> Option<SplitsPlacerStatus> {
    Some(SplitsPlacerStatus {
        state: Some(state.to_string()),
        ..SplitsPlacerStatus::default()
    })
}

fn with_logs(mut cluster: MockCluster, splits: &[(&str, &str)]) -> MockCluster {
    for (split, line) in splits {
        for role in ["cu", "du", "ru"] {
            cluster = cluster.with_log(&format!("{role}-{split}-0"), line);
        }
    }
    cluster
}

fn split_status(cu: &str, du: &str, ru: &str, state: &str) -> SplitStatus {
    SplitStatus {
        cu_node: Some(cu.to_string()),
        du_node: Some(du.to_string()),
        ru_node: Some(ru.to_string()),
        state: Some(state.to_string()),
        ..SplitStatus::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_placer_happy_path_reported_paths() {
    init_tracing();
    let cluster = MockCluster::new()
        .with_existing_placer(placed_placer())
        .with_placer_statuses(vec![None, status("Pending"), Some(finished_placer_status())])
        .with_pods(vec![
            split_pods(&["split1"], "Pending"),
            split_pods(&["split1", "split2"], "Running"),
        ])
        .with_pods_after_delete(vec![split_pods(&["split1"], "Terminating"), vec![]]);
    let cluster = with_logs(
        cluster,
        &[
            ("split1", "2024-01-01T00:00:10"),
            ("split2", r#"time="2024-01-01T00:00:20" level=info msg=ready"#),
        ],
    );
    let config = ValidatorConfig::default();
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let mut trial = placer_template();
    let result = orchestrator.run(&mut trial, 0).await.unwrap();

    assert_eq!(result.state, TrialState::Finished);
    assert_eq!(result.phases, HAPPY_PHASES);
    let metrics = result.metrics.unwrap();
    assert_eq!(metrics.hop_strategy, HopStrategy::ReportedPath);
    assert_eq!(metrics.hops.per_split["split1"], 3);
    assert_eq!(metrics.hops.per_split["split2"], 3);
    assert_eq!(metrics.hops.total_hops, 6);
    assert_eq!(metrics.average_initialization_secs, 15.0);
    assert_eq!(metrics.initialization_timestamps.len(), 6);
    assert_eq!(metrics.creation_timestamps["split1"], "2024-01-01T00:00:00Z");
    assert_eq!(metrics.links_bandwidth["link-16-14"], 800.0);
    let allocation = metrics.allocation.unwrap();
    assert_eq!(allocation.allocated_ratio, Some(100.0));
    assert_eq!(allocation.allocation_time, Some(0.75));

    assert!(cluster.placer_deleted());
    assert_eq!(cluster.count(|c| matches!(c, Call::DeletePlacer(_))), 1);
}

#[tokio::test(start_paused = true)]
async fn test_placer_shortest_path_reads_provisioned_splits() {
    let cluster = MockCluster::new()
        .with_existing_placer(placed_placer())
        .with_existing_split(
            SplitBuilder::new("split1")
                .placed("node16", "node14", "node6")
                .state("Running")
                .build(),
        )
        .with_existing_split(
            SplitBuilder::new("split2")
                .placed("node12", "node12", "node11")
                .state("Running")
                .build(),
        )
        .with_placer_statuses(vec![Some(finished_placer_status())])
        .with_pods(vec![split_pods(&["split1", "split2"], "Running")]);
    let cluster = with_logs(
        cluster,
        &[("split1", "2024-01-01T00:00:30"), ("split2", "2024-01-01T00:00:30")],
    );
    let config = ValidatorConfig {
        hop_strategy: Some(HopStrategy::ShortestPath),
        ..ValidatorConfig::default()
    };
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let result = orchestrator.run(&mut placer_template(), 0).await.unwrap();

    let metrics = result.metrics.unwrap();
    assert_eq!(metrics.hop_strategy, HopStrategy::ShortestPath);
    // node16→node16 (0) + node16→node14 (1) + node14→node6 (2)
    assert_eq!(metrics.hops.per_split["split1"], 3);
    // node16→node12 (4) + node12→node12 (0) + node12→node11 (1)
    assert_eq!(metrics.hops.per_split["split2"], 5);
    assert_eq!(metrics.hops.average_hops, 4.0);
    assert_eq!(metrics.average_initialization_secs, 30.0);
    assert_eq!(cluster.count(|c| matches!(c, Call::GetSplit(_))), 2);
}

#[tokio::test(start_paused = true)]
async fn test_placer_error_state_skips_metrics() {
    let cluster = MockCluster::new()
        .with_placer_statuses(vec![status("Pending"), status("Error")])
        .with_pods(vec![split_pods(&["split1"], "Running")]);
    let config = ValidatorConfig::default();
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let result = orchestrator.run(&mut placer_template(), 3).await.unwrap();

    assert_eq!(result.state, TrialState::Errored);
    assert_eq!(result.execution, 3);
    assert!(result.metrics.is_none());
    assert_eq!(
        result.phases,
        [
            TrialPhase::Created,
            TrialPhase::Submitting,
            TrialPhase::AwaitingTerminalStatus,
            TrialPhase::Errored,
            TrialPhase::Deleting,
            TrialPhase::AwaitingCleanup,
            TrialPhase::Done,
        ]
    );
    assert_eq!(cluster.count(|c| matches!(c, Call::PodLog(_))), 0);
    assert!(cluster.placer_deleted());
}

#[tokio::test(start_paused = true)]
async fn test_placer_never_terminal_still_cleans_up() {
    init_tracing();
    let cluster = MockCluster::new()
        .with_placer_statuses(vec![status("Pending")])
        .with_pods(vec![split_pods(&["split1"], "Running")])
        .with_pods_after_delete(vec![
            split_pods(&["split1"], "Terminating"),
            split_pods(&["split1"], "Terminating"),
            vec![],
        ]);
    let budget = Duration::from_secs(60);
    let config = ValidatorConfig::default().with_terminal_timeout(budget);
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let start = Instant::now();
    let failure = orchestrator.run(&mut placer_template(), 0).await.unwrap_err();

    match &failure.error {
        Error::RetryExhausted {
            operation, last, ..
        } => {
            assert_eq!(*operation, AWAIT_TERMINAL_OPERATION);
            assert!(matches!(**last, Error::Transient(_)));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(start.elapsed() >= budget);
    assert_eq!(failure.phases.last(), Some(&TrialPhase::Done));
    assert!(failure.phases.contains(&TrialPhase::Aborted));

    // Delete was issued, then pods were polled until none remained.
    let delete_at = cluster
        .position(|c| matches!(c, Call::DeletePlacer(_)))
        .expect("delete issued");
    let calls = cluster.calls();
    let polls_after_delete = calls[delete_at..]
        .iter()
        .filter(|c| **c == Call::ListPods)
        .count();
    assert_eq!(polls_after_delete, 3);
}

#[tokio::test(start_paused = true)]
async fn test_placer_server_errors_while_waiting_stay_within_terminal_budget() {
    let cluster = MockCluster::new()
        .with_placer_statuses(vec![status("Pending")])
        .failing_reads_after(11, 503);
    let budget = Duration::from_secs(60);
    let config = ValidatorConfig::default().with_terminal_timeout(budget);
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let start = Instant::now();
    let failure = orchestrator.run(&mut placer_template(), 0).await.unwrap_err();
    let elapsed = start.elapsed();

    match &failure.error {
        Error::RetryExhausted {
            operation, last, ..
        } => {
            assert_eq!(*operation, AWAIT_TERMINAL_OPERATION);
            assert_eq!(last.status_code(), Some(503));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(elapsed >= budget);
    // one read per 5s poll, no nested retry budget
    assert!(elapsed <= Duration::from_secs(65));
    assert_eq!(cluster.count(|c| matches!(c, Call::GetPlacer(_))), 13);
    assert!(cluster.placer_deleted());
}

#[tokio::test(start_paused = true)]
async fn test_splits_server_errors_while_waiting_stay_within_terminal_budget() {
    let pending = BTreeMap::from([(
        "split1".to_string(),
        SplitStatus {
            state: Some("Pending".to_string()),
            ..SplitStatus::default()
        },
    )]);
    let cluster = MockCluster::new()
        .with_split_statuses(vec![pending])
        .failing_reads_after(2, 503);
    let budget = Duration::from_secs(60);
    let config = ValidatorConfig::default().with_terminal_timeout(budget);
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let start = Instant::now();
    let mut trial = SplitsTrial::new(vec![SplitBuilder::new("split1").build()]);
    let failure = orchestrator.run(&mut trial, 0).await.unwrap_err();

    match &failure.error {
        Error::RetryExhausted {
            operation, last, ..
        } => {
            assert_eq!(*operation, AWAIT_TERMINAL_OPERATION);
            assert_eq!(last.status_code(), Some(503));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(start.elapsed() <= Duration::from_secs(65));
    assert_eq!(cluster.count(|c| matches!(c, Call::DeleteSplit(_))), 1);
}

#[tokio::test(start_paused = true)]
async fn test_placer_conflict_on_create_is_success() {
    let cluster = MockCluster::new()
        .with_existing_placer(placed_placer())
        .with_placer_statuses(vec![status("Error")]);
    let config = ValidatorConfig::default();
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let result = orchestrator.run(&mut placer_template(), 0).await.unwrap();

    assert_eq!(result.state, TrialState::Errored);
    assert_eq!(cluster.count(|c| matches!(c, Call::CreatePlacer(_))), 1);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_on_delete_is_success() {
    let cluster = MockCluster::new()
        .with_placer_statuses(vec![status("Error")])
        .failing_delete(404);
    let config = ValidatorConfig::default();
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let result = orchestrator.run(&mut placer_template(), 0).await.unwrap();

    assert_eq!(result.phases.last(), Some(&TrialPhase::Done));
    assert_eq!(cluster.count(|c| matches!(c, Call::DeletePlacer(_))), 1);
}

#[tokio::test(start_paused = true)]
async fn test_forbidden_create_aborts_without_polling() {
    let cluster = MockCluster::new().failing_create(403);
    let config = ValidatorConfig::default();
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let failure = orchestrator.run(&mut placer_template(), 0).await.unwrap_err();

    assert_eq!(failure.error.status_code(), Some(403));
    assert_eq!(
        failure.phases,
        [
            TrialPhase::Created,
            TrialPhase::Submitting,
            TrialPhase::Aborted,
            TrialPhase::Deleting,
            TrialPhase::AwaitingCleanup,
            TrialPhase::Done,
        ]
    );
    assert_eq!(cluster.count(|c| matches!(c, Call::CreatePlacer(_))), 1);
    assert_eq!(cluster.count(|c| matches!(c, Call::GetPlacer(_))), 0);
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_on_create_exhaust_budget() {
    let cluster = MockCluster::new().failing_create(503);
    let config = ValidatorConfig::default();
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let start = Instant::now();
    let failure = orchestrator.run(&mut placer_template(), 0).await.unwrap_err();

    assert!(failure.error.is_retry_exhausted());
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(60));
    assert!(elapsed <= Duration::from_secs(62));
    // 60s budget at a 2s interval
    assert!(cluster.count(|c| matches!(c, Call::CreatePlacer(_))) >= 30);
}

#[tokio::test(start_paused = true)]
async fn test_failed_cleanup_after_success_fails_trial() {
    let cluster = MockCluster::new()
        .with_placer_statuses(vec![status("Error")])
        .failing_delete(403);
    let config = ValidatorConfig::default();
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let failure = orchestrator.run(&mut placer_template(), 0).await.unwrap_err();

    assert_eq!(failure.error.status_code(), Some(403));
    assert_eq!(failure.phases.last(), Some(&TrialPhase::Deleting));
    assert_eq!(failure.terminal_state, Some(TrialState::Errored));
}

#[tokio::test(start_paused = true)]
async fn test_failed_cleanup_after_finish_keeps_metrics() {
    let cluster = MockCluster::new()
        .with_existing_placer(placed_placer())
        .with_placer_statuses(vec![Some(finished_placer_status())])
        .with_pods(vec![split_pods(&["split1", "split2"], "Running")])
        .failing_delete(403);
    let cluster = with_logs(
        cluster,
        &[("split1", "2024-01-01T00:00:10"), ("split2", "2024-01-01T00:00:20")],
    );
    let config = ValidatorConfig::default();
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let failure = orchestrator.run(&mut placer_template(), 0).await.unwrap_err();

    assert_eq!(failure.error.status_code(), Some(403));
    assert_eq!(failure.terminal_state, Some(TrialState::Finished));
    let metrics = failure.metrics.expect("metrics kept");
    assert_eq!(metrics.hops.total_hops, 6);
    assert_eq!(metrics.average_initialization_secs, 15.0);
}

#[tokio::test(start_paused = true)]
async fn test_splits_trial_happy_path() {
    init_tracing();
    let statuses = BTreeMap::from([
        (
            "split1".to_string(),
            split_status("node16", "node14", "node6", "Running"),
        ),
        (
            "split2".to_string(),
            split_status("node16", "node15", "node10", "Running"),
        ),
    ]);
    let pending = BTreeMap::from([(
        "split1".to_string(),
        SplitStatus {
            state: Some("Pending".to_string()),
            ..SplitStatus::default()
        },
    )]);
    let cluster = MockCluster::new()
        .with_split_statuses(vec![BTreeMap::new(), pending, statuses])
        .with_pods(vec![
            split_pods(&["split1", "split2"], "ContainerCreating"),
            split_pods(&["split1", "split2"], "Running"),
        ]);
    let cluster = with_logs(
        cluster,
        &[("split1", "2024-01-01T00:01:00"), ("split2", "2024-01-01T00:00:40")],
    );
    let config = ValidatorConfig::default();
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let mut trial = SplitsTrial::new(vec![
        SplitBuilder::new("split1").requested("node16", "node14", "node6").build(),
        SplitBuilder::new("split2").requested("node16", "node15", "node10").build(),
    ]);
    assert_eq!(trial.expected_pods(&config), 6);
    let result = orchestrator.run(&mut trial, 0).await.unwrap();

    assert_eq!(result.state, TrialState::Finished);
    assert_eq!(result.phases, HAPPY_PHASES);
    let metrics = result.metrics.unwrap();
    assert_eq!(metrics.hop_strategy, HopStrategy::ShortestPath);
    assert_eq!(metrics.hops.per_split["split1"], 3);
    // node16→node16 (0) + node16→node15 (1) + node15→node10 (2)
    assert_eq!(metrics.hops.per_split["split2"], 3);
    assert_eq!(metrics.average_initialization_secs, 50.0);
    assert_eq!(metrics.placements["split2"].du_node, "node15");
    assert!(metrics.allocation.is_none());

    assert_eq!(cluster.count(|c| matches!(c, Call::CreateSplit(_))), 2);
    assert_eq!(cluster.count(|c| matches!(c, Call::DeleteSplit(_))), 2);
}

#[tokio::test(start_paused = true)]
async fn test_splits_trial_any_error_is_errored() {
    let statuses = BTreeMap::from([
        (
            "split1".to_string(),
            split_status("node16", "node14", "node6", "Running"),
        ),
        (
            "split2".to_string(),
            SplitStatus {
                state: Some("Error".to_string()),
                ..SplitStatus::default()
            },
        ),
    ]);
    let cluster = MockCluster::new().with_split_statuses(vec![statuses]);
    let config = ValidatorConfig::default();
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let mut trial = SplitsTrial::new(vec![
        SplitBuilder::new("split1").build(),
        SplitBuilder::new("split2").build(),
    ]);
    let result = orchestrator.run(&mut trial, 0).await.unwrap();

    assert_eq!(result.state, TrialState::Errored);
    assert_eq!(cluster.count(|c| matches!(c, Call::ListPods)), 1);
    assert_eq!(cluster.count(|c| matches!(c, Call::DeleteSplit(_))), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_placement_node_aborts_trial() {
    let statuses = BTreeMap::from([(
        "split1".to_string(),
        split_status("node16", "node99", "node6", "Running"),
    )]);
    let cluster = MockCluster::new()
        .with_split_statuses(vec![statuses])
        .with_pods(vec![split_pods(&["split1"], "Running")]);
    let cluster = with_logs(cluster, &[("split1", "2024-01-01T00:00:05")]);
    let config = ValidatorConfig::default();
    let graph = TopologyGraph::reference();
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let mut trial = SplitsTrial::new(vec![SplitBuilder::new("split1").build()]);
    let failure = orchestrator.run(&mut trial, 0).await.unwrap_err();

    assert!(matches!(&failure.error, Error::UnknownNode(n) if n == "node99"));
    assert_eq!(failure.terminal_state, Some(TrialState::Finished));
    assert!(failure.metrics.is_none());
    assert!(failure.phases.contains(&TrialPhase::CollectingMetrics));
    assert_eq!(failure.phases.last(), Some(&TrialPhase::Done));
}
