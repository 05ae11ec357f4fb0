//! Sequential batches of trials.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::metrics::{TrialResult, TrialState};
use crate::report::ReportWriter;
use crate::trial::error::Result;
use crate::trial::orchestrator::TrialOrchestrator;
use crate::trial::runner::{TrialKind, TrialRunner};

/// Counts of trial outcomes plus every result, in execution order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchSummary {
    pub results: Vec<TrialResult>,
    pub counts: BTreeMap<String, usize>,
}

impl BatchSummary {
    fn record(&mut self, result: TrialResult) {
        *self.counts.entry(result.state.to_string()).or_default() += 1;
        self.results.push(result);
    }

    /// Number of trials that ended in `state`.
    pub fn count(&self, state: TrialState) -> usize {
        self.counts.get(&state.to_string()).copied().unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }
}

/// Run `executions` trials one after another.
///
/// `make_runner` builds the runner for each execution, typically by loading
/// the request template again. A trial that cannot be built or that fails is
/// recorded as [`TrialState::Failed`] and the batch moves on. Every result is
/// handed to `reporter`; report failures are logged only.
pub async fn run_batch<F>(
    orchestrator: &TrialOrchestrator<'_>,
    kind: TrialKind,
    executions: u32,
    mut make_runner: F,
    reporter: &dyn ReportWriter,
) -> BatchSummary
where
    F: FnMut(u32) -> Result<Box<dyn TrialRunner>>,
{
    let mut summary = BatchSummary::default();

    for execution in 0..executions {
        let result = match make_runner(execution) {
            Ok(mut runner) => match orchestrator.run(runner.as_mut(), execution).await {
                Ok(result) => result,
                Err(failure) => TrialResult {
                    terminal_state: failure.terminal_state,
                    metrics: failure.metrics.map(|metrics| *metrics),
                    ..TrialResult::failed(
                        execution,
                        runner.name(),
                        kind,
                        failure.phases,
                        failure.error,
                    )
                },
            },
            Err(e) => {
                warn!(execution, error = %e, "Could not build trial");
                TrialResult::failed(execution, format!("{kind}-{execution}"), kind, Vec::new(), e)
            }
        };

        if let Err(e) = reporter.write(&result) {
            warn!(execution, error = %e, "Failed to write trial report");
        }
        summary.record(result);
    }

    info!(
        total = summary.total(),
        finished = summary.count(TrialState::Finished),
        errored = summary.count(TrialState::Errored),
        failed = summary.count(TrialState::Failed),
        "Batch complete"
    );
    summary
}
