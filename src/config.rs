//! Validator configuration.
//!
//! Every tunable lives here with its default; the binary maps CLI flags onto
//! [`ValidatorConfig`] and the library never reads the environment itself.

use std::path::PathBuf;
use std::time::Duration;

use crate::topology::{HopStrategy, NodeName, REFERENCE_ROOT};
use crate::trial::retry::RetryPolicy;

/// Namespace the controller under test deploys into.
pub const DEFAULT_NAMESPACE: &str = "oai";

/// Directory receiving the per-template report files.
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Number of trials per batch.
pub const DEFAULT_EXECUTIONS: u32 = 5;

/// One CU, one DU and one RU pod per split.
pub const PODS_PER_SPLIT: usize = 3;

/// Budget for create, get and delete calls.
pub const API_CALL_BUDGET: Duration = Duration::from_secs(60);

/// Interval between create, get and delete attempts.
pub const API_CALL_INTERVAL: Duration = Duration::from_secs(2);

/// Budget for a placement request to reach a terminal state.
pub const TERMINAL_STATUS_BUDGET: Duration = Duration::from_secs(1200);

/// Interval between terminal status polls.
pub const TERMINAL_STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Interval between pod readiness and namespace cleanup polls.
pub const POD_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Status tokens that end the terminal-status wait for one resource kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminalStates {
    /// State meaning the controller completed the request.
    pub success: String,
    /// State meaning the controller gave up on the request.
    pub error: String,
}

impl TerminalStates {
    pub fn new(success: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: success.into(),
            error: error.into(),
        }
    }

    pub fn is_terminal(&self, state: &str) -> bool {
        state == self.success || state == self.error
    }

    pub fn is_error(&self, state: &str) -> bool {
        state == self.error
    }
}

/// Retry policies for each class of cluster interaction.
#[derive(Clone, Copy, Debug)]
pub struct RetryBudgets {
    pub create: RetryPolicy,
    pub get: RetryPolicy,
    pub delete: RetryPolicy,
    pub terminal_status: RetryPolicy,
    /// No overall deadline; bounded by whatever runs the validator.
    pub pod_readiness: RetryPolicy,
    /// No overall deadline; the next trial must not start on a dirty namespace.
    pub cleanup: RetryPolicy,
}

impl Default for RetryBudgets {
    fn default() -> Self {
        let api_call = RetryPolicy::new(API_CALL_BUDGET, API_CALL_INTERVAL);
        Self {
            create: api_call,
            get: api_call,
            delete: api_call,
            terminal_status: RetryPolicy::new(TERMINAL_STATUS_BUDGET, TERMINAL_STATUS_INTERVAL),
            pod_readiness: RetryPolicy::unbounded(POD_POLL_INTERVAL),
            cleanup: RetryPolicy::unbounded(POD_POLL_INTERVAL),
        }
    }
}

/// Complete validator configuration.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    pub namespace: String,
    /// Ingress node every split's hop count starts from.
    pub root: NodeName,
    /// Overrides the per-kind default hop strategy when set.
    pub hop_strategy: Option<HopStrategy>,
    pub placer_states: TerminalStates,
    pub split_states: TerminalStates,
    pub retry: RetryBudgets,
    pub pods_per_split: usize,
    pub results_dir: PathBuf,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            root: REFERENCE_ROOT.to_string(),
            hop_strategy: None,
            placer_states: TerminalStates::new("Finished", "Error"),
            split_states: TerminalStates::new("Running", "Error"),
            retry: RetryBudgets::default(),
            pods_per_split: PODS_PER_SPLIT,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
        }
    }
}

impl ValidatorConfig {
    /// Replace the terminal-status budget, keeping its poll interval.
    pub fn with_terminal_timeout(mut self, max_wait: Duration) -> Self {
        self.retry.terminal_status.max_wait = Some(max_wait);
        self
    }
}
