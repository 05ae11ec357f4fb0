//! Finite state machine for the lifecycle of one trial.
//!
//! Every trial walks `Created → Submitting → AwaitingTerminalStatus →
//! {Finished | Errored} → CollectingMetrics → Deleting → AwaitingCleanup → Done`.
//! Any fatal error before deletion moves the trial to `Aborted`, which still
//! leads through `Deleting` and `AwaitingCleanup` so the namespace is emptied
//! on every exit path.

use std::fmt;

use serde::Serialize;

/// Phases of a single trial.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum TrialPhase {
    #[default]
    Created,
    Submitting,
    AwaitingTerminalStatus,
    Finished,
    Errored,
    CollectingMetrics,
    Aborted,
    Deleting,
    AwaitingCleanup,
    Done,
}

impl fmt::Display for TrialPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialPhase::Created => write!(f, "Created"),
            TrialPhase::Submitting => write!(f, "Submitting"),
            TrialPhase::AwaitingTerminalStatus => write!(f, "AwaitingTerminalStatus"),
            TrialPhase::Finished => write!(f, "Finished"),
            TrialPhase::Errored => write!(f, "Errored"),
            TrialPhase::CollectingMetrics => write!(f, "CollectingMetrics"),
            TrialPhase::Aborted => write!(f, "Aborted"),
            TrialPhase::Deleting => write!(f, "Deleting"),
            TrialPhase::AwaitingCleanup => write!(f, "AwaitingCleanup"),
            TrialPhase::Done => write!(f, "Done"),
        }
    }
}

/// Events that move a trial between phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrialEvent {
    /// Submission of the trial request has started
    SubmitStarted,
    /// The request was accepted by the API server (or already existed)
    Submitted,
    /// The controller reported the finished terminal state
    ReachedFinished,
    /// The controller reported the error terminal state
    ReachedError,
    /// Metrics collection started
    CollectionStarted,
    /// Placement and timing data were collected
    MetricsCollected,
    /// A fatal error ended the observation part of the trial
    Aborted,
    /// Deletion of the trial request started
    DeletionStarted,
    /// Delete requests were issued
    DeletionIssued,
    /// No pods remain in the namespace
    CleanupObserved,
}

impl fmt::Display for TrialEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialEvent::SubmitStarted => write!(f, "SubmitStarted"),
            TrialEvent::Submitted => write!(f, "Submitted"),
            TrialEvent::ReachedFinished => write!(f, "ReachedFinished"),
            TrialEvent::ReachedError => write!(f, "ReachedError"),
            TrialEvent::CollectionStarted => write!(f, "CollectionStarted"),
            TrialEvent::MetricsCollected => write!(f, "MetricsCollected"),
            TrialEvent::Aborted => write!(f, "Aborted"),
            TrialEvent::DeletionStarted => write!(f, "DeletionStarted"),
            TrialEvent::DeletionIssued => write!(f, "DeletionIssued"),
            TrialEvent::CleanupObserved => write!(f, "CleanupObserved"),
        }
    }
}

/// A state transition definition
#[derive(Debug)]
pub struct Transition {
    /// Source state
    pub from: TrialPhase,
    /// Target state
    pub to: TrialPhase,
    /// Event that triggers this transition
    pub event: TrialEvent,
    /// Human-readable description of this transition
    pub description: &'static str,
}

impl Transition {
    const fn new(
        from: TrialPhase,
        to: TrialPhase,
        event: TrialEvent,
        description: &'static str,
    ) -> Self {
        Self {
            from,
            to,
            event,
            description,
        }
    }
}

/// Result of attempting a state transition
#[derive(Debug, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition was successful
    Success {
        from: TrialPhase,
        to: TrialPhase,
        event: TrialEvent,
        description: &'static str,
    },
    /// Transition was not valid for current state
    InvalidTransition {
        current: TrialPhase,
        event: TrialEvent,
    },
}

/// Transition table for the trial lifecycle
pub struct TrialStateMachine {
    transitions: Vec<Transition>,
}

impl Default for TrialStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TrialStateMachine {
    /// Create a new state machine with the defined transition table
    pub fn new() -> Self {
        use TrialEvent as E;
        use TrialPhase as P;

        Self {
            transitions: vec![
                // === Submission ===
                Transition::new(
                    P::Created,
                    P::Submitting,
                    E::SubmitStarted,
                    "Submitting trial request",
                ),
                Transition::new(
                    P::Submitting,
                    P::AwaitingTerminalStatus,
                    E::Submitted,
                    "Request accepted, polling status",
                ),
                Transition::new(
                    P::Submitting,
                    P::Aborted,
                    E::Aborted,
                    "Submission failed",
                ),
                // === Status polling ===
                Transition::new(
                    P::AwaitingTerminalStatus,
                    P::Finished,
                    E::ReachedFinished,
                    "Controller finished placement",
                ),
                Transition::new(
                    P::AwaitingTerminalStatus,
                    P::Errored,
                    E::ReachedError,
                    "Controller reported placement error",
                ),
                Transition::new(
                    P::AwaitingTerminalStatus,
                    P::Aborted,
                    E::Aborted,
                    "Terminal status not observed",
                ),
                // === Metrics ===
                Transition::new(
                    P::Finished,
                    P::CollectingMetrics,
                    E::CollectionStarted,
                    "Collecting placement and timing data",
                ),
                Transition::new(
                    P::CollectingMetrics,
                    P::Deleting,
                    E::MetricsCollected,
                    "Metrics collected, deleting request",
                ),
                Transition::new(
                    P::CollectingMetrics,
                    P::Aborted,
                    E::Aborted,
                    "Metrics collection failed",
                ),
                // Errored trials skip metrics collection
                Transition::new(
                    P::Errored,
                    P::Deleting,
                    E::DeletionStarted,
                    "Deleting errored request",
                ),
                Transition::new(
                    P::Aborted,
                    P::Deleting,
                    E::DeletionStarted,
                    "Deleting aborted request",
                ),
                // === Cleanup ===
                Transition::new(
                    P::Deleting,
                    P::AwaitingCleanup,
                    E::DeletionIssued,
                    "Delete issued, waiting for namespace to drain",
                ),
                Transition::new(
                    P::AwaitingCleanup,
                    P::Done,
                    E::CleanupObserved,
                    "Namespace empty, trial done",
                ),
                // Done is terminal
            ],
        }
    }

    /// Attempt to transition to a new state based on an event
    pub fn transition(&self, current: &TrialPhase, event: TrialEvent) -> TransitionResult {
        match self
            .transitions
            .iter()
            .find(|t| t.from == *current && t.event == event)
        {
            Some(t) => TransitionResult::Success {
                from: t.from,
                to: t.to,
                event,
                description: t.description,
            },
            None => TransitionResult::InvalidTransition {
                current: *current,
                event,
            },
        }
    }

    /// Check if a transition is valid
    pub fn can_transition(&self, from: &TrialPhase, event: &TrialEvent) -> bool {
        self.transitions
            .iter()
            .any(|t| t.from == *from && t.event == *event)
    }

    /// Get all valid events for a given state
    pub fn valid_events(&self, state: &TrialPhase) -> Vec<&TrialEvent> {
        self.transitions
            .iter()
            .filter(|t| t.from == *state)
            .map(|t| &t.event)
            .collect()
    }

    /// Whether `Done` is reachable from `from` using only abort and cleanup events.
    pub fn reaches_done(&self, from: &TrialPhase) -> bool {
        let mut current = *from;
        for _ in 0..self.transitions.len() {
            if current == TrialPhase::Done {
                return true;
            }
            let next = [
                TrialEvent::Aborted,
                TrialEvent::DeletionStarted,
                TrialEvent::DeletionIssued,
                TrialEvent::CleanupObserved,
            ]
            .into_iter()
            .find_map(|e| match self.transition(&current, e) {
                TransitionResult::Success { to, .. } => Some(to),
                TransitionResult::InvalidTransition { .. } => None,
            });
            match next {
                Some(to) => current = to,
                None => return false,
            }
        }
        current == TrialPhase::Done
    }
}
