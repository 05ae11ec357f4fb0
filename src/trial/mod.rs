//! Trial execution.
//!
//! A trial submits a placement request, waits for the controller to settle it,
//! measures the result and removes every resource it created.
//!
//! ## Architecture
//!
//! - `runner`: the [`TrialRunner`] capability set
//! - `placer`, `splits`: the two kinds of trial
//! - `orchestrator`: phase sequencing, pod readiness and cleanup
//! - `state_machine`: the phase transition table
//! - `retry`: fixed-interval retry used for every cluster call
//! - `batch`: sequential batches of trials

pub mod batch;
pub mod error;
pub mod orchestrator;
pub mod placer;
pub mod retry;
pub mod runner;
pub mod splits;
pub mod state_machine;

pub use batch::{BatchSummary, run_batch};
pub use error::{Error, Result};
pub use orchestrator::{TrialFailure, TrialOrchestrator};
pub use placer::PlacerTrial;
pub use retry::RetryPolicy;
pub use runner::{PlacementReport, TerminalOutcome, TrialKind, TrialRunner};
pub use splits::SplitsTrial;
pub use state_machine::{TrialEvent, TrialPhase, TrialStateMachine};
