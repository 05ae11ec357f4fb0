//! Error types for trial execution.
//!
//! Defines the validator's error taxonomy with classification for retry behavior.

use std::time::Duration;
use thiserror::Error;

/// Error type for validator operations
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Condition that is expected to clear on a later poll
    #[error("Transient error: {0}")]
    Transient(String),

    /// Resource exists but required status fields are not populated yet
    #[error("Malformed resource {resource}: {reason}")]
    MalformedResource { resource: String, reason: String },

    /// Retry budget was spent without a successful attempt
    #[error("Retry budget exhausted for {operation} after {attempts} attempts ({elapsed:?}): {last}")]
    RetryExhausted {
        operation: &'static str,
        attempts: u32,
        elapsed: Duration,
        last: Box<Error>,
    },

    /// Node is not part of the topology graph
    #[error("Unknown topology node: {0}")]
    UnknownNode(String),

    /// No path connects the two nodes
    #[error("No path from {from} to {to}")]
    NoPath { from: String, to: String },

    /// Aggregation had zero usable samples
    #[error("No data: {0}")]
    NoData(String),

    /// Topology configuration is invalid
    #[error("Invalid topology: {0}")]
    Topology(String),

    /// Trial request template could not be used
    #[error("Template error: {0}")]
    Template(String),

    /// Timestamp could not be parsed
    #[error("Timestamp error: {0}")]
    Timestamp(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a `MalformedResource` error.
    pub fn malformed(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedResource {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status code of an API error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Kube(kube::Error::Api(e)) => Some(e.code),
            _ => None,
        }
    }

    /// Check if this error indicates the resource already exists
    pub fn is_conflict(&self) -> bool {
        self.status_code() == Some(409)
    }

    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Check if this error should be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube(e) => {
                // Retry on network errors, rate limiting, and server errors
                matches!(
                    e,
                    kube::Error::Api(api_err) if api_err.code >= 500 || api_err.code == 429
                ) || matches!(e, kube::Error::Service(_))
            }
            Error::Transient(_) | Error::MalformedResource { .. } => true,
            Error::RetryExhausted { .. }
            | Error::UnknownNode(_)
            | Error::NoPath { .. }
            | Error::NoData(_)
            | Error::Topology(_)
            | Error::Template(_)
            | Error::Timestamp(_) => false,
            Error::Io(_) | Error::Yaml(_) | Error::Csv(_) | Error::Serialization(_) => false,
        }
    }

    /// Check if this error is an exhausted retry budget
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, Error::RetryExhausted { .. })
    }
}

/// Result type alias for validator operations
pub type Result<T> = std::result::Result<T, Error>;
