//! Cluster resource client.
//!
//! The validator talks to the API server only through [`ClusterClient`], so the
//! trial orchestration can be driven against an in-memory cluster in tests.
//!
//! ## Architecture
//!
//! - `kube_client`: [`KubeClusterClient`], the `kube::Api` backed implementation
//! - `pods`: [`PodSummary`] and pod name conventions

pub mod kube_client;
pub mod pods;

pub use kube_client::KubeClusterClient;
pub use pods::{PodSummary, split_name_from_pod};

use async_trait::async_trait;

use crate::crd::{Split, SplitsPlacer};
use crate::trial::error::Result;

/// Operations the validator needs from the cluster.
///
/// All calls are scoped to one namespace. Errors are returned as received;
/// callers decide whether a status code is an expected outcome.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Namespace every call is scoped to.
    fn namespace(&self) -> &str;

    async fn create_splits_placer(&self, placer: &SplitsPlacer) -> Result<SplitsPlacer>;

    async fn get_splits_placer(&self, name: &str) -> Result<SplitsPlacer>;

    async fn delete_splits_placer(&self, name: &str) -> Result<()>;

    async fn create_split(&self, split: &Split) -> Result<Split>;

    async fn get_split(&self, name: &str) -> Result<Split>;

    async fn list_splits(&self) -> Result<Vec<Split>>;

    async fn delete_split(&self, name: &str) -> Result<()>;

    /// Every pod in the namespace with its current phase.
    async fn list_pods(&self) -> Result<Vec<PodSummary>>;

    /// First line of the pod's log, empty if nothing has been logged yet.
    async fn pod_log_first_line(&self, pod: &str) -> Result<String>;
}
