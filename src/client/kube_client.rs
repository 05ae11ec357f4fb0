//! `kube::Api` backed [`ClusterClient`].

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::debug;

use crate::client::{ClusterClient, PodSummary};
use crate::crd::{Split, SplitsPlacer};
use crate::trial::error::Result;

/// Upper bound on log bytes fetched when only the first line is needed.
const LOG_LIMIT_BYTES: i64 = 4096;

/// Cluster client for one namespace.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    namespace: String,
}

impl KubeClusterClient {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
        }
    }

    fn placers(&self) -> Api<SplitsPlacer> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn splits(&self) -> Api<Split> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn create_splits_placer(&self, placer: &SplitsPlacer) -> Result<SplitsPlacer> {
        debug!(name = %placer.name_any(), namespace = %self.namespace, "Creating SplitsPlacer");
        Ok(self.placers().create(&PostParams::default(), placer).await?)
    }

    async fn get_splits_placer(&self, name: &str) -> Result<SplitsPlacer> {
        Ok(self.placers().get(name).await?)
    }

    async fn delete_splits_placer(&self, name: &str) -> Result<()> {
        debug!(name, namespace = %self.namespace, "Deleting SplitsPlacer");
        self.placers().delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn create_split(&self, split: &Split) -> Result<Split> {
        debug!(name = %split.name_any(), namespace = %self.namespace, "Creating Split");
        Ok(self.splits().create(&PostParams::default(), split).await?)
    }

    async fn get_split(&self, name: &str) -> Result<Split> {
        Ok(self.splits().get(name).await?)
    }

    async fn list_splits(&self) -> Result<Vec<Split>> {
        Ok(self.splits().list(&ListParams::default()).await?.items)
    }

    async fn delete_split(&self, name: &str) -> Result<()> {
        debug!(name, namespace = %self.namespace, "Deleting Split");
        self.splits().delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn list_pods(&self) -> Result<Vec<PodSummary>> {
        let pods = self.pods().list(&ListParams::default()).await?;
        Ok(pods
            .items
            .into_iter()
            .map(|pod| PodSummary {
                name: pod.name_any(),
                phase: pod.status.and_then(|s| s.phase),
            })
            .collect())
    }

    async fn pod_log_first_line(&self, pod: &str) -> Result<String> {
        let params = LogParams {
            limit_bytes: Some(LOG_LIMIT_BYTES),
            ..LogParams::default()
        };
        let logs = self.pods().logs(pod, &params).await?;
        Ok(logs.lines().next().unwrap_or_default().to_string())
    }
}
