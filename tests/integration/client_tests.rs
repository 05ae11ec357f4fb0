//! `KubeClusterClient` against a real API server.

use placement_validator::client::{ClusterClient, KubeClusterClient};
use placement_validator::trial::runner::{conflict_as_created, not_found_as_deleted};

use crate::cluster::SharedTestCluster;
use crate::common::fixtures::{SplitBuilder, SplitsPlacerBuilder};
use crate::common::init_tracing;
use crate::namespace::TestNamespace;

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires Kubernetes cluster"]
async fn test_empty_namespace_has_no_pods() {
    init_tracing();
    let cluster = SharedTestCluster::get().await;
    let ns = TestNamespace::create(cluster.new_client().await, "validator-pods").await;
    let client = KubeClusterClient::new(ns.client(), ns.name());

    assert_eq!(client.namespace(), ns.name());
    assert!(client.list_pods().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires Kubernetes cluster"]
async fn test_missing_resources_are_not_found() {
    init_tracing();
    let cluster = SharedTestCluster::get().await;
    let ns = TestNamespace::create(cluster.new_client().await, "validator-missing").await;
    let client = KubeClusterClient::new(ns.client(), ns.name());

    let err = client.get_splits_placer("absent").await.unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {err}");
    assert!(not_found_as_deleted(client.delete_split("absent").await).is_ok());
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires Kubernetes cluster"]
async fn test_create_twice_conflicts() {
    init_tracing();
    let cluster = SharedTestCluster::get().await;
    let ns = TestNamespace::create(cluster.new_client().await, "validator-conflict").await;
    let client = KubeClusterClient::new(ns.client(), ns.name());

    let placer = SplitsPlacerBuilder::new("placer").ru("split1", "node6").build();
    let created = client.create_splits_placer(&placer).await.unwrap();
    assert!(created.metadata.creation_timestamp.is_some());

    let again = conflict_as_created(client.create_splits_placer(&placer).await).unwrap();
    assert!(again.is_none());

    let split = SplitBuilder::new("split1").requested("node16", "node14", "node6").build();
    client.create_split(&split).await.unwrap();
    let listed = client.list_splits().await.unwrap();
    assert_eq!(listed.len(), 1);

    client.delete_split("split1").await.unwrap();
    client.delete_splits_placer("placer").await.unwrap();
}
