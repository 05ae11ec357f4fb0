//! SplitsPlacer Custom Resource Definition.
//!
//! A SplitsPlacer asks the controller to place every listed radio unit's split
//! onto the topology. The controller writes the chosen path back into
//! `spec.rus[].path` and reports progress in `status`.

use std::collections::BTreeMap;

use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// SplitsPlacer is a placement request covering several splits.
///
/// Example:
/// ```yaml
/// apiVersion: oai.unisinos/v1beta1
/// kind: SplitsPlacer
/// metadata:
///   name: splitsplacer
/// spec:
///   topologyConfig: topology-config
///   rus:
///     - splitName: split1
///       ruNode: node6
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize)]
#[kube(
    group = "oai.unisinos",
    version = "v1beta1",
    kind = "SplitsPlacer",
    plural = "splitsplacers",
    status = "SplitsPlacerStatus",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct SplitsPlacerSpec {
    /// Radio units to place, one split each.
    #[serde(default)]
    pub rus: Vec<RuPosition>,

    /// Address of the core network the CUs connect to.
    #[serde(rename = "coreIP", default, skip_serializing_if = "Option::is_none")]
    pub core_ip: Option<String>,

    /// Name of the ConfigMap holding the controller's topology.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_config: Option<String>,

    /// Ask the controller to place again after finishing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrigger: Option<bool>,
}

/// Placement of one split inside a SplitsPlacer.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuPosition {
    /// Name of the Split resource created for this radio unit.
    pub split_name: String,

    /// Node hosting the RU; older controllers name this field `node`.
    #[serde(
        rename = "ruNode",
        alias = "node",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ru_node: Option<String>,

    #[serde(rename = "duNode", default, skip_serializing_if = "Option::is_none")]
    pub du_node: Option<String>,

    #[serde(rename = "cuNode", default, skip_serializing_if = "Option::is_none")]
    pub cu_node: Option<String>,

    /// Nodes traversed from the core to the RU, as chosen by the controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,
}

/// Status of a SplitsPlacer.
///
/// Every field is optional: the controller fills them in over several
/// updates and readers must tolerate partial status.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitsPlacerStatus {
    /// Controller state token (e.g. "Finished", "Error").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Remaining capacity per link after placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_bandwidth: Option<BTreeMap<String, f64>>,

    /// Seconds the controller spent computing the placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_time: Option<f64>,

    /// Number of RUs the controller managed to allocate.
    #[serde(rename = "allocatedRUs", default, skip_serializing_if = "Option::is_none")]
    pub allocated_rus: Option<i64>,
}

impl SplitsPlacer {
    /// Status state token, if the controller has written one.
    pub fn state(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.state.as_deref())
    }

    /// Names of the splits this placer provisions.
    pub fn split_names(&self) -> Vec<String> {
        self.spec.rus.iter().map(|ru| ru.split_name.clone()).collect()
    }
}
