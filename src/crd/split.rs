//! Split Custom Resource Definition.
//!
//! A Split deploys the CU, DU and RU pods of one functional split. Its status
//! reports the topology node each role was placed on.

use kube::CustomResource;
use serde::{Deserialize, Serialize};

use crate::topology::SplitAssignment;
use crate::trial::error::{Error, Result};

/// Split is a single CU/DU/RU deployment.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize)]
#[kube(
    group = "oai.unisinos",
    version = "v1beta1",
    kind = "Split",
    plural = "splits",
    status = "SplitStatus",
    namespaced,
    schema = "disabled"
)]
pub struct SplitSpec {
    #[serde(rename = "coreIP", default, skip_serializing_if = "Option::is_none")]
    pub core_ip: Option<String>,

    #[serde(rename = "ruNode", default, skip_serializing_if = "Option::is_none")]
    pub ru_node: Option<String>,

    #[serde(rename = "duNode", default, skip_serializing_if = "Option::is_none")]
    pub du_node: Option<String>,

    #[serde(rename = "cuNode", default, skip_serializing_if = "Option::is_none")]
    pub cu_node: Option<String>,
}

/// Status of a Split.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SplitStatus {
    #[serde(rename = "cuNode", default, skip_serializing_if = "Option::is_none")]
    pub cu_node: Option<String>,

    #[serde(rename = "cuIP", default, skip_serializing_if = "Option::is_none")]
    pub cu_ip: Option<String>,

    #[serde(rename = "duNode", default, skip_serializing_if = "Option::is_none")]
    pub du_node: Option<String>,

    #[serde(rename = "duIP", default, skip_serializing_if = "Option::is_none")]
    pub du_ip: Option<String>,

    #[serde(rename = "ruNode", default, skip_serializing_if = "Option::is_none")]
    pub ru_node: Option<String>,

    #[serde(rename = "ruIP", default, skip_serializing_if = "Option::is_none")]
    pub ru_ip: Option<String>,

    /// Controller state token (e.g. "Running", "Error").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Split {
    /// Status state token, if the controller has written one.
    pub fn state(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.state.as_deref())
    }

    /// Role placement reported in status.
    ///
    /// Fails with `MalformedResource` until the controller has written all
    /// three nodes and the state.
    pub fn assignment(&self) -> Result<SplitAssignment> {
        let name = self.metadata.name.clone().unwrap_or_default();
        let status = self
            .status
            .as_ref()
            .ok_or_else(|| Error::malformed(&name, "status missing"))?;

        let field = |value: &Option<String>, field: &str| {
            value
                .clone()
                .ok_or_else(|| Error::malformed(&name, format!("status.{field} missing")))
        };

        Ok(SplitAssignment {
            cu_node: field(&status.cu_node, "cuNode")?,
            du_node: field(&status.du_node, "duNode")?,
            ru_node: field(&status.ru_node, "ruNode")?,
            status: field(&status.state, "state")?,
            name,
        })
    }
}
