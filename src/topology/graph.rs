//! Immutable adjacency representation of the physical test topology.

use std::collections::HashMap;
use std::path::Path;

use crate::trial::error::{Error, Result};

/// Identifier of a physical topology location.
pub type NodeName = String;

/// Undirected network graph, loaded once and shared read-only.
///
/// Neighbour lists keep their authored order; shortest-path tie-breaking
/// depends on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopologyGraph {
    adjacency: HashMap<NodeName, Vec<NodeName>>,
}

/// Ingress node of the reference topology.
pub const REFERENCE_ROOT: &str = "node16";

const REFERENCE_TOPOLOGY: &[(&str, &[&str])] = &[
    ("node16", &["node14", "node15"]),
    ("node14", &["node3", "node4", "node5", "node16"]),
    ("node15", &["node3", "node4", "node5", "node16"]),
    ("node3", &["node6", "node7", "node8", "node14", "node15"]),
    ("node4", &["node6", "node10", "node11", "node14", "node15"]),
    ("node5", &["node7", "node11", "node14", "node15"]),
    ("node6", &["node3", "node4"]),
    ("node7", &["node3", "node5"]),
    ("node8", &["node3", "node9"]),
    ("node9", &["node8", "node10"]),
    ("node10", &["node9", "node4"]),
    ("node11", &["node5", "node4", "node12"]),
    ("node12", &["node11", "node13"]),
    ("node13", &["node12"]),
];

impl TopologyGraph {
    /// The reference topology the placement controller is tested against.
    ///
    /// [`REFERENCE_ROOT`] is the ingress (core network) node.
    pub fn reference() -> Self {
        let adjacency = REFERENCE_TOPOLOGY
            .iter()
            .map(|(node, neighbours)| {
                (
                    node.to_string(),
                    neighbours.iter().map(|n| n.to_string()).collect(),
                )
            })
            .collect();

        Self { adjacency }
    }

    /// Build a graph from an adjacency mapping.
    ///
    /// Every neighbour must itself be a node, and every edge must be listed
    /// from both ends.
    pub fn from_adjacency<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NodeName, Vec<NodeName>)>,
    {
        let mut adjacency: HashMap<NodeName, Vec<NodeName>> = HashMap::new();
        for (node, neighbours) in entries {
            if adjacency.insert(node.clone(), neighbours).is_some() {
                return Err(Error::Topology(format!("node {node} listed twice")));
            }
        }

        for (node, neighbours) in &adjacency {
            for neighbour in neighbours {
                let back = adjacency
                    .get(neighbour)
                    .ok_or_else(|| Error::UnknownNode(neighbour.clone()))?;
                if !back.contains(node) {
                    return Err(Error::Topology(format!(
                        "edge {node} -> {neighbour} has no reverse edge"
                    )));
                }
            }
        }

        Ok(Self { adjacency })
    }

    /// Build a graph from undirected edges, keeping insertion order.
    pub fn from_edges<'a, I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut adjacency: HashMap<NodeName, Vec<NodeName>> = HashMap::new();
        for (a, b) in edges {
            let from_a = adjacency.entry(a.to_string()).or_default();
            if !from_a.iter().any(|n| n == b) {
                from_a.push(b.to_string());
            }
            let from_b = adjacency.entry(b.to_string()).or_default();
            if !from_b.iter().any(|n| n == a) {
                from_b.push(a.to_string());
            }
        }
        Self { adjacency }
    }

    /// Load an adjacency mapping from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse an adjacency mapping from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)?;
        let mapping = value
            .as_mapping()
            .ok_or_else(|| Error::Topology("expected a mapping of node to neighbours".into()))?;

        let mut entries = Vec::with_capacity(mapping.len());
        for (key, neighbours) in mapping {
            let node: NodeName = serde_yaml::from_value(key.clone())?;
            let neighbours: Vec<NodeName> = serde_yaml::from_value(neighbours.clone())?;
            entries.push((node, neighbours));
        }
        Self::from_adjacency(entries)
    }

    /// Neighbours of `node` in authored order.
    pub fn neighbors(&self, node: &str) -> Result<&[NodeName]> {
        self.adjacency
            .get(node)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownNode(node.to_string()))
    }

    /// Whether `node` is part of the graph.
    pub fn contains(&self, node: &str) -> bool {
        self.adjacency.contains_key(node)
    }

    /// All node names, sorted.
    pub fn nodes(&self) -> Vec<&str> {
        let mut nodes: Vec<&str> = self.adjacency.keys().map(String::as_str).collect();
        nodes.sort_unstable();
        nodes
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }
}
