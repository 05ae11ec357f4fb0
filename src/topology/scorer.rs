//! Hop-count scoring of CU/DU/RU placements.
//!
//! Two strategies are kept apart on purpose: [`HopStrategy::ShortestPath`]
//! independently recomputes distances over the topology graph, while
//! [`HopStrategy::ReportedPath`] trusts the path the controller wrote into the
//! placement request.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::topology::graph::NodeName;
use crate::topology::shortest_path::ShortestPathFinder;
use crate::trial::error::{Error, Result};

/// Role-to-node assignment for one split.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SplitAssignment {
    pub name: String,
    pub cu_node: NodeName,
    pub du_node: NodeName,
    pub ru_node: NodeName,
    pub status: String,
}

/// How hop counts are derived for a trial.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum HopStrategy {
    /// Breadth-first search over the configured topology.
    #[default]
    ShortestPath,
    /// `len(path) - 1` of the path reported by the controller.
    ReportedPath,
}

impl fmt::Display for HopStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HopStrategy::ShortestPath => write!(f, "shortest-path"),
            HopStrategy::ReportedPath => write!(f, "reported-path"),
        }
    }
}

impl FromStr for HopStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "shortest-path" => Ok(HopStrategy::ShortestPath),
            "reported-path" => Ok(HopStrategy::ReportedPath),
            other => Err(format!("unknown hop strategy '{other}'")),
        }
    }
}

/// Hop statistics for all scored splits.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PlacementScore {
    pub per_split: BTreeMap<String, usize>,
    pub total_hops: usize,
    pub average_hops: f64,
}

impl PlacementScore {
    fn from_hops(per_split: BTreeMap<String, usize>) -> Result<Self> {
        if per_split.is_empty() {
            return Err(Error::NoData("no split has a defined hop count".into()));
        }
        let total_hops: usize = per_split.values().sum();
        let average_hops = total_hops as f64 / per_split.len() as f64;
        Ok(Self {
            per_split,
            total_hops,
            average_hops,
        })
    }
}

/// Scores placements relative to the ingress `root` node.
pub struct PlacementScorer<'g> {
    finder: ShortestPathFinder<'g>,
    root: NodeName,
}

impl<'g> PlacementScorer<'g> {
    pub fn new(finder: ShortestPathFinder<'g>, root: impl Into<NodeName>) -> Self {
        Self {
            finder,
            root: root.into(),
        }
    }

    /// Hops along `root → CU → DU → RU` for one split.
    pub fn split_hops(&mut self, assignment: &SplitAssignment) -> Result<usize> {
        let core_cu = self.finder.hop_count(&self.root, &assignment.cu_node)?;
        let cu_du = self
            .finder
            .hop_count(&assignment.cu_node, &assignment.du_node)?;
        let du_ru = self
            .finder
            .hop_count(&assignment.du_node, &assignment.ru_node)?;
        Ok(core_cu + cu_du + du_ru)
    }

    /// Score every split by shortest paths over the topology.
    pub fn score(&mut self, assignments: &BTreeMap<String, SplitAssignment>) -> Result<PlacementScore> {
        let mut per_split = BTreeMap::new();
        for (split, assignment) in assignments {
            per_split.insert(split.clone(), self.split_hops(assignment)?);
        }
        PlacementScore::from_hops(per_split)
    }
}

/// Score splits from controller-reported paths.
///
/// Splits without a path, or with an empty one, are left out of the total and
/// the average.
pub fn score_reported_paths(
    reported: &BTreeMap<String, Option<Vec<NodeName>>>,
) -> Result<PlacementScore> {
    let per_split = reported
        .iter()
        .filter_map(|(split, path)| match path.as_deref() {
            Some(nodes) if !nodes.is_empty() => Some((split.clone(), nodes.len() - 1)),
            _ => None,
        })
        .collect();
    PlacementScore::from_hops(per_split)
}
