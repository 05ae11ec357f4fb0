//! Breadth-first shortest paths over the topology graph.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::trace;

use crate::topology::graph::{NodeName, TopologyGraph};
use crate::trial::error::{Error, Result};

/// Ordered sequence of nodes, consecutive entries joined by an edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path(Vec<NodeName>);

impl Path {
    /// Number of edges traversed.
    pub fn hop_count(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn nodes(&self) -> &[NodeName] {
        &self.0
    }

    pub fn into_nodes(self) -> Vec<NodeName> {
        self.0
    }
}

/// Shortest-path search with a per-finder query cache.
///
/// Ties between equal-length paths are broken by neighbour order, so results
/// are deterministic for a given graph.
pub struct ShortestPathFinder<'g> {
    graph: &'g TopologyGraph,
    cache: HashMap<(NodeName, NodeName), Path>,
}

impl<'g> ShortestPathFinder<'g> {
    pub fn new(graph: &'g TopologyGraph) -> Self {
        Self {
            graph,
            cache: HashMap::new(),
        }
    }

    pub fn graph(&self) -> &'g TopologyGraph {
        self.graph
    }

    /// Shortest path from `start` to `end`.
    pub fn shortest_path(&mut self, start: &str, end: &str) -> Result<Path> {
        let key = (start.to_string(), end.to_string());
        if let Some(path) = self.cache.get(&key) {
            return Ok(path.clone());
        }

        let path = bfs(self.graph, start, end)?;
        trace!(start, end, hops = path.hop_count(), "Computed shortest path");
        self.cache.insert(key, path.clone());
        Ok(path)
    }

    /// Hop count of the shortest path from `start` to `end`.
    pub fn hop_count(&mut self, start: &str, end: &str) -> Result<usize> {
        self.shortest_path(start, end).map(|p| p.hop_count())
    }
}

/// FIFO search expanding each node at most once; returns as soon as `end`
/// is dequeued.
fn bfs(graph: &TopologyGraph, start: &str, end: &str) -> Result<Path> {
    if !graph.contains(start) {
        return Err(Error::UnknownNode(start.to_string()));
    }
    if !graph.contains(end) {
        return Err(Error::UnknownNode(end.to_string()));
    }

    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if current == end {
            return Ok(reconstruct(&parent, start, end));
        }

        for neighbour in graph.neighbors(current)? {
            if visited.insert(neighbour.as_str()) {
                parent.insert(neighbour.as_str(), current);
                queue.push_back(neighbour.as_str());
            }
        }
    }

    Err(Error::NoPath {
        from: start.to_string(),
        to: end.to_string(),
    })
}

fn reconstruct(parent: &HashMap<&str, &str>, start: &str, end: &str) -> Path {
    let mut nodes = vec![end.to_string()];
    let mut current = end;
    while current != start {
        match parent.get(current) {
            Some(&prev) => {
                nodes.push(prev.to_string());
                current = prev;
            }
            None => break,
        }
    }
    nodes.reverse();
    Path(nodes)
}
