//! Static topology used as a scoring oracle for placements.
//!
//! - `graph`: immutable adjacency of the test network
//! - `shortest_path`: breadth-first hop distances
//! - `scorer`: per-split and aggregate hop counts

pub mod graph;
pub mod scorer;
pub mod shortest_path;

pub use graph::{NodeName, REFERENCE_ROOT, TopologyGraph};
pub use scorer::{HopStrategy, PlacementScore, PlacementScorer, SplitAssignment, score_reported_paths};
pub use shortest_path::{Path, ShortestPathFinder};
