//! placement-validator library crate
//!
//! Validates the placements and timing of an external CU/DU/RU split
//! placement controller: trials submit placement requests, wait for the
//! controller to settle them, score the chosen nodes against the network
//! topology and record timing metrics.

pub mod client;
pub mod config;
pub mod crd;
pub mod metrics;
pub mod report;
pub mod template;
pub mod topology;
pub mod trial;

use std::path::Path;

pub use client::{ClusterClient, KubeClusterClient, PodSummary};
pub use config::ValidatorConfig;
pub use report::{FileReportWriter, ReportWriter};
pub use topology::TopologyGraph;
pub use trial::{
    BatchSummary, Error, PlacerTrial, Result, SplitsTrial, TrialKind, TrialOrchestrator,
    TrialRunner, run_batch,
};

/// Build a runner for one execution from the template at `path`.
pub fn load_trial(kind: TrialKind, path: &Path) -> Result<Box<dyn TrialRunner>> {
    Ok(match kind {
        TrialKind::Placer => Box::new(PlacerTrial::new(template::load_splits_placer(path)?)),
        TrialKind::Splits => Box::new(SplitsTrial::new(template::load_splits(path)?)),
    })
}
