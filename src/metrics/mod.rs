//! Trial metrics: timestamp parsing, aggregation and result records.

pub mod aggregator;
pub mod result;
pub mod timestamps;

pub use aggregator::{MetricsAggregator, Observations};
pub use result::{AllocationStats, TrialMetrics, TrialResult, TrialState};
pub use timestamps::{
    creation_timestamp_text, format_creation_timestamp, initialization_secs,
    parse_creation_timestamp, parse_init_timestamp, timestamp_from_api_time,
};
