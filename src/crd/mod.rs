//! Custom Resource Definitions consumed by the validator.
//!
//! - `SplitsPlacer`: one coordinated placement request for a set of splits
//! - `Split`: a single CU/DU/RU split, created directly or by a placer
//!
//! The CRDs are installed by the placement controller; the validator only
//! creates, reads and deletes instances.

mod split;
mod splits_placer;

pub use split::*;
pub use splits_placer::*;

/// API group of the placement controller.
pub const CRD_GROUP: &str = "oai.unisinos";

/// API version served by the placement controller.
pub const CRD_VERSION: &str = "v1beta1";
