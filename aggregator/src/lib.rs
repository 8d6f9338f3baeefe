//! Profile merge, normalization and repair engine
//!
//! Turns decoded profiles into canonical ones: dense 1-based ids, no
//! duplicate samples, no all-zero samples and no unreferenced entries.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod fix;
pub mod keys;
pub mod labels;
pub mod merge;
pub mod metrics;
pub mod normalize;
pub mod rewrite;

pub use aggregate::{aggregate_profiles, prepare_profile, AggregateResult};
pub use config::{EngineConfig, TruncationRepairConfig};
pub use error::MergeError;
pub use export::SampleExporter;
pub use merge::ProfileMerge;
pub use normalize::normalize;
pub use rewrite::{convert_ids_to_indices, Ownership};
