//! Repairs for known producer defects

pub mod truncated;
pub mod type_parameters;

pub use truncated::{may_have_truncated_stacks, repair_truncated_stacks, RepairOutcome};
pub use type_parameters::drop_type_parameters;
