//! Errors surfaced by the merge engine

/// A profile could not be merged into the accumulator.
///
/// Value types are rendered as `type/unit`. The accumulator is left as it
/// was before the failing call and keeps accepting compatible profiles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("incompatible period types: accumulated {accumulated}, incoming {incoming}")]
    IncompatiblePeriodType { accumulated: String, incoming: String },

    #[error("incompatible sample types: accumulated [{}], incoming [{}]", accumulated.join(", "), incoming.join(", "))]
    IncompatibleSampleTypes {
        accumulated: Vec<String>,
        incoming: Vec<String>,
    },
}
