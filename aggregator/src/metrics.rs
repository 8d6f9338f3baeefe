//! Prometheus metrics for the merge engine and the repair passes

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

// ── Merge metrics ────────────────────────────────────────────────────────────

pub static MERGE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "strata_merge_total",
        "Profiles submitted to a merge engine",
        &["status"]
    )
    .unwrap()
});

pub static MERGED_SAMPLES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "strata_merged_samples_total",
        "Input samples folded into a merge accumulator"
    )
    .unwrap()
});

// ── Normalization metrics ────────────────────────────────────────────────────

pub static NORMALIZED_PROFILES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "strata_normalized_profiles_total",
        "Profiles passed through the normalizer"
    )
    .unwrap()
});

pub static NORMALIZE_REMOVED_SAMPLES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "strata_normalize_removed_samples_total",
        "Samples removed as duplicates or all-zero by the normalizer"
    )
    .unwrap()
});

// ── Repair metrics ───────────────────────────────────────────────────────────

pub static REPAIR_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "strata_repair_total",
        "Defect repair passes by kind and outcome",
        &["kind", "outcome"]
    )
    .unwrap()
});

/// Render all registered metrics to Prometheus text format.
pub fn encode_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not UTF-8")
}
