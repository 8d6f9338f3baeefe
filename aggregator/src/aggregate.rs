//! Aggregation pipeline
//!
//! Every input is repaired and normalized on its own, then all inputs are
//! merged by one engine into a single canonical profile.

use crate::config::EngineConfig;
use crate::fix::{drop_type_parameters, repair_truncated_stacks};
use crate::merge::ProfileMerge;
use crate::normalize::normalize;
use crate::rewrite::Ownership;
use anyhow::{Context, Result};
use strata_shared::Profile;
use tracing::{debug, info};

/// Result of aggregating a set of profiles.
pub struct AggregateResult {
    pub profile: Profile,
    pub total_profiles: usize,

    /// Samples fed to the merge engine, after per-input normalization
    pub input_samples: usize,
}

/// Apply the enabled repairs and normalization to a single profile
pub fn prepare_profile(mut p: Profile, config: &EngineConfig) -> Result<Profile> {
    if config.drop_type_parameters {
        p = drop_type_parameters(p).context("Failed to collapse type parameters")?;
    }
    if config.repair_truncated_stacks {
        let outcome = repair_truncated_stacks(&mut p, &config.truncation);
        debug!(outcome = outcome.as_str(), "truncated stack repair");
    }
    if config.normalize {
        normalize(&mut p);
    }
    Ok(p)
}

/// Prepare and merge all profiles into one.
///
/// Fails on the first input whose header is incompatible with the inputs
/// before it.
pub fn aggregate_profiles(profiles: Vec<Profile>, config: &EngineConfig) -> Result<AggregateResult> {
    let total_profiles = profiles.len();
    let mut input_samples = 0;
    let mut merge = ProfileMerge::new();

    for (i, p) in profiles.into_iter().enumerate() {
        let mut p = prepare_profile(p, config)
            .with_context(|| format!("Failed to prepare profile #{}", i))?;
        input_samples += p.samples.len();
        match config.ownership {
            Ownership::Clone => merge.merge(&mut p),
            Ownership::Borrow => merge.merge_no_clone(p),
        }
        .with_context(|| format!("Failed to merge profile #{}", i))?;
    }

    let profile = merge.into_profile();
    info!(
        "Aggregated {} profiles: {} input samples into {}",
        total_profiles,
        input_samples,
        profile.samples.len()
    );
    Ok(AggregateResult {
        profile,
        total_profiles,
        input_samples,
    })
}
