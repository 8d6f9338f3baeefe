//! Merge command implementation

use super::{read_profile, write_profile, OutputArgs};
use crate::output;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use strata_aggregator::{aggregate_profiles, EngineConfig};

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Profiles to merge (JSON)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run(args: MergeArgs, config: &EngineConfig) -> Result<()> {
    let profiles = args
        .inputs
        .iter()
        .map(|path| read_profile(path))
        .collect::<Result<Vec<_>>>()?;

    let result = aggregate_profiles(profiles, config)?;
    if result.profile.samples.is_empty() {
        output::warning("Merged profile has no samples");
    }
    write_profile(&result.profile, &args.output)?;

    output::success(&format!(
        "Merged {} profiles ({} input samples): {}",
        result.total_profiles,
        result.input_samples,
        output::profile_summary(&result.profile)
    ));
    Ok(())
}
