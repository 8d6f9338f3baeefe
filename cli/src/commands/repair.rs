//! Repair command implementation

use super::{read_profile, write_profile, OutputArgs};
use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use strata_aggregator::fix::{drop_type_parameters, repair_truncated_stacks};
use strata_aggregator::labels::language;
use strata_aggregator::EngineConfig;

#[derive(Args, Debug)]
pub struct RepairArgs {
    /// Profile to repair (JSON)
    pub input: PathBuf,

    /// Skip collapsing generic type parameters
    #[arg(long)]
    pub skip_type_parameters: bool,

    /// Skip rebuilding truncated stacks
    #[arg(long)]
    pub skip_truncated: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run(args: RepairArgs, config: &EngineConfig) -> Result<()> {
    let mut profile = read_profile(&args.input)?;
    output::info(&format!("Profile language: {}", language(&profile)));

    if config.drop_type_parameters && !args.skip_type_parameters {
        let functions = profile.functions.len();
        profile = drop_type_parameters(profile).context("Failed to collapse type parameters")?;
        output::info(&format!(
            "Type parameters: {} -> {} functions",
            functions,
            profile.functions.len()
        ));
    }

    if config.repair_truncated_stacks && !args.skip_truncated {
        output::repair_outcome(repair_truncated_stacks(&mut profile, &config.truncation));
    }

    write_profile(&profile, &args.output)?;
    output::success(&format!("Repaired: {}", output::profile_summary(&profile)));
    Ok(())
}
