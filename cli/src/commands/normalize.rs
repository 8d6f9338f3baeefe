//! Normalize command implementation

use super::{read_profile, write_profile, OutputArgs};
use crate::output;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Profile to normalize (JSON)
    pub input: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run(args: NormalizeArgs) -> Result<()> {
    let mut profile = read_profile(&args.input)?;
    let removed = strata_aggregator::normalize(&mut profile);
    write_profile(&profile, &args.output)?;

    output::success(&format!(
        "Removed {} samples: {}",
        removed,
        output::profile_summary(&profile)
    ));
    Ok(())
}
