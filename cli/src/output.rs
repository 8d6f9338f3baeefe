//! Status output for the strata commands
//!
//! Everything here goes to stderr; stdout only ever carries profile JSON.

use colored::Colorize;
use strata_aggregator::fix::RepairOutcome;
use strata_shared::Profile;

pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn info(msg: &str) {
    eprintln!("{} {}", "ℹ".blue(), msg);
}

pub fn warning(msg: &str) {
    eprintln!("{} {}", "⚠".yellow(), msg);
}

/// One-line summary of a profile's tables
pub fn profile_summary(profile: &Profile) -> String {
    format!(
        "{} samples, {} locations, {} functions, {} mappings, {} strings [{}]",
        profile.samples.len(),
        profile.locations.len(),
        profile.functions.len(),
        profile.mappings.len(),
        profile.string_table.len(),
        profile.sample_type_names().join(", ").cyan()
    )
}

/// Report how the truncated-stack repair went
pub fn repair_outcome(outcome: RepairOutcome) {
    match outcome {
        RepairOutcome::Repaired(n) => info(&format!(
            "Truncated stacks: extended {} samples",
            n.to_string().bold()
        )),
        RepairOutcome::Aborted => warning("Truncated stacks: chain too deep, left unrepaired"),
        RepairOutcome::NotApplicable | RepairOutcome::Unchanged => {
            info(&format!("Truncated stacks: {}", outcome.as_str().dimmed()))
        }
    }
}
