//! Engine configuration
//!
//! Loaded from an optional file, then overridden by `STRATA_*` environment
//! variables. Nested fields use `__`, e.g. `STRATA_TRUNCATION__MIN_DEPTH`.

use crate::rewrite::Ownership;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Collapse generic shape instantiations in function names
    pub drop_type_parameters: bool,

    /// Rebuild the root end of stacks cut by a depth cap
    pub repair_truncated_stacks: bool,

    /// Deduplicate and garbage-collect every input before merging
    pub normalize: bool,

    /// How the merge engine retains input tables
    pub ownership: Ownership,

    pub truncation: TruncationRepairConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            drop_type_parameters: true,
            repair_truncated_stacks: true,
            normalize: true,
            ownership: Ownership::Borrow,
            truncation: TruncationRepairConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load the configuration from `path` (TOML, JSON or YAML, by extension)
    /// and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("STRATA")
                .prefix_separator("_")
                .separator("__"),
        );
        let cfg: EngineConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.truncation.validate()
    }
}

/// Tuning of the truncated-stack repair heuristic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruncationRepairConfig {
    /// Samples sharing a root suffix must be at least this many to form a group
    pub min_group_size: usize,

    /// Width of a token, in frames
    pub token_len: usize,

    /// Number of token positions indexed per group
    pub tokens: usize,

    /// Chains longer than this abort the pass
    pub max_chain_depth: usize,

    /// The pass runs only if some stack is at least this deep
    pub min_depth: usize,

    /// Sample types identifying a heap profile
    pub heap_sample_types: Vec<String>,
}

impl Default for TruncationRepairConfig {
    fn default() -> Self {
        Self {
            min_group_size: 2,
            token_len: 16,
            tokens: 8,
            max_chain_depth: 32,
            min_depth: 28,
            heap_sample_types: ["alloc_objects", "alloc_space", "inuse_objects", "inuse_space"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl TruncationRepairConfig {
    /// Number of root-most frames compared when grouping samples
    pub fn suffix_len(&self) -> usize {
        self.tokens + self.token_len
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.token_len > 0, "truncation.token_len must be positive");
        ensure!(self.tokens > 0, "truncation.tokens must be positive");
        ensure!(
            self.min_group_size > 0,
            "truncation.min_group_size must be positive"
        );
        ensure!(
            self.max_chain_depth > 0,
            "truncation.max_chain_depth must be positive"
        );
        Ok(())
    }
}
