//! Shared types and utilities for Strata
//!
//! This crate contains the canonical profile record exchanged between the
//! decoder, the merge engine, and the storage and query paths, plus the small
//! hashing and time helpers they all rely on.

pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::profile::*;
