//! Profile record types

pub mod profile;
