//! Profile data structures
//!
//! A decoded stack-trace profile: an interned string table, function, mapping
//! and location tables, and samples that reference those tables by numeric id.
//! Every other table refers to strings by their index in `string_table`, and
//! index 0 is always the empty string.

use serde::{Deserialize, Serialize};

/// A (type, unit) pair, both string references
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueType {
    pub r#type: i64,
    pub unit: i64,
}

impl ValueType {
    pub fn new(r#type: i64, unit: i64) -> Self {
        Self { r#type, unit }
    }
}

/// A sample label.
///
/// A label carries either a string value (`str != 0`) or a numeric value
/// with an optional unit (`num`, `num_unit`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Label {
    pub key: i64,
    pub str: i64,
    pub num: i64,
    pub num_unit: i64,
}

impl Label {
    /// Create a string label
    pub fn string(key: i64, str: i64) -> Self {
        Self {
            key,
            str,
            ..Default::default()
        }
    }

    /// Create a numeric label
    pub fn numeric(key: i64, num: i64, num_unit: i64) -> Self {
        Self {
            key,
            str: 0,
            num,
            num_unit,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.str == 0
    }
}

/// One observed stack trace with its values and labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sample {
    /// Location ids, leaf first
    pub location_ids: Vec<u64>,

    /// One value per declared sample type
    pub values: Vec<i64>,

    pub labels: Vec<Label>,
}

/// A mapped binary region
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mapping {
    pub id: u64,
    pub memory_start: u64,
    pub memory_limit: u64,
    pub file_offset: u64,
    pub filename: i64,
    pub build_id: i64,
    pub has_functions: bool,
    pub has_filenames: bool,
    pub has_line_numbers: bool,
    pub has_inline_frames: bool,
}

/// A (function, source line) pair inside a location
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Line {
    /// Function id, 0 if unknown
    pub function_id: u64,
    pub line: i64,
}

/// A stack frame, possibly covering several inlined calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub id: u64,

    /// Mapping id, 0 if the location has no mapping
    pub mapping_id: u64,

    pub address: u64,

    /// Inlined frames, innermost first
    pub lines: Vec<Line>,

    pub is_folded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Function {
    pub id: u64,
    pub name: i64,
    pub system_name: i64,
    pub filename: i64,
    pub start_line: i64,
}

/// A complete profile record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub sample_types: Vec<ValueType>,
    pub samples: Vec<Sample>,
    pub mappings: Vec<Mapping>,
    pub locations: Vec<Location>,
    pub functions: Vec<Function>,

    /// Interned strings; index 0 is always ""
    pub string_table: Vec<String>,

    pub drop_frames: i64,
    pub keep_frames: i64,

    /// Collection time in nanoseconds since the UNIX epoch
    pub time_nanos: i64,
    pub duration_nanos: i64,

    pub period_type: ValueType,
    pub period: i64,

    pub comments: Vec<i64>,
    pub default_sample_type: i64,
}

impl Profile {
    /// Resolve a string reference.
    ///
    /// # Panics
    /// Panics if `idx` is outside the string table.
    pub fn string(&self, idx: i64) -> &str {
        &self.string_table[idx as usize]
    }

    /// Index of the first occurrence of `s` in the string table
    pub fn find_string(&self, s: &str) -> Option<i64> {
        self.string_table
            .iter()
            .position(|x| x == s)
            .map(|i| i as i64)
    }

    pub fn has_dense_functions(&self) -> bool {
        self.functions
            .iter()
            .enumerate()
            .all(|(i, f)| f.id == (i + 1) as u64)
    }

    pub fn has_dense_mappings(&self) -> bool {
        self.mappings
            .iter()
            .enumerate()
            .all(|(i, m)| m.id == (i + 1) as u64)
    }

    pub fn has_dense_locations(&self) -> bool {
        self.locations
            .iter()
            .enumerate()
            .all(|(i, l)| l.id == (i + 1) as u64)
    }

    /// Check whether every function, mapping and location id matches its
    /// position in the table plus one
    pub fn has_dense_ids(&self) -> bool {
        self.has_dense_functions() && self.has_dense_mappings() && self.has_dense_locations()
    }

    /// Resolve the sample type names of the profile
    pub fn sample_type_names(&self) -> Vec<&str> {
        self.sample_types
            .iter()
            .map(|st| self.string(st.r#type))
            .collect()
    }

    /// Sum of the values of the given sample type across all samples
    pub fn total(&self, sample_type: usize) -> i64 {
        self.samples
            .iter()
            .filter_map(|s| s.values.get(sample_type))
            .sum()
    }
}
