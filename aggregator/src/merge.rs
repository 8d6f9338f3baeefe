//! Profile merge engine
//!
//! A [`ProfileMerge`] accumulates any number of profiles into one canonical
//! profile. Every input table is run through a content-addressed dedup table
//! and the input's references are rewritten to the canonical indices, in
//! dependency order: strings, functions, mappings, locations, samples.
//!
//! An engine instance carries state across calls and is meant for one
//! worker. Partial results of several engines are combined by merging their
//! finalized profiles into another engine.

use crate::error::MergeError;
use crate::keys::{
    function_key, location_key, mapping_key, sample_key, FunctionKey, LocationKey, MappingKey,
    SampleKey,
};
use crate::labels::sort_labels;
use crate::metrics::{MERGED_SAMPLES, MERGE_TOTAL};
use crate::rewrite::{
    convert_ids_to_indices, retain, rewrite_functions, rewrite_locations, rewrite_mappings,
    rewrite_strings, Ownership, RewriteTable,
};
use strata_shared::{Function, Location, Mapping, Profile, Sample, ValueType};
use tracing::{debug, trace};

pub struct ProfileMerge {
    /// Accumulated header; `None` until the first non-empty input
    profile: Option<Profile>,
    tmp: Vec<u32>,

    strings: RewriteTable<String, String, String>,
    functions: RewriteTable<FunctionKey, Function, Function>,
    mappings: RewriteTable<MappingKey, Mapping, Mapping>,
    locations: RewriteTable<LocationKey, Location, Location>,
    samples: RewriteTable<SampleKey, Sample, Sample>,
}

impl Default for ProfileMerge {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileMerge {
    pub fn new() -> Self {
        Self {
            profile: None,
            tmp: Vec::new(),
            strings: RewriteTable::new(String::clone, retain::<String>),
            functions: RewriteTable::new(function_key, retain::<Function>),
            mappings: RewriteTable::new(mapping_key, retain::<Mapping>),
            locations: RewriteTable::new(location_key, retain::<Location>),
            samples: RewriteTable::new(sample_key, retain_sample),
        }
    }

    /// Merge `p` into the accumulator, copying whatever is retained.
    ///
    /// References in `p` are rewritten in place to the accumulator's
    /// indices, so `p` stays readable but is no longer self-consistent
    /// with its own tables.
    pub fn merge(&mut self, p: &mut Profile) -> Result<(), MergeError> {
        self.merge_with(p, Ownership::Clone)
    }

    /// Merge `p` into the accumulator, taking ownership of its tables
    pub fn merge_no_clone(&mut self, mut p: Profile) -> Result<(), MergeError> {
        self.merge_with(&mut p, Ownership::Borrow)
    }

    pub(crate) fn merge_with(
        &mut self,
        p: &mut Profile,
        ownership: Ownership,
    ) -> Result<(), MergeError> {
        if p.string_table.len() < 2 {
            debug!(strings = p.string_table.len(), "skipping empty profile");
            MERGE_TOTAL.with_label_values(&["skipped"]).inc();
            return Ok(());
        }
        convert_ids_to_indices(p);

        if let Some(acc) = &self.profile {
            if let Err(err) = check_compatible(acc, self.strings.values(), p) {
                MERGE_TOTAL.with_label_values(&["incompatible"]).inc();
                return Err(err);
            }
        }
        let initial = self.profile.is_none();
        if initial {
            self.reserve(p);
        }
        let acc = self.profile.get_or_insert_with(|| header(p));

        self.strings
            .index(&mut self.tmp, &mut p.string_table, ownership);
        rewrite_strings(p, &self.tmp);
        if initial {
            rewrite_strings(acc, &self.tmp);
        }
        combine_headers(acc, p);

        self.functions
            .index(&mut self.tmp, &mut p.functions, ownership);
        rewrite_functions(p, &self.tmp);

        self.mappings
            .index(&mut self.tmp, &mut p.mappings, ownership);
        rewrite_mappings(p, &self.tmp);

        self.locations
            .index(&mut self.tmp, &mut p.locations, ownership);
        rewrite_locations(p, &self.tmp);

        for s in p.samples.iter_mut() {
            sort_labels(&mut s.labels);
        }
        self.samples.index(&mut self.tmp, &mut p.samples, ownership);
        let merged = self.samples.values_mut();
        for (s, &idx) in p.samples.iter().zip(&self.tmp) {
            let dst = &mut merged[idx as usize].values;
            for (d, v) in dst.iter_mut().zip(&s.values) {
                *d = d.wrapping_add(*v);
            }
        }

        trace!(
            samples = p.samples.len(),
            canonical = self.samples.len(),
            "merged profile"
        );
        MERGED_SAMPLES.inc_by(p.samples.len() as u64);
        MERGE_TOTAL.with_label_values(&["ok"]).inc();
        Ok(())
    }

    /// Build the merged profile. The accumulator is left untouched and can
    /// keep accepting inputs.
    pub fn profile(&self) -> Profile {
        match &self.profile {
            None => empty_profile(),
            Some(header) => assemble(
                header.clone(),
                self.strings.values().to_vec(),
                self.functions.values().to_vec(),
                self.mappings.values().to_vec(),
                self.locations.values().to_vec(),
                self.samples.values().to_vec(),
            ),
        }
    }

    /// Consume the engine and build the merged profile without copying
    pub fn into_profile(self) -> Profile {
        match self.profile {
            None => empty_profile(),
            Some(header) => assemble(
                header,
                self.strings.into_values(),
                self.functions.into_values(),
                self.mappings.into_values(),
                self.locations.into_values(),
                self.samples.into_values(),
            ),
        }
    }

    fn reserve(&mut self, p: &Profile) {
        // Inputs of one merge tend to share most of their content.
        const FACTOR: usize = 2;
        self.strings.reserve(FACTOR * p.string_table.len());
        self.functions.reserve(FACTOR * p.functions.len());
        self.mappings.reserve(FACTOR * p.mappings.len());
        self.locations.reserve(FACTOR * p.locations.len());
        self.samples.reserve(FACTOR * p.samples.len());
    }
}

/// Samples are retained with zeroed values; the values of every input
/// sample are then added into the canonical one. The input keeps its values
/// in both modes.
fn retain_sample(s: &mut Sample, ownership: Ownership) -> Sample {
    match ownership {
        Ownership::Clone => Sample {
            location_ids: s.location_ids.clone(),
            values: vec![0; s.values.len()],
            labels: s.labels.clone(),
        },
        Ownership::Borrow => Sample {
            location_ids: std::mem::take(&mut s.location_ids),
            values: vec![0; s.values.len()],
            labels: std::mem::take(&mut s.labels),
        },
    }
}

fn header(p: &Profile) -> Profile {
    Profile {
        sample_types: p.sample_types.clone(),
        drop_frames: p.drop_frames,
        keep_frames: p.keep_frames,
        time_nanos: p.time_nanos,
        period_type: p.period_type,
        period: p.period,
        comments: p.comments.clone(),
        default_sample_type: p.default_sample_type,
        ..Default::default()
    }
}

fn empty_profile() -> Profile {
    Profile {
        sample_types: vec![ValueType::default()],
        string_table: vec![String::new()],
        ..Default::default()
    }
}

fn assemble(
    mut p: Profile,
    strings: Vec<String>,
    functions: Vec<Function>,
    mappings: Vec<Mapping>,
    locations: Vec<Location>,
    samples: Vec<Sample>,
) -> Profile {
    p.string_table = strings;
    p.functions = functions;
    p.mappings = mappings;
    p.locations = locations;
    p.samples = samples;
    for (i, f) in p.functions.iter_mut().enumerate() {
        f.id = (i + 1) as u64;
    }
    for (i, m) in p.mappings.iter_mut().enumerate() {
        m.id = (i + 1) as u64;
    }
    for (i, loc) in p.locations.iter_mut().enumerate() {
        loc.id = (i + 1) as u64;
    }
    p
}

fn value_type_name(strings: &[String], vt: &ValueType) -> String {
    format!("{}/{}", strings[vt.r#type as usize], strings[vt.unit as usize])
}

/// Compare the headers of the accumulator and an input that has not been
/// interned yet, by string content
fn check_compatible(acc: &Profile, strings: &[String], p: &Profile) -> Result<(), MergeError> {
    let acc_name = |vt: &ValueType| value_type_name(strings, vt);
    let p_name = |vt: &ValueType| value_type_name(&p.string_table, vt);

    if acc_name(&acc.period_type) != p_name(&p.period_type) {
        return Err(MergeError::IncompatiblePeriodType {
            accumulated: acc_name(&acc.period_type),
            incoming: p_name(&p.period_type),
        });
    }
    let accumulated: Vec<String> = acc.sample_types.iter().map(acc_name).collect();
    let incoming: Vec<String> = p.sample_types.iter().map(p_name).collect();
    if accumulated != incoming {
        return Err(MergeError::IncompatibleSampleTypes {
            accumulated,
            incoming,
        });
    }
    Ok(())
}

/// Fold the header of `p` into `acc`. Both must share the string table.
fn combine_headers(acc: &mut Profile, p: &Profile) {
    if p.time_nanos != 0 && (acc.time_nanos == 0 || p.time_nanos < acc.time_nanos) {
        acc.time_nanos = p.time_nanos;
    }
    acc.duration_nanos += p.duration_nanos;
    if p.period > acc.period {
        acc.period = p.period;
    }
    if acc.default_sample_type == 0 {
        acc.default_sample_type = p.default_sample_type;
    }
}
