//! Single-profile normalization
//!
//! Deduplicates the samples of one profile, drops samples that carry no
//! value, and garbage-collects the locations, functions, mappings and
//! strings nothing refers to anymore. Ids are dense on return.

use crate::keys::stack_hash;
use crate::labels::sort_labels;
use crate::metrics::{NORMALIZED_PROFILES, NORMALIZE_REMOVED_SAMPLES};
use crate::rewrite::{convert_ids_to_indices, for_each_string_ref};
use rustc_hash::FxHashSet;
use strata_shared::utils::time::system_time_nanos;
use strata_shared::{Mapping, Profile, Sample};
use tracing::debug;

/// Numeric label recording the allocation size of a heap sample
const BYTES_LABEL: &str = "bytes";

/// Normalize `p` in place and return the number of samples removed
pub fn normalize(p: &mut Profile) -> usize {
    if p.time_nanos == 0 {
        p.time_nanos = system_time_nanos();
    }
    convert_ids_to_indices(p);
    ensure_has_mapping(p);
    clear_addresses(p);
    strip_bytes_labels(p);

    let before = p.samples.len();
    let mut hashed: Vec<(u64, Sample)> = std::mem::take(&mut p.samples)
        .into_iter()
        .map(|mut s| {
            sort_labels(&mut s.labels);
            (stack_hash(&s), s)
        })
        .collect();
    hashed.sort_by_key(|(hash, _)| *hash);

    // Equal hashes are folded into the later sample.
    let mut merged: Vec<(u64, Sample)> = Vec::with_capacity(hashed.len());
    for (hash, mut s) in hashed {
        if let Some((prev_hash, prev)) = merged.last_mut() {
            if *prev_hash == hash {
                for (v, pv) in s.values.iter_mut().zip(&prev.values) {
                    *v = v.wrapping_add(*pv);
                }
                *prev = s;
                continue;
            }
        }
        merged.push((hash, s));
    }
    p.samples = merged
        .into_iter()
        .map(|(_, s)| s)
        .filter(|s| s.values.iter().any(|&v| v != 0))
        .collect();

    collect_garbage(p);
    convert_ids_to_indices(p);

    let removed = before - p.samples.len();
    debug!(
        samples = p.samples.len(),
        removed, "normalized profile"
    );
    NORMALIZED_PROFILES.inc();
    NORMALIZE_REMOVED_SAMPLES.inc_by(removed as u64);
    removed
}

/// Point every location without a mapping at one shared placeholder mapping
pub fn ensure_has_mapping(p: &mut Profile) {
    let mut fake_id = 0;
    for loc in p.locations.iter_mut() {
        if loc.mapping_id != 0 {
            continue;
        }
        if fake_id == 0 {
            fake_id = p.mappings.iter().map(|m| m.id).max().unwrap_or(0) + 1;
            p.mappings.push(Mapping {
                id: fake_id,
                memory_limit: u64::MAX,
                ..Default::default()
            });
        }
        loc.mapping_id = fake_id;
    }
}

/// Addresses carry no information once a mapping is symbolized
pub fn clear_addresses(p: &mut Profile) {
    for m in p.mappings.iter_mut().filter(|m| m.has_functions) {
        m.memory_start = 0;
        m.memory_limit = 0;
        m.file_offset = 0;
    }
    for loc in p.locations.iter_mut() {
        let symbolized = loc
            .mapping_id
            .checked_sub(1)
            .and_then(|i| p.mappings.get(i as usize))
            .map_or(false, |m| m.has_functions);
        if symbolized {
            loc.address = 0;
        }
    }
}

fn strip_bytes_labels(p: &mut Profile) {
    let Some(key) = p.find_string(BYTES_LABEL) else {
        return;
    };
    for s in p.samples.iter_mut() {
        s.labels.retain(|l| !(l.key == key && l.is_numeric()));
    }
}

/// Drop locations no sample refers to, then the functions and mappings only
/// they referred to, then the strings only those referred to
fn collect_garbage(p: &mut Profile) {
    let used_locations: FxHashSet<u64> = p
        .samples
        .iter()
        .flat_map(|s| s.location_ids.iter().copied())
        .collect();

    let mut removed_functions: FxHashSet<u64> = FxHashSet::default();
    let mut removed_mappings: FxHashSet<u64> = FxHashSet::default();
    p.locations.retain(|loc| {
        if used_locations.contains(&loc.id) {
            return true;
        }
        removed_functions.extend(loc.lines.iter().map(|l| l.function_id));
        removed_mappings.insert(loc.mapping_id);
        false
    });
    if removed_functions.is_empty() && removed_mappings.is_empty() {
        return;
    }
    for loc in &p.locations {
        removed_mappings.remove(&loc.mapping_id);
        for line in &loc.lines {
            removed_functions.remove(&line.function_id);
        }
    }

    let mut removed_strings: FxHashSet<i64> = FxHashSet::default();
    p.functions.retain(|f| {
        if !removed_functions.contains(&f.id) {
            return true;
        }
        removed_strings.extend([f.name, f.system_name, f.filename]);
        false
    });
    p.mappings.retain(|m| {
        if !removed_mappings.contains(&m.id) {
            return true;
        }
        removed_strings.extend([m.filename, m.build_id]);
        false
    });
    remove_strings(p, removed_strings);
}

/// Remove candidate strings that are no longer referenced and shift every
/// remaining reference down by the number of removed entries below it
fn remove_strings(p: &mut Profile, mut candidates: FxHashSet<i64>) {
    candidates.remove(&0);
    if candidates.is_empty() {
        return;
    }
    for_each_string_ref(p, |idx| {
        candidates.remove(idx);
    });
    if candidates.is_empty() {
        return;
    }
    let mut removed: Vec<i64> = candidates.into_iter().collect();
    removed.sort_unstable();

    let mut pos = 0;
    p.string_table.retain(|_| {
        let keep = removed.binary_search(&pos).is_err();
        pos += 1;
        keep
    });
    for_each_string_ref(p, |idx| {
        *idx -= removed.partition_point(|&r| r < *idx) as i64;
    });
    debug!(strings = removed.len(), "removed unreferenced strings");
}
