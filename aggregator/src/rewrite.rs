//! Content-addressed dedup tables and reference rewriting
//!
//! Every merge step follows the same pattern: run one table of the incoming
//! profile through a [`RewriteTable`], which yields an old-index to new-index
//! map, then rewrite every field that refers to that table with the map.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::mem;
use strata_shared::Profile;

/// How a dedup table obtains the copy of a value it retains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    /// Deep-copy retained values; the input stays readable
    #[default]
    Clone,

    /// Move retained values out of the input, leaving defaults behind
    Borrow,
}

/// Produce the retained copy of `value` according to `ownership`
pub fn retain<T: Clone + Default>(value: &mut T, ownership: Ownership) -> T {
    match ownership {
        Ownership::Clone => value.clone(),
        Ownership::Borrow => mem::take(value),
    }
}

/// Maintains unique values and their dense indices.
///
/// `K` is the comparison key derived from an input value `V`, `M` is what
/// the table keeps for the first value seen under each key. Values are
/// emitted in first-seen order.
pub struct RewriteTable<K, V, M> {
    key: fn(&V) -> K,
    value: fn(&mut V, Ownership) -> M,
    table: FxHashMap<K, u32>,
    values: Vec<M>,
}

impl<K: Eq + Hash, V, M> RewriteTable<K, V, M> {
    pub fn new(key: fn(&V) -> K, value: fn(&mut V, Ownership) -> M) -> Self {
        Self {
            key,
            value,
            table: FxHashMap::default(),
            values: Vec::new(),
        }
    }

    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
        self.values.reserve(additional);
    }

    /// Resolve the canonical index of every value, appending values whose
    /// key has not been seen yet. `dst[i]` receives the index of `values[i]`.
    pub fn index(&mut self, dst: &mut Vec<u32>, values: &mut [V], ownership: Ownership) {
        dst.clear();
        dst.reserve(values.len());
        for value in values.iter_mut() {
            let k = (self.key)(value);
            let n = *self.table.entry(k).or_insert_with(|| {
                let n = self.values.len() as u32;
                self.values.push((self.value)(value, ownership));
                n
            });
            dst.push(n);
        }
    }

    /// Append values without deduplication. The key of each value is
    /// remapped to its latest position.
    pub fn append(&mut self, values: &mut [V], ownership: Ownership) {
        for value in values.iter_mut() {
            let k = (self.key)(value);
            let n = self.values.len() as u32;
            self.values.push((self.value)(value, ownership));
            self.table.insert(k, n);
        }
    }

    pub fn values(&self) -> &[M] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [M] {
        &mut self.values
    }

    pub fn into_values(self) -> Vec<M> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Visit every string reference of the profile
pub fn for_each_string_ref(p: &mut Profile, mut f: impl FnMut(&mut i64)) {
    for t in p.sample_types.iter_mut() {
        f(&mut t.r#type);
        f(&mut t.unit);
    }
    for s in p.samples.iter_mut() {
        for l in s.labels.iter_mut() {
            f(&mut l.key);
            f(&mut l.str);
            f(&mut l.num_unit);
        }
    }
    for m in p.mappings.iter_mut() {
        f(&mut m.filename);
        f(&mut m.build_id);
    }
    for func in p.functions.iter_mut() {
        f(&mut func.name);
        f(&mut func.system_name);
        f(&mut func.filename);
    }
    f(&mut p.drop_frames);
    f(&mut p.keep_frames);
    f(&mut p.period_type.r#type);
    f(&mut p.period_type.unit);
    for c in p.comments.iter_mut() {
        f(c);
    }
    f(&mut p.default_sample_type);
}

pub fn rewrite_strings(p: &mut Profile, n: &[u32]) {
    for_each_string_ref(p, |idx| *idx = n[*idx as usize] as i64);
}

/// Rewrite location lines with the function index map. Function id 0 is kept.
pub fn rewrite_functions(p: &mut Profile, n: &[u32]) {
    for loc in p.locations.iter_mut() {
        for line in loc.lines.iter_mut() {
            if line.function_id != 0 {
                line.function_id = n[(line.function_id - 1) as usize] as u64 + 1;
            }
        }
    }
}

/// Rewrite location mappings with the mapping index map. Mapping id 0 is kept.
pub fn rewrite_mappings(p: &mut Profile, n: &[u32]) {
    for loc in p.locations.iter_mut() {
        if loc.mapping_id != 0 {
            loc.mapping_id = n[(loc.mapping_id - 1) as usize] as u64 + 1;
        }
    }
}

pub fn rewrite_locations(p: &mut Profile, n: &[u32]) {
    for s in p.samples.iter_mut() {
        for loc in s.location_ids.iter_mut() {
            *loc = n[(*loc - 1) as usize] as u64 + 1;
        }
    }
}

/// Make function, mapping and location ids match their position plus one,
/// rewriting every reference to them. References to ids that are not in
/// the table become 0.
pub fn convert_ids_to_indices(p: &mut Profile) {
    let dense_mappings = p.has_dense_mappings();
    let dense_locations = p.has_dense_locations();
    let dense_functions = p.has_dense_functions();
    if dense_mappings && dense_locations && dense_functions {
        return;
    }
    let mut t: FxHashMap<u64, u64> = FxHashMap::default();
    if !dense_mappings {
        t.reserve(p.mappings.len());
        for (i, m) in p.mappings.iter_mut().enumerate() {
            let idx = (i + 1) as u64;
            t.insert(m.id, idx);
            m.id = idx;
        }
        for loc in p.locations.iter_mut() {
            loc.mapping_id = t.get(&loc.mapping_id).copied().unwrap_or(0);
        }
    }
    if !dense_locations {
        t.clear();
        t.reserve(p.locations.len());
        for (i, loc) in p.locations.iter_mut().enumerate() {
            let idx = (i + 1) as u64;
            t.insert(loc.id, idx);
            loc.id = idx;
        }
        for s in p.samples.iter_mut() {
            for loc in s.location_ids.iter_mut() {
                *loc = t.get(loc).copied().unwrap_or(0);
            }
        }
    }
    if !dense_functions {
        t.clear();
        t.reserve(p.functions.len());
        for (i, f) in p.functions.iter_mut().enumerate() {
            let idx = (i + 1) as u64;
            t.insert(f.id, idx);
            f.id = idx;
        }
        for loc in p.locations.iter_mut() {
            for line in loc.lines.iter_mut() {
                line.function_id = t.get(&line.function_id).copied().unwrap_or(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_shared::{Function, Line, Location, Mapping, Sample};

    fn string_table() -> RewriteTable<String, String, String> {
        RewriteTable::new(|s: &String| s.clone(), retain::<String>)
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_index_first_seen_order() {
        let mut table = string_table();
        let mut dst = Vec::new();

        let mut a = strings(&["", "b", "a", "b"]);
        table.index(&mut dst, &mut a, Ownership::Clone);
        assert_eq!(dst, vec![0, 1, 2, 1]);

        let mut b = strings(&["", "c", "a"]);
        table.index(&mut dst, &mut b, Ownership::Clone);
        assert_eq!(dst, vec![0, 3, 2]);

        assert_eq!(table.values(), &strings(&["", "b", "a", "c"])[..]);
        // Clone mode leaves the input intact.
        assert_eq!(b, strings(&["", "c", "a"]));
    }

    #[test]
    fn test_index_borrow_takes_only_new_values() {
        let mut table = string_table();
        let mut dst = Vec::new();
        let mut a = strings(&["", "x"]);
        table.index(&mut dst, &mut a, Ownership::Clone);

        let mut b = strings(&["x", "y"]);
        table.index(&mut dst, &mut b, Ownership::Borrow);
        assert_eq!(dst, vec![1, 2]);
        assert_eq!(b, strings(&["x", ""]));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_append_does_not_dedup() {
        let mut table = string_table();
        let mut seed = strings(&["", "a", "a"]);
        table.append(&mut seed, Ownership::Clone);
        assert_eq!(table.len(), 3);

        // The key now resolves to its latest position.
        let mut dst = Vec::new();
        let mut more = strings(&["a"]);
        table.index(&mut dst, &mut more, Ownership::Clone);
        assert_eq!(dst, vec![2]);
    }

    #[test]
    fn test_rewrite_references() {
        let mut p = Profile {
            samples: vec![Sample {
                location_ids: vec![2, 1],
                values: vec![1],
                labels: vec![],
            }],
            locations: vec![
                Location {
                    id: 1,
                    mapping_id: 1,
                    lines: vec![Line {
                        function_id: 2,
                        line: 3,
                    }],
                    ..Default::default()
                },
                Location {
                    id: 2,
                    mapping_id: 0,
                    lines: vec![Line {
                        function_id: 0,
                        line: 1,
                    }],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        rewrite_functions(&mut p, &[5, 7]);
        rewrite_mappings(&mut p, &[3]);
        rewrite_locations(&mut p, &[9, 4]);

        assert_eq!(p.locations[0].lines[0].function_id, 8);
        assert_eq!(p.locations[1].lines[0].function_id, 0);
        assert_eq!(p.locations[0].mapping_id, 4);
        assert_eq!(p.locations[1].mapping_id, 0);
        assert_eq!(p.samples[0].location_ids, vec![5, 10]);
    }

    #[test]
    fn test_convert_ids_to_indices() {
        let mut p = Profile {
            samples: vec![Sample {
                location_ids: vec![20, 10],
                values: vec![1],
                labels: vec![],
            }],
            mappings: vec![Mapping {
                id: 7,
                ..Default::default()
            }],
            locations: vec![
                Location {
                    id: 10,
                    mapping_id: 7,
                    lines: vec![Line {
                        function_id: 30,
                        line: 1,
                    }],
                    ..Default::default()
                },
                Location {
                    id: 20,
                    mapping_id: 7,
                    lines: vec![Line {
                        function_id: 40,
                        line: 2,
                    }],
                    ..Default::default()
                },
            ],
            functions: vec![
                Function {
                    id: 40,
                    ..Default::default()
                },
                Function {
                    id: 30,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        convert_ids_to_indices(&mut p);

        assert!(p.has_dense_ids());
        assert_eq!(p.samples[0].location_ids, vec![2, 1]);
        assert_eq!(p.locations[0].mapping_id, 1);
        assert_eq!(p.locations[0].lines[0].function_id, 2);
        assert_eq!(p.locations[1].lines[0].function_id, 1);
    }

    #[test]
    fn test_rewrite_strings_covers_headers() {
        let mut p = Profile {
            drop_frames: 1,
            keep_frames: 2,
            comments: vec![1, 2],
            default_sample_type: 2,
            ..Default::default()
        };
        rewrite_strings(&mut p, &[0, 5, 6]);
        assert_eq!(p.drop_frames, 5);
        assert_eq!(p.keep_frames, 6);
        assert_eq!(p.comments, vec![5, 6]);
        assert_eq!(p.default_sample_type, 6);
        assert_eq!(p.period_type.r#type, 0);
    }
}
