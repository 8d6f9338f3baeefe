//! Sample label utilities
//!
//! Label sets are compared and grouped in their sorted form: labels ordered
//! by key, then string value, then numeric value and unit.

use std::cmp::Ordering;
use std::ops::Range;
use strata_shared::{Label, Profile};
use tracing::debug;

pub const SPAN_ID_LABEL_NAME: &str = "span_id";

/// Source languages recognized by [`language`], in matching order
const LANGUAGE_MATCHERS: &[(&str, &[&str])] = &[
    ("go", &[".go", "/usr/local/go/"]),
    ("java", &["java/", "sun/"]),
    ("ruby", &[".rb", "gems/"]),
    ("nodejs", &["./node_modules/", ".js"]),
    ("dotnet", &["System.", "Microsoft."]),
    ("python", &[".py"]),
    ("rust", &["main.rs", "core.rs"]),
];

/// A run of samples sharing one label set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGroup {
    pub labels: Vec<Label>,

    /// Range of the group's samples in `Profile::samples`
    pub samples: Range<usize>,
}

pub fn compare_labels(a: &Label, b: &Label) -> Ordering {
    (a.key, a.str, a.num, a.num_unit).cmp(&(b.key, b.str, b.num, b.num_unit))
}

pub fn sort_labels(labels: &mut [Label]) {
    labels.sort_unstable_by(compare_labels);
}

/// Compare two sorted label sets by key and string value, then by length
pub fn compare_sample_labels(a: &[Label], b: &[Label]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match (x.key, x.str).cmp(&(y.key, y.str)) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// Sort samples by their (sorted) label sets
pub fn sort_samples_by_labels(p: &mut Profile) {
    for s in p.samples.iter_mut() {
        sort_labels(&mut s.labels);
    }
    p.samples
        .sort_by(|a, b| compare_sample_labels(&a.labels, &b.labels));
}

/// Split samples into runs of equal label sets.
///
/// Samples are expected to be sorted with [`sort_samples_by_labels`].
pub fn group_samples_by_labels(p: &Profile) -> Vec<SampleGroup> {
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..=p.samples.len() {
        if i == p.samples.len()
            || compare_sample_labels(&p.samples[i].labels, &p.samples[start].labels)
                != Ordering::Equal
        {
            groups.push(SampleGroup {
                labels: p.samples[start].labels.clone(),
                samples: start..i,
            });
            start = i;
        }
    }
    groups
}

/// Group samples by their labels, ignoring the labels with the given keys.
///
/// Samples are reordered by the labels that remain. Each group carries the
/// remaining labels; the ignored labels stay on the samples and nothing
/// else does.
pub fn group_samples_without_labels(p: &mut Profile, keys: &[&str]) -> Vec<SampleGroup> {
    if keys.is_empty() {
        sort_samples_by_labels(p);
        return group_samples_by_labels(p);
    }
    let key_ids = label_keys_by_string(p, keys);
    let mut split: Vec<_> = std::mem::take(&mut p.samples)
        .into_iter()
        .map(|mut s| {
            sort_labels(&mut s.labels);
            let (hidden, kept): (Vec<Label>, Vec<Label>) = s
                .labels
                .drain(..)
                .partition(|l| key_ids.binary_search(&l.key).is_ok());
            s.labels = hidden;
            (kept, s)
        })
        .collect();
    split.sort_by(|a, b| compare_sample_labels(&a.0, &b.0));

    let mut groups: Vec<SampleGroup> = Vec::new();
    for (i, (kept, _)) in split.iter().enumerate() {
        match groups.last_mut() {
            Some(g) if compare_sample_labels(&g.labels, kept) == Ordering::Equal => {
                g.samples.end = i + 1;
            }
            _ => groups.push(SampleGroup {
                labels: kept.clone(),
                samples: i..i + 1,
            }),
        }
    }
    p.samples = split.into_iter().map(|(_, s)| s).collect();
    groups
}

/// Sorted string ids of the given label keys; 0 for keys not in the table
pub fn label_keys_by_string(p: &Profile, keys: &[&str]) -> Vec<i64> {
    let mut ids: Vec<i64> = keys
        .iter()
        .map(|k| p.find_string(k).unwrap_or(0))
        .collect();
    ids.sort_unstable();
    ids
}

/// String id of a label name
pub fn label_id(p: &Profile, name: &str) -> Option<i64> {
    p.find_string(name)
}

/// Rename a label key on every sample, adding the new name to the string
/// table if needed
pub fn rename_label(p: &mut Profile, old_name: &str, new_name: &str) {
    let old = match p.find_string(old_name) {
        Some(i) if i != 0 => i,
        _ => return,
    };
    let new = match p.find_string(new_name) {
        Some(i) if i != 0 => i,
        _ => {
            p.string_table.push(new_name.to_string());
            (p.string_table.len() - 1) as i64
        }
    };
    for s in p.samples.iter_mut() {
        for l in s.labels.iter_mut() {
            if l.key == old {
                l.key = new;
            }
        }
    }
}

/// Blank the string-table entries that only labels refer to
pub fn zero_label_strings(p: &mut Profile) {
    let mut used = vec![false; p.string_table.len()];
    let mut mark = |idx: i64| used[idx as usize] = true;
    for t in &p.sample_types {
        mark(t.r#type);
        mark(t.unit);
    }
    for f in &p.functions {
        mark(f.name);
        mark(f.system_name);
        mark(f.filename);
    }
    for m in &p.mappings {
        mark(m.filename);
        mark(m.build_id);
    }
    for &c in &p.comments {
        mark(c);
    }
    mark(p.keep_frames);
    mark(p.drop_frames);
    mark(p.period_type.r#type);
    mark(p.period_type.unit);
    mark(p.default_sample_type);
    for (s, used) in p.string_table.iter_mut().zip(used) {
        if !used {
            s.clear();
        }
    }
}

/// Span id of every sample, decoded from its `span_id` label.
///
/// Returns an empty list if no sample can carry one. Samples without a valid
/// 16-hex-digit span id get 0.
pub fn profile_spans(p: &Profile) -> Vec<u64> {
    let key = match label_id(p, SPAN_ID_LABEL_NAME) {
        Some(k) if k > 0 => k,
        _ => return Vec::new(),
    };
    let mut buf = [0u8; 8];
    p.samples
        .iter()
        .map(|s| {
            s.labels
                .iter()
                .filter(|l| l.key == key)
                .find_map(|l| {
                    let value = p.string(l.str);
                    hex::decode_to_slice(value, &mut buf)
                        .ok()
                        .map(|_| u64::from_le_bytes(buf))
                })
                .unwrap_or(0)
        })
        .collect()
}

/// Guess the source language of a profile from its symbol names
pub fn language(p: &Profile) -> &'static str {
    for symbol in &p.string_table {
        for (lang, patterns) in LANGUAGE_MATCHERS {
            if patterns
                .iter()
                .any(|pat| symbol.starts_with(pat) || symbol.ends_with(pat))
            {
                debug!(lang, symbol = symbol.as_str(), "found profile language");
                return lang;
            }
        }
    }
    "unknown"
}
