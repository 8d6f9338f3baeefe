//! Repair of stacks truncated at the root
//!
//! Some producers cap the depth of captured heap stacks and drop the frames
//! closest to the root. Samples of a truncated stack then share a root-side
//! suffix that also appears, further from the root, in the suffix of a
//! complete stack. The missing root frames are copied from that stack.
//!
//! Samples whose stacks are long enough are grouped by their root-most
//! frames. Each group's root-side window is cut into overlapping tokens, and
//! each token remembers the group in which it sits furthest from the root.
//! A group whose own root token was seen deeper in another group is an
//! incomplete copy of it; links are followed transitively.

use crate::config::TruncationRepairConfig;
use crate::metrics::REPAIR_TOTAL;
use rustc_hash::FxHashMap;
use std::ops::Range;
use strata_shared::Profile;
use tracing::{debug, warn};

/// Result of a truncation repair pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Not a heap profile, or no stack is close to the depth cap
    NotApplicable,

    /// No truncated group was found
    Unchanged,

    /// Stacks of this many samples were extended
    Repaired(usize),

    /// A chain exceeded the depth bound; the profile was left untouched
    Aborted,
}

impl RepairOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairOutcome::NotApplicable => "not_applicable",
            RepairOutcome::Unchanged => "unchanged",
            RepairOutcome::Repaired(_) => "repaired",
            RepairOutcome::Aborted => "aborted",
        }
    }
}

struct Group {
    /// Range into the sorted sample order
    members: Range<usize>,

    /// Root-first frames shared by the members
    suffix: Vec<u64>,
}

/// Check whether the profile is a heap profile with a stack near the cap
pub fn may_have_truncated_stacks(p: &Profile, config: &TruncationRepairConfig) -> bool {
    let heap = p.sample_types.iter().any(|st| {
        config
            .heap_sample_types
            .iter()
            .any(|name| name == p.string(st.r#type))
    });
    heap && p
        .samples
        .iter()
        .any(|s| s.location_ids.len() >= config.min_depth)
}

/// Extend truncated stacks with the root frames of their complete
/// counterparts. Stacks are never shortened.
pub fn repair_truncated_stacks(p: &mut Profile, config: &TruncationRepairConfig) -> RepairOutcome {
    let outcome = repair(p, config);
    REPAIR_TOTAL
        .with_label_values(&["truncated_stacks", outcome.as_str()])
        .inc();
    outcome
}

fn repair(p: &mut Profile, config: &TruncationRepairConfig) -> RepairOutcome {
    if !may_have_truncated_stacks(p, config) {
        return RepairOutcome::NotApplicable;
    }
    let suffix_len = config.suffix_len();

    let mut order: Vec<(Vec<u64>, usize)> = p
        .samples
        .iter()
        .enumerate()
        .filter(|(_, s)| s.location_ids.len() >= suffix_len)
        .map(|(i, s)| {
            let root_first = s.location_ids.iter().rev().take(suffix_len).copied().collect();
            (root_first, i)
        })
        .collect();
    order.sort();

    let mut groups: Vec<Group> = Vec::new();
    let mut start = 0;
    for i in 1..=order.len() {
        if i < order.len() && order[i].0 == order[start].0 {
            continue;
        }
        if i - start >= config.min_group_size {
            groups.push(Group {
                members: start..i,
                suffix: order[start].0.clone(),
            });
        }
        start = i;
    }

    // Token -> (group, offset from the root), keeping the furthest offset.
    let mut tokens: FxHashMap<&[u64], (usize, usize)> = FxHashMap::default();
    for (g, group) in groups.iter().enumerate() {
        for off in 1..=config.tokens {
            let token = &group.suffix[off..off + config.token_len];
            let entry = tokens.entry(token).or_insert((g, off));
            if off > entry.1 {
                *entry = (g, off);
            }
        }
    }

    let links: Vec<Option<(usize, usize)>> = groups
        .iter()
        .enumerate()
        .map(|(g, group)| {
            tokens
                .get(&group.suffix[..config.token_len])
                .copied()
                .filter(|&(x, _)| x != g)
        })
        .collect();

    // Frames to append to each group, leaf-first.
    let mut extensions: Vec<Vec<u64>> = vec![Vec::new(); groups.len()];
    for (g, ext) in extensions.iter_mut().enumerate() {
        let mut next = links[g];
        let mut depth = 0;
        while let Some((x, off)) = next {
            depth += 1;
            if depth > config.max_chain_depth {
                warn!(
                    max_chain_depth = config.max_chain_depth,
                    "truncated stack chain too deep, skipping repair"
                );
                return RepairOutcome::Aborted;
            }
            let ancestor = &p.samples[order[groups[x].members.start].1].location_ids;
            ext.extend_from_slice(&ancestor[ancestor.len() - off..]);
            next = links[x];
        }
    }

    let mut repaired = 0;
    for (group, ext) in groups.iter().zip(&extensions) {
        if ext.is_empty() {
            continue;
        }
        for &(_, i) in &order[group.members.clone()] {
            p.samples[i].location_ids.extend_from_slice(ext);
            repaired += 1;
        }
    }
    if repaired == 0 {
        return RepairOutcome::Unchanged;
    }
    debug!(groups = groups.len(), samples = repaired, "repaired truncated stacks");
    RepairOutcome::Repaired(repaired)
}
