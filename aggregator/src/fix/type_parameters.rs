//! Generic shape instantiation collapsing
//!
//! Some toolchains name generic function instantiations after the shape of
//! their type arguments, e.g. `pkg.Foo[go.shape.int_0].Bar`. The shape part
//! varies between call sites of what is one function, so the whole bracketed
//! span is replaced with a fixed placeholder and the profile is merged with
//! itself to fold the frames that became identical.

use crate::error::MergeError;
use crate::merge::ProfileMerge;
use crate::metrics::REPAIR_TOTAL;
use strata_shared::Profile;
use tracing::debug;

const SHAPE_MARKER: &str = "[go.shape.";
const PLACEHOLDER: &str = "[...]";

/// Collapse generic shape instantiations. A profile without any is
/// returned unchanged.
pub fn drop_type_parameters(mut p: Profile) -> Result<Profile, MergeError> {
    let mut changed = 0;
    for s in p.string_table.iter_mut() {
        if let Some(fixed) = collapse_shapes(s) {
            *s = fixed;
            changed += 1;
        }
    }
    if changed == 0 {
        REPAIR_TOTAL
            .with_label_values(&["type_parameters", "unchanged"])
            .inc();
        return Ok(p);
    }
    debug!(strings = changed, "collapsed generic shape instantiations");
    REPAIR_TOTAL
        .with_label_values(&["type_parameters", "repaired"])
        .inc();
    let mut m = ProfileMerge::new();
    m.merge_no_clone(p)?;
    Ok(m.into_profile())
}

/// Returns the rewritten string, or `None` if nothing was replaced
fn collapse_shapes(s: &str) -> Option<String> {
    if !s.contains(SHAPE_MARKER) {
        return None;
    }
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut copied = 0;
    while let Some(pos) = s[copied..].find(SHAPE_MARKER) {
        let start = copied + pos;
        let Some(end) = matching_bracket(bytes, start) else {
            // Unbalanced: the rest is copied through.
            break;
        };
        out.push_str(&s[copied..start]);
        out.push_str(PLACEHOLDER);
        copied = end + 1;
    }
    if copied == 0 {
        return None;
    }
    out.push_str(&s[copied..]);
    Some(out)
}

/// Position of the bracket closing the one at `open`
fn matching_bracket(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
