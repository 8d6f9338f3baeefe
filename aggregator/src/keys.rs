//! Structural identity keys for profile entities
//!
//! Two entities with equal keys are merged into one. Keys are built from
//! string references, so they are only comparable once every table of the
//! profile has been rewritten against the shared string table.

use strata_shared::utils::hash::{hash_ids, SequenceHasher};
use strata_shared::{Function, Label, Line, Location, Mapping, Sample};

/// Mapping sizes are compared in page-sized units
const MAPPING_SIZE_ALIGNMENT: u64 = 0x1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionKey {
    start_line: i64,
    name: i64,
    system_name: i64,
    filename: i64,
}

pub fn function_key(f: &Function) -> FunctionKey {
    FunctionKey {
        start_line: f.start_line,
        name: f.name,
        system_name: f.system_name,
        filename: f.filename,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingKey {
    size: u64,
    offset: u64,
    build_id_or_file: i64,
}

/// Mappings are identified by their page-rounded size, file offset and
/// either build id or file name. A mapping with neither is a placeholder
/// and all placeholders share the zero key.
pub fn mapping_key(m: &Mapping) -> MappingKey {
    let build_id_or_file = if m.build_id != 0 {
        m.build_id
    } else if m.filename != 0 {
        m.filename
    } else {
        return MappingKey {
            size: 0,
            offset: 0,
            build_id_or_file: 0,
        };
    };
    let size = m.memory_limit.wrapping_sub(m.memory_start);
    let size = size
        .wrapping_add(MAPPING_SIZE_ALIGNMENT - 1)
        .wrapping_div(MAPPING_SIZE_ALIGNMENT)
        .wrapping_mul(MAPPING_SIZE_ALIGNMENT);
    MappingKey {
        size,
        offset: m.file_offset,
        build_id_or_file,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocationKey {
    addr: u64,
    lines: u64,
    mapping_id: u64,
}

pub fn location_key(loc: &Location) -> LocationKey {
    LocationKey {
        addr: loc.address,
        lines: hash_lines(&loc.lines),
        mapping_id: loc.mapping_id,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleKey {
    locations: u64,
    labels: u64,
}

/// Labels must already be sorted.
pub fn sample_key(s: &Sample) -> SampleKey {
    SampleKey {
        locations: hash_ids(&s.location_ids),
        labels: hash_labels(&s.labels),
    }
}

pub fn hash_lines(lines: &[Line]) -> u64 {
    let mut h = SequenceHasher::new();
    for line in lines {
        h.write_u64(line.function_id);
        h.write_i64(line.line);
    }
    h.finish()
}

/// Hash a sorted label set. The empty set hashes to 0.
pub fn hash_labels(labels: &[Label]) -> u64 {
    if labels.is_empty() {
        return 0;
    }
    let mut h = SequenceHasher::new();
    write_labels(&mut h, labels);
    h.finish()
}

/// Hash of the stack and the sorted label set of a sample
pub fn stack_hash(s: &Sample) -> u64 {
    let mut h = SequenceHasher::new();
    for &id in &s.location_ids {
        h.write_u64(id);
    }
    write_labels(&mut h, &s.labels);
    h.finish()
}

fn write_labels(h: &mut SequenceHasher, labels: &[Label]) {
    for l in labels {
        h.write_i64(l.key);
        h.write_i64(l.str);
        h.write_i64(l.num);
        h.write_i64(l.num_unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_key_rounds_size() {
        let a = Mapping {
            memory_start: 0x1000,
            memory_limit: 0x1800,
            filename: 3,
            ..Default::default()
        };
        let b = Mapping {
            memory_start: 0x4000,
            memory_limit: 0x5000,
            filename: 3,
            ..Default::default()
        };
        assert_eq!(mapping_key(&a), mapping_key(&b));

        let c = Mapping {
            memory_limit: 0x2001,
            filename: 3,
            ..Default::default()
        };
        assert_ne!(mapping_key(&a), mapping_key(&c));
    }

    #[test]
    fn test_mapping_key_prefers_build_id() {
        let a = Mapping {
            build_id: 5,
            filename: 3,
            ..Default::default()
        };
        let b = Mapping {
            build_id: 5,
            filename: 4,
            ..Default::default()
        };
        assert_eq!(mapping_key(&a), mapping_key(&b));
    }

    #[test]
    fn test_fake_mappings_share_key() {
        let a = Mapping {
            id: 1,
            memory_limit: u64::MAX,
            ..Default::default()
        };
        let b = Mapping {
            id: 2,
            memory_start: 0x400000,
            memory_limit: 0x500000,
            file_offset: 16,
            ..Default::default()
        };
        assert_eq!(mapping_key(&a), mapping_key(&b));
    }

    #[test]
    fn test_location_key_ignores_id() {
        let lines = vec![Line {
            function_id: 1,
            line: 10,
        }];
        let a = Location {
            id: 1,
            mapping_id: 1,
            address: 0x10,
            lines: lines.clone(),
            ..Default::default()
        };
        let b = Location {
            id: 9,
            ..a.clone()
        };
        assert_eq!(location_key(&a), location_key(&b));

        let c = Location {
            lines: vec![Line {
                function_id: 1,
                line: 11,
            }],
            ..a.clone()
        };
        assert_ne!(location_key(&a), location_key(&c));
    }

    #[test]
    fn test_sample_key_distinguishes_labels() {
        let a = Sample {
            location_ids: vec![1, 2, 3],
            values: vec![1],
            labels: vec![Label::string(5, 6)],
        };
        let b = Sample {
            values: vec![100],
            ..a.clone()
        };
        assert_eq!(sample_key(&a), sample_key(&b));

        let c = Sample {
            labels: vec![Label::string(5, 7)],
            ..a.clone()
        };
        assert_ne!(sample_key(&a), sample_key(&c));

        let d = Sample {
            labels: vec![Label::numeric(5, 1, 0)],
            ..a.clone()
        };
        let e = Sample {
            labels: vec![Label::numeric(5, 2, 0)],
            ..a.clone()
        };
        assert_ne!(sample_key(&d), sample_key(&e));
    }

    #[test]
    fn test_empty_labels_hash_to_zero() {
        assert_eq!(hash_labels(&[]), 0);
        assert_ne!(hash_labels(&[Label::string(1, 2)]), 0);
    }
}
