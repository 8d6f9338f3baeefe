//! Export of sample subsets as standalone profiles
//!
//! The exported profile keeps only the locations, mappings, functions and
//! strings its samples reach, renumbered in first-reference order.

use strata_shared::{Function, Label, Line, Location, Mapping, Profile, Sample, ValueType};

/// Maps source positions to dense 1-based output ids; 0 means unreferenced
struct LookupTable {
    indices: Vec<u32>,
    resolved: u32,
}

impl LookupTable {
    fn new(len: usize) -> Self {
        Self {
            indices: vec![0; len],
            resolved: 0,
        }
    }

    fn lookup(&mut self, idx: usize) -> u32 {
        let x = &mut self.indices[idx];
        if *x == 0 {
            self.resolved += 1;
            *x = self.resolved;
        }
        *x
    }

    /// Look up a 1-based id; id 0 stays 0
    fn lookup_id(&mut self, id: u64) -> u64 {
        match id {
            0 => 0,
            id => self.lookup((id - 1) as usize) as u64,
        }
    }

    /// Look up a string reference; the empty string stays at 0
    fn lookup_string(&mut self, idx: i64) -> i64 {
        match idx {
            0 => 0,
            idx => self.lookup(idx as usize) as i64,
        }
    }

    fn reset(&mut self) {
        self.resolved = 0;
        self.indices.iter_mut().for_each(|x| *x = 0);
    }
}

/// Builds self-contained profiles out of sample subsets of one profile.
///
/// The source ids must be dense. One exporter can serve any number of
/// exports from the same source.
pub struct SampleExporter<'a> {
    profile: &'a Profile,
    locations: LookupTable,
    functions: LookupTable,
    mappings: LookupTable,
    strings: LookupTable,
}

impl<'a> SampleExporter<'a> {
    pub fn new(profile: &'a Profile) -> Self {
        Self {
            profile,
            locations: LookupTable::new(profile.locations.len()),
            functions: LookupTable::new(profile.functions.len()),
            mappings: LookupTable::new(profile.mappings.len()),
            strings: LookupTable::new(profile.string_table.len()),
        }
    }

    /// Export the samples at the given positions of the source profile
    pub fn export_samples(&mut self, samples: &[usize]) -> Profile {
        self.reset();
        let src = self.profile;

        let mut dst = Profile {
            time_nanos: src.time_nanos,
            duration_nanos: src.duration_nanos,
            period: src.period,
            ..Default::default()
        };
        dst.sample_types = src
            .sample_types
            .iter()
            .map(|vt| self.value_type(vt))
            .collect();
        dst.drop_frames = self.strings.lookup_string(src.drop_frames);
        dst.keep_frames = self.strings.lookup_string(src.keep_frames);
        dst.comments = src
            .comments
            .iter()
            .map(|&c| self.strings.lookup_string(c))
            .collect();
        dst.default_sample_type = self.strings.lookup_string(src.default_sample_type);

        dst.samples = samples
            .iter()
            .map(|&i| {
                let s = &src.samples[i];
                Sample {
                    location_ids: s
                        .location_ids
                        .iter()
                        .map(|&id| self.locations.lookup_id(id))
                        .collect(),
                    values: s.values.clone(),
                    labels: s
                        .labels
                        .iter()
                        .map(|l| Label {
                            key: self.strings.lookup_string(l.key),
                            str: self.strings.lookup_string(l.str),
                            num: l.num,
                            num_unit: self.strings.lookup_string(l.num_unit),
                        })
                        .collect(),
                }
            })
            .collect();

        dst.locations = vec![Location::default(); self.locations.resolved as usize];
        for i in 0..self.locations.indices.len() {
            let j = self.locations.indices[i];
            if j == 0 {
                continue;
            }
            let loc = &src.locations[i];
            dst.locations[(j - 1) as usize] = Location {
                id: j as u64,
                mapping_id: self.mappings.lookup_id(loc.mapping_id),
                address: loc.address,
                lines: loc
                    .lines
                    .iter()
                    .map(|line| Line {
                        function_id: self.functions.lookup_id(line.function_id),
                        line: line.line,
                    })
                    .collect(),
                is_folded: loc.is_folded,
            };
        }

        dst.mappings = vec![Mapping::default(); self.mappings.resolved as usize];
        for i in 0..self.mappings.indices.len() {
            let j = self.mappings.indices[i];
            if j == 0 {
                continue;
            }
            let m = &src.mappings[i];
            dst.mappings[(j - 1) as usize] = Mapping {
                id: j as u64,
                filename: self.strings.lookup_string(m.filename),
                build_id: self.strings.lookup_string(m.build_id),
                ..m.clone()
            };
        }

        dst.functions = vec![Function::default(); self.functions.resolved as usize];
        for i in 0..self.functions.indices.len() {
            let j = self.functions.indices[i];
            if j == 0 {
                continue;
            }
            let f = &src.functions[i];
            dst.functions[(j - 1) as usize] = Function {
                id: j as u64,
                name: self.strings.lookup_string(f.name),
                system_name: self.strings.lookup_string(f.system_name),
                filename: self.strings.lookup_string(f.filename),
                start_line: f.start_line,
            };
        }

        dst.period_type = self.value_type(&src.period_type);

        dst.string_table = vec![String::new(); self.strings.resolved as usize + 1];
        for (i, &j) in self.strings.indices.iter().enumerate() {
            if j != 0 {
                dst.string_table[j as usize] = src.string_table[i].clone();
            }
        }
        dst
    }

    fn value_type(&mut self, vt: &ValueType) -> ValueType {
        ValueType {
            r#type: self.strings.lookup_string(vt.r#type),
            unit: self.strings.lookup_string(vt.unit),
        }
    }

    fn reset(&mut self) {
        self.locations.reset();
        self.functions.reset();
        self.mappings.reset();
        self.strings.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Profile {
        Profile {
            string_table: ["", "cpu", "ns", "a", "b", "c", "lib.so", "env", "prod"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sample_types: vec![ValueType::new(1, 2)],
            period_type: ValueType::new(1, 2),
            period: 100,
            time_nanos: 7,
            mappings: vec![Mapping {
                id: 1,
                filename: 6,
                memory_limit: 0x1000,
                ..Default::default()
            }],
            functions: (1..=3)
                .map(|id| Function {
                    id,
                    name: id as i64 + 2,
                    ..Default::default()
                })
                .collect(),
            locations: (1..=3)
                .map(|id| Location {
                    id,
                    mapping_id: 1,
                    lines: vec![Line {
                        function_id: id,
                        line: 0,
                    }],
                    ..Default::default()
                })
                .collect(),
            samples: vec![
                Sample {
                    location_ids: vec![1, 2],
                    values: vec![1],
                    labels: vec![],
                },
                Sample {
                    location_ids: vec![3],
                    values: vec![2],
                    labels: vec![Label::string(7, 8)],
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_export_subset() {
        let src = source();
        let mut exporter = SampleExporter::new(&src);

        let out = exporter.export_samples(&[1]);
        assert_eq!(out.samples.len(), 1);
        assert_eq!(out.samples[0].location_ids, vec![1]);
        assert_eq!(out.locations.len(), 1);
        assert_eq!(out.functions.len(), 1);
        assert_eq!(out.mappings.len(), 1);
        assert!(out.has_dense_ids());
        assert_eq!(out.string(out.functions[0].name), "c");
        assert_eq!(out.string(out.mappings[0].filename), "lib.so");
        let label = out.samples[0].labels[0];
        assert_eq!(out.string(label.key), "env");
        assert_eq!(out.string(label.str), "prod");
        assert_eq!(out.sample_type_names(), vec!["cpu"]);
        assert_eq!(out.period, 100);
        assert_eq!(out.time_nanos, 7);
        assert_eq!(out.string_table.len(), 7);
    }

    #[test]
    fn test_export_disjoint_sets() {
        let src = source();
        let mut exporter = SampleExporter::new(&src);
        let first = exporter.export_samples(&[0]);
        let second = exporter.export_samples(&[1]);

        assert_eq!(first.locations.len(), 2);
        assert_eq!(first.samples[0].location_ids, vec![1, 2]);
        assert_eq!(first.string(first.functions[1].name), "b");
        assert_eq!(second.locations.len(), 1);
        assert_eq!(second.samples[0].values, vec![2]);
    }

    #[test]
    fn test_export_everything_is_identity() {
        let src = source();
        let out = SampleExporter::new(&src).export_samples(&[0, 1]);
        for (a, b) in out.samples.iter().zip(&src.samples) {
            assert_eq!(a.location_ids, b.location_ids);
            assert_eq!(a.values, b.values);
        }
        assert_eq!(out.locations, src.locations);
        let label = out.samples[1].labels[0];
        assert_eq!(out.string(label.str), "prod");
        assert_eq!(out.functions.len(), 3);
    }
}
