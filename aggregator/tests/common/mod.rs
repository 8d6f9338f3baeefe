//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use strata_shared::{Function, Label, Line, Location, Mapping, Profile, Sample, ValueType};

/// Builds profiles from function names, interning strings and creating one
/// location per function.
pub struct ProfileBuilder {
    p: Profile,
}

impl ProfileBuilder {
    pub fn new(sample_types: &[(&str, &str)]) -> Self {
        let mut b = Self {
            p: Profile {
                string_table: vec![String::new()],
                time_nanos: 1_700_000_000_000_000_000,
                duration_nanos: 10_000_000_000,
                period: 10_000_000,
                ..Default::default()
            },
        };
        for (ty, unit) in sample_types {
            let vt = ValueType::new(b.string(ty), b.string(unit));
            b.p.sample_types.push(vt);
        }
        b.p.period_type = b.p.sample_types[sample_types.len() - 1];
        let filename = b.string("app");
        b.p.mappings.push(Mapping {
            id: 1,
            memory_start: 0x400000,
            memory_limit: 0x500000,
            filename,
            ..Default::default()
        });
        b
    }

    pub fn cpu() -> Self {
        Self::new(&[("samples", "count"), ("cpu", "nanoseconds")])
    }

    pub fn heap() -> Self {
        Self::new(&[("alloc_objects", "count"), ("alloc_space", "bytes")])
    }

    pub fn string(&mut self, s: &str) -> i64 {
        match self.p.find_string(s) {
            Some(i) => i,
            None => {
                self.p.string_table.push(s.to_string());
                (self.p.string_table.len() - 1) as i64
            }
        }
    }

    pub fn function(&mut self, name: &str) -> u64 {
        let name = self.string(name);
        if let Some(f) = self.p.functions.iter().find(|f| f.name == name) {
            return f.id;
        }
        let filename = self.string("main.go");
        let id = self.p.functions.len() as u64 + 1;
        self.p.functions.push(Function {
            id,
            name,
            filename,
            ..Default::default()
        });
        id
    }

    pub fn location(&mut self, function: &str) -> u64 {
        let function_id = self.function(function);
        if let Some(loc) = self
            .p
            .locations
            .iter()
            .find(|l| l.lines[0].function_id == function_id)
        {
            return loc.id;
        }
        let id = self.p.locations.len() as u64 + 1;
        self.p.locations.push(Location {
            id,
            mapping_id: 1,
            address: 0x400000 + 0x10 * id,
            lines: vec![Line {
                function_id,
                line: id as i64 * 3,
            }],
            ..Default::default()
        });
        id
    }

    /// Add a sample with a leaf-first stack of function names
    pub fn sample(mut self, stack: &[&str], values: &[i64], labels: &[(&str, &str)]) -> Self {
        let location_ids = stack.iter().map(|f| self.location(f)).collect();
        let labels = labels
            .iter()
            .map(|(k, v)| Label::string(self.string(k), self.string(v)))
            .collect();
        self.p.samples.push(Sample {
            location_ids,
            values: values.to_vec(),
            labels,
        });
        self
    }

    /// Add a sample with raw location ids, creating locations as needed
    pub fn raw_sample(mut self, location_ids: Vec<u64>, values: &[i64]) -> Self {
        for &id in &location_ids {
            while (self.p.locations.len() as u64) < id {
                let n = self.p.locations.len() + 1;
                self.location(&format!("f{}", n));
            }
        }
        self.p.samples.push(Sample {
            location_ids,
            values: values.to_vec(),
            labels: vec![],
        });
        self
    }

    pub fn build(self) -> Profile {
        self.p
    }
}

/// A CPU profile with shared frames, labels and distinct stacks
pub fn cpu_fixture() -> Profile {
    ProfileBuilder::cpu()
        .sample(&["parse", "run", "main"], &[4, 40_000_000], &[("env", "prod")])
        .sample(&["work", "run", "main"], &[10, 100_000_000], &[])
        .sample(&["work", "run", "main"], &[2, 20_000_000], &[("env", "dev")])
        .sample(&["io", "main"], &[1, 10_000_000], &[("env", "prod"), ("thread", "worker")])
        .sample(&["compress", "io", "main"], &[7, 70_000_000], &[])
        .sample(&["main"], &[3, 30_000_000], &[("env", "prod")])
        .sample(&["encode", "work", "run", "main"], &[5, 50_000_000], &[])
        .sample(&["decode", "parse", "run", "main"], &[6, 60_000_000], &[("env", "dev")])
        .build()
}

/// Resolved sample identity: stack frames as `function:line`, labels as
/// `key=value`
pub type SampleIdentity = (Vec<String>, Vec<String>);

/// Resolve every sample to strings and sum values per identity
pub fn resolved_samples(p: &Profile) -> BTreeMap<SampleIdentity, Vec<i64>> {
    let mut out: BTreeMap<SampleIdentity, Vec<i64>> = BTreeMap::new();
    for s in &p.samples {
        let stack = s
            .location_ids
            .iter()
            .map(|&id| {
                let loc = &p.locations[(id - 1) as usize];
                loc.lines
                    .iter()
                    .map(|line| {
                        let f = &p.functions[(line.function_id - 1) as usize];
                        format!("{}:{}", p.string(f.name), line.line)
                    })
                    .collect::<Vec<_>>()
                    .join(";")
            })
            .collect();
        let mut labels: Vec<String> = s
            .labels
            .iter()
            .map(|l| format!("{}={}", p.string(l.key), p.string(l.str)))
            .collect();
        labels.sort();
        let values = out
            .entry((stack, labels))
            .or_insert_with(|| vec![0; s.values.len()]);
        for (v, x) in values.iter_mut().zip(&s.values) {
            *v += x;
        }
    }
    out
}

/// Copy of `p` keeping only the samples in `range`
pub fn with_samples(p: &Profile, range: std::ops::Range<usize>) -> Profile {
    Profile {
        samples: p.samples[range].to_vec(),
        ..p.clone()
    }
}
