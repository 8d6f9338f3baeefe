//! Fixed-seed hashing of numeric id sequences
//!
//! Hashes only need to be stable within one process: they identify
//! structurally identical stacks, frame lists and label sets while merging.
//! Every value is fed to the hasher as its fixed-width little-endian bytes.

use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Incremental hasher over a sequence of integers
#[derive(Default)]
pub struct SequenceHasher {
    inner: FxHasher,
}

impl SequenceHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u64(&mut self, v: u64) {
        self.inner.write(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.inner.write(&v.to_le_bytes());
    }

    pub fn finish(&self) -> u64 {
        self.inner.finish()
    }
}

/// Hash a sequence of ids
pub fn hash_ids(ids: &[u64]) -> u64 {
    if ids.is_empty() {
        return 0;
    }
    let mut h = SequenceHasher::new();
    for &id in ids {
        h.write_u64(id);
    }
    h.finish()
}
