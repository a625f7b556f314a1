//! Per-cred set of consumed nullifier hashes.

use ark_bn254::Fr;
use std::collections::HashSet;

#[derive(Clone, Debug, Default)]
pub struct NullifierSet {
    consumed: HashSet<Fr>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_consumed(&self, nullifier_hash: &Fr) -> bool {
        self.consumed.contains(nullifier_hash)
    }

    /// Mark a nullifier as spent. The caller checks `is_consumed` first; consumption is permanent.
    pub fn consume(&mut self, nullifier_hash: Fr) {
        self.consumed.insert(nullifier_hash);
    }

    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}
