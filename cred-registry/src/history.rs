//! Per-cred record of every root the tree has ever had and when it first appeared.
//!
//! Entries are never evicted: validity is decided at verification time from the creation
//! timestamp and the cred's validity duration.

use ark_bn254::Fr;
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct RootHistory {
    created_at: HashMap<Fr, u64>,
}

impl RootHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp `root` with `now` unless it was already recorded. Returns whether it was new.
    pub fn record(&mut self, root: Fr, now: u64) -> bool {
        if self.created_at.contains_key(&root) {
            return false;
        }
        self.created_at.insert(root, now);
        true
    }

    pub fn created_at(&self, root: &Fr) -> Option<u64> {
        self.created_at.get(root).copied()
    }

    /// `true` while `now` is within `validity` seconds of the root's creation (inclusive).
    pub fn is_fresh(created_at: u64, validity: u64, now: u64) -> bool {
        now <= created_at.saturating_add(validity)
    }

    pub fn len(&self) -> usize {
        self.created_at.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created_at.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_stamp_wins() {
        let mut history = RootHistory::new();
        let root = Fr::from(1u64);
        assert!(history.record(root, 100));
        assert!(!history.record(root, 500));
        assert_eq!(history.created_at(&root), Some(100));
        assert_eq!(history.created_at(&Fr::from(2u64)), None);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn freshness_boundary_is_inclusive() {
        assert!(RootHistory::is_fresh(1_000, 3_600, 4_599));
        assert!(RootHistory::is_fresh(1_000, 3_600, 4_600));
        assert!(!RootHistory::is_fresh(1_000, 3_600, 4_601));
        assert!(RootHistory::is_fresh(u64::MAX - 1, 3_600, u64::MAX));
    }
}
