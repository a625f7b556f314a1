//! Incremental binary Merkle tree with append, update and remove.
//!
//! Leaves are appended left to right. Positions that have never been written are padded with the
//! tree's zero value, so the root is a pure function of `(depth, zero_value, leaves)`. Removal
//! writes the zero value back into the slot; the index is never handed out again.

use ark_bn254::Fr;
use cred_zk::constants::{MAX_TREE_DEPTH, MIN_TREE_DEPTH};
use cred_zk::hash::hash_pair;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("tree depth {0} is outside the supported range")]
    InvalidDepth(usize),

    #[error("tree is full")]
    TreeFull,

    #[error("batch contains no leaves")]
    EmptyBatch,

    #[error("path length mismatch: expected {expected}, got {siblings} siblings and {path_indices} path indices")]
    PathLength {
        expected: usize,
        siblings: usize,
        path_indices: usize,
    },

    #[error("path index at level {level} must be 0 or 1")]
    InvalidPathIndex { level: usize },

    #[error("leaf index {index} out of range ({leaves} leaves)")]
    LeafIndexOutOfRange { index: u64, leaves: u64 },

    #[error("new leaf must differ from the current leaf")]
    LeafUnchanged,

    #[error("leaf is not part of the tree")]
    LeafNotFound,
}

/// Convert a path (leaf level first) to the 0-based leaf index.
///
/// Level `i` contributes bit `i`, so the deepest level is the least significant bit.
pub fn leaf_index(path_indices: &[u8]) -> u64 {
    path_indices
        .iter()
        .enumerate()
        .fold(0u64, |acc, (level, bit)| acc | (u64::from(*bit) << level))
}

/// Hash `leaf` up through `siblings` and return the resulting root.
///
/// Callers are responsible for validating the path shape first.
pub fn compute_root(leaf: Fr, siblings: &[Fr], path_indices: &[u8]) -> Fr {
    siblings
        .iter()
        .zip(path_indices)
        .fold(leaf, |node, (sibling, index)| {
            if *index == 0 {
                hash_pair(node, *sibling)
            } else {
                hash_pair(*sibling, node)
            }
        })
}

/// A sibling path for one leaf, as consumed by update/remove and the membership circuit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof {
    pub leaf: Fr,
    pub siblings: Vec<Fr>,
    pub path_indices: Vec<u8>,
    pub root: Fr,
}

impl MerkleProof {
    pub fn index(&self) -> u64 {
        leaf_index(&self.path_indices)
    }

    /// Stateless check that the path reduces to `root`.
    pub fn verify(&self) -> bool {
        self.siblings.len() == self.path_indices.len()
            && self.path_indices.iter().all(|i| *i <= 1)
            && compute_root(self.leaf, &self.siblings, &self.path_indices) == self.root
    }
}

#[derive(Clone, Debug)]
pub struct IncrementalMerkleTree {
    depth: usize,
    /// `zeroes[i]` is the root of an empty subtree of height `i`.
    zeroes: Vec<Fr>,
    /// `nodes[level][position]`, dense up to the highest written position. Level 0 holds leaves.
    nodes: Vec<Vec<Fr>>,
    root: Fr,
    number_of_leaves: u64,
}

impl IncrementalMerkleTree {
    pub fn new(depth: usize, zero_value: Fr) -> Result<Self, TreeError> {
        if !(MIN_TREE_DEPTH..=MAX_TREE_DEPTH).contains(&depth) {
            return Err(TreeError::InvalidDepth(depth));
        }

        let mut zeroes = Vec::with_capacity(depth + 1);
        zeroes.push(zero_value);
        for level in 0..depth {
            let z = zeroes[level];
            zeroes.push(hash_pair(z, z));
        }

        Ok(Self {
            depth,
            root: zeroes[depth],
            zeroes,
            nodes: vec![Vec::new(); depth],
            number_of_leaves: 0,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn zero_value(&self) -> Fr {
        self.zeroes[0]
    }

    pub fn root(&self) -> Fr {
        self.root
    }

    /// Count of slots ever appended; removals do not decrease it.
    pub fn number_of_leaves(&self) -> u64 {
        self.number_of_leaves
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Current value at `index`, or `None` if the slot was never appended.
    pub fn leaf(&self, index: u64) -> Option<Fr> {
        self.nodes[0].get(usize::try_from(index).ok()?).copied()
    }

    fn node(&self, level: usize, position: u64) -> Fr {
        usize::try_from(position)
            .ok()
            .and_then(|p| self.nodes[level].get(p).copied())
            .unwrap_or(self.zeroes[level])
    }

    fn siblings_of(&self, index: u64) -> Vec<Fr> {
        (0..self.depth)
            .map(|level| self.node(level, (index >> level) ^ 1))
            .collect()
    }

    /// Write `leaf` at `index` and rehash its path with the given siblings.
    fn write_path(&mut self, index: u64, leaf: Fr, siblings: &[Fr]) {
        let mut node = leaf;
        for level in 0..self.depth {
            let position = (index >> level) as usize;
            let row = &mut self.nodes[level];
            if position == row.len() {
                row.push(node);
            } else {
                row[position] = node;
            }

            node = if position & 1 == 0 {
                hash_pair(node, siblings[level])
            } else {
                hash_pair(siblings[level], node)
            };
        }
        self.root = node;
    }

    /// Append a leaf; returns its index.
    pub fn insert(&mut self, leaf: Fr) -> Result<u64, TreeError> {
        if self.number_of_leaves >= self.capacity() {
            return Err(TreeError::TreeFull);
        }

        let index = self.number_of_leaves;
        let siblings = self.siblings_of(index);
        self.write_path(index, leaf, &siblings);
        self.number_of_leaves += 1;
        Ok(index)
    }

    /// Append every leaf in order, or none of them if they do not all fit.
    ///
    /// Returns the index of the first appended leaf.
    pub fn insert_many(&mut self, leaves: &[Fr]) -> Result<u64, TreeError> {
        if leaves.is_empty() {
            return Err(TreeError::EmptyBatch);
        }
        let free = self.capacity() - self.number_of_leaves;
        if leaves.len() as u64 > free {
            return Err(TreeError::TreeFull);
        }

        let start = self.number_of_leaves;
        for leaf in leaves {
            self.insert(*leaf)?;
        }
        Ok(start)
    }

    /// Validate the shape of a caller-supplied path and prove `leaf` sits on it under the
    /// current root. Returns the leaf index.
    fn check_membership(&self, leaf: Fr, siblings: &[Fr], path_indices: &[u8]) -> Result<u64, TreeError> {
        if siblings.len() != self.depth || path_indices.len() != self.depth {
            return Err(TreeError::PathLength {
                expected: self.depth,
                siblings: siblings.len(),
                path_indices: path_indices.len(),
            });
        }
        if let Some(level) = path_indices.iter().position(|i| *i > 1) {
            return Err(TreeError::InvalidPathIndex { level });
        }

        let index = leaf_index(path_indices);
        if index >= self.number_of_leaves {
            return Err(TreeError::LeafIndexOutOfRange {
                index,
                leaves: self.number_of_leaves,
            });
        }

        if compute_root(leaf, siblings, path_indices) != self.root {
            return Err(TreeError::LeafNotFound);
        }
        Ok(index)
    }

    /// Replace `old_leaf` with `new_leaf`; returns the leaf index.
    pub fn update(
        &mut self,
        old_leaf: Fr,
        new_leaf: Fr,
        siblings: &[Fr],
        path_indices: &[u8],
    ) -> Result<u64, TreeError> {
        if new_leaf == old_leaf {
            return Err(TreeError::LeafUnchanged);
        }

        let index = self.check_membership(old_leaf, siblings, path_indices)?;
        self.write_path(index, new_leaf, siblings);
        Ok(index)
    }

    /// Reset `leaf` to the zero value; returns the retired index.
    pub fn remove(&mut self, leaf: Fr, siblings: &[Fr], path_indices: &[u8]) -> Result<u64, TreeError> {
        self.update(leaf, self.zero_value(), siblings, path_indices)
    }

    /// Sibling path for the leaf at `index` under the current root.
    pub fn proof_for(&self, index: u64) -> Result<MerkleProof, TreeError> {
        let leaf = self.leaf(index).ok_or(TreeError::LeafIndexOutOfRange {
            index,
            leaves: self.number_of_leaves,
        })?;

        Ok(MerkleProof {
            leaf,
            siblings: self.siblings_of(index),
            path_indices: (0..self.depth).map(|level| ((index >> level) & 1) as u8).collect(),
            root: self.root,
        })
    }
}
