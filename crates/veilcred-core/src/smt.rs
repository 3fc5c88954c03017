//! C3 — fixed-depth sparse Merkle tree used by the revocation accumulator.
//!
//! Only non-empty nodes are ever stored; an absent node at height `h` reads
//! back as the memoized `EMPTY[h]` constant. Sibling ordering is strictly
//! "lower index is left".

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use veilcred_common::crypto::{constant_time_eq, deterministic_hash, DetArg};

pub const DEPTH: u32 = 20;
pub const CAPACITY: u64 = 1 << DEPTH;

static EMPTY_SUBTREE_HASHES: Lazy<Vec<String>> = Lazy::new(|| {
    let mut levels = Vec::with_capacity(DEPTH as usize + 1);
    levels.push("0".repeat(64));
    for h in 1..=DEPTH {
        let prev = &levels[(h - 1) as usize];
        levels.push(deterministic_hash(&[DetArg::Str(prev), DetArg::Str(prev)]));
    }
    levels
});

fn empty_at(height: u32) -> &'static str {
    &EMPTY_SUBTREE_HASHES[height as usize]
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmtError {
    #[error("leaf index {index} out of range [0, {capacity})")]
    IndexOutOfRange { index: u64, capacity: u64 },

    #[error("recomputed root does not match imported root")]
    RootMismatch,
}

/// A Merkle inclusion proof: the leaf value, its index, the DEPTH sibling
/// hashes bottom-up, and the root it was generated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InclusionProof {
    pub leaf: String,
    pub index: u64,
    pub siblings: Vec<String>,
    pub root: String,
}

/// Leaves plus the claimed root, the unit exported by [`SparseMerkleTree::export`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtExport {
    pub leaves: Vec<(u64, String)>,
    pub root: String,
}

/// Node storage keyed by `(height, index_at_height)`; height 0 is the leaf
/// row, height `DEPTH` holds a single node: the root.
pub struct SparseMerkleTree {
    nodes: RwLock<HashMap<(u32, u64), String>>,
    root: Mutex<String>,
}

impl Default for SparseMerkleTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseMerkleTree {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            root: Mutex::new(empty_at(DEPTH).to_string()),
        }
    }

    fn check_index(index: u64) -> Result<(), SmtError> {
        if index >= CAPACITY {
            return Err(SmtError::IndexOutOfRange {
                index,
                capacity: CAPACITY,
            });
        }
        Ok(())
    }

    /// Insert `value` (itself a 64-hex leaf hash) at `index`, walking DEPTH
    /// levels to recompute the root.
    pub fn insert(&self, index: u64, value: String) -> Result<String, SmtError> {
        Self::check_index(index)?;
        let mut nodes = self.nodes.write().expect("smt node lock poisoned");

        let mut cur_idx = index;
        let mut cur_hash = value.clone();
        nodes.insert((0, cur_idx), cur_hash.clone());

        for height in 0..DEPTH {
            let sibling_idx = cur_idx ^ 1;
            let sibling_hash = nodes
                .get(&(height, sibling_idx))
                .cloned()
                .unwrap_or_else(|| empty_at(height).to_string());

            let (left, right) = if cur_idx % 2 == 0 {
                (cur_hash.clone(), sibling_hash)
            } else {
                (sibling_hash, cur_hash.clone())
            };
            let parent_hash = deterministic_hash(&[DetArg::Str(&left), DetArg::Str(&right)]);
            let parent_idx = cur_idx >> 1;
            nodes.insert((height + 1, parent_idx), parent_hash.clone());

            cur_idx = parent_idx;
            cur_hash = parent_hash;
        }

        *self.root.lock().expect("smt root lock poisoned") = cur_hash.clone();
        Ok(cur_hash)
    }

    /// Stored leaf at `index`, or the empty-leaf constant if absent.
    pub fn get(&self, index: u64) -> String {
        self.nodes
            .read()
            .expect("smt node lock poisoned")
            .get(&(0, index))
            .cloned()
            .unwrap_or_else(|| empty_at(0).to_string())
    }

    pub fn root(&self) -> String {
        self.root.lock().expect("smt root lock poisoned").clone()
    }

    /// Build an inclusion proof for `index` against the current root.
    pub fn generate_proof(&self, index: u64) -> Result<InclusionProof, SmtError> {
        Self::check_index(index)?;
        let nodes = self.nodes.read().expect("smt node lock poisoned");
        let mut siblings = Vec::with_capacity(DEPTH as usize);
        let mut cur_idx = index;
        for height in 0..DEPTH {
            let sibling_idx = cur_idx ^ 1;
            let sibling = nodes
                .get(&(height, sibling_idx))
                .cloned()
                .unwrap_or_else(|| empty_at(height).to_string());
            siblings.push(sibling);
            cur_idx >>= 1;
        }
        Ok(InclusionProof {
            leaf: self.get(index),
            index,
            siblings,
            root: self.root(),
        })
    }

    /// Reconstruct the root from `proof` and compare it to `proof.root` in
    /// constant time.
    pub fn verify_proof(proof: &InclusionProof) -> bool {
        if proof.siblings.len() != DEPTH as usize {
            return false;
        }
        let mut cur_idx = proof.index;
        let mut cur_hash = proof.leaf.clone();
        for sibling in &proof.siblings {
            let (left, right) = if cur_idx % 2 == 0 {
                (cur_hash.clone(), sibling.clone())
            } else {
                (sibling.clone(), cur_hash.clone())
            };
            cur_hash = deterministic_hash(&[DetArg::Str(&left), DetArg::Str(&right)]);
            cur_idx >>= 1;
        }
        constant_time_eq(cur_hash.as_bytes(), proof.root.as_bytes())
    }

    /// Export the populated leaves plus the current root.
    pub fn export(&self) -> SmtExport {
        let nodes = self.nodes.read().expect("smt node lock poisoned");
        let mut leaves: Vec<(u64, String)> = nodes
            .iter()
            .filter_map(|(&(height, index), hash)| (height == 0).then_some((index, hash.clone())))
            .collect();
        leaves.sort_by_key(|(index, _)| *index);
        SmtExport {
            leaves,
            root: self.root(),
        }
    }

    /// Rebuild a tree from a prior [`export`](Self::export), verifying the
    /// recomputed root matches the imported one.
    pub fn import(export: &SmtExport) -> Result<Self, SmtError> {
        let tree = Self::new();
        for (index, value) in &export.leaves {
            tree.insert(*index, value.clone())?;
        }
        if tree.root() != export.root {
            return Err(SmtError::RootMismatch);
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_generate_and_verify_proof_round_trips() {
        let tree = SparseMerkleTree::new();
        let leaf = veilcred_common::crypto::hash(b"credential-1");
        tree.insert(42, leaf).unwrap();
        let proof = tree.generate_proof(42).unwrap();
        assert_eq!(proof.root, tree.root());
        assert!(SparseMerkleTree::verify_proof(&proof));
    }

    #[test]
    fn forged_proof_fails_verification() {
        let tree = SparseMerkleTree::new();
        let leaf = veilcred_common::crypto::hash(b"credential-1");
        tree.insert(7, leaf).unwrap();
        let mut proof = tree.generate_proof(7).unwrap();
        proof.siblings[0] = veilcred_common::crypto::hash(b"forged");
        assert!(!SparseMerkleTree::verify_proof(&proof));
    }

    #[test]
    fn index_0_and_max_accepted_capacity_rejected() {
        let tree = SparseMerkleTree::new();
        assert!(tree.insert(0, empty_at(0).to_string()).is_ok());
        assert!(tree.insert(CAPACITY - 1, empty_at(0).to_string()).is_ok());
        assert!(matches!(
            tree.insert(CAPACITY, empty_at(0).to_string()),
            Err(SmtError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn get_on_empty_index_returns_empty_leaf() {
        let tree = SparseMerkleTree::new();
        tree.insert(3, veilcred_common::crypto::hash(b"x")).unwrap();
        assert_eq!(tree.get(4), empty_at(0));
    }

    #[test]
    fn export_import_is_a_fixed_point() {
        let tree = SparseMerkleTree::new();
        tree.insert(1, veilcred_common::crypto::hash(b"a")).unwrap();
        tree.insert(999, veilcred_common::crypto::hash(b"b")).unwrap();
        let exported = tree.export();
        let rebuilt = SparseMerkleTree::import(&exported).unwrap();
        assert_eq!(rebuilt.export(), exported);
    }

    #[test]
    fn import_rejects_tampered_root() {
        let tree = SparseMerkleTree::new();
        tree.insert(1, veilcred_common::crypto::hash(b"a")).unwrap();
        let mut exported = tree.export();
        exported.root = "f".repeat(64);
        assert!(matches!(
            SparseMerkleTree::import(&exported),
            Err(SmtError::RootMismatch)
        ));
    }

    #[test]
    fn empty_tree_root_matches_empty_subtree_constant() {
        let tree = SparseMerkleTree::new();
        assert_eq!(tree.root(), empty_at(DEPTH));
    }
}
