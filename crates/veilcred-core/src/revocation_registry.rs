//! C7 — revocation accumulator over the sparse Merkle tree (C3).
//!
//! Each credential id maps to a fixed leaf index via `deterministic_hash`
//! truncated mod `CAPACITY`; revoking writes a non-empty leaf there so an
//! inclusion proof against the current root is a revocation proof.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use veilcred_common::crypto::{deterministic_hash, DetArg};
use veilcred_common::validate::validate_credential_id;

use crate::error::CoreError;
use crate::metrics::CREDENTIALS_REVOKED;
use crate::smt::{SparseMerkleTree, CAPACITY};

const MAX_LIST_LIMIT: usize = 1000;
const MAX_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevocationRecord {
    pub credential_id: String,
    pub index: u64,
    pub reason: String,
    pub revoked_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevocationStatistics {
    pub total_revoked: usize,
    pub revoked_last_24h: usize,
    pub revocations_by_reason: HashMap<String, usize>,
    pub root: String,
    pub version: u64,
}

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// The `{revoked, proof}` shape `generate_proof` returns: `proof` is empty
/// for an unknown id rather than an error, `[root, …siblings]` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevocationProof {
    pub revoked: bool,
    pub proof: Vec<String>,
}

/// Deterministic leaf index for a credential id: the low 52 bits of its
/// `deterministic_hash`, taken mod [`CAPACITY`].
fn leaf_index(credential_id: &str) -> u64 {
    let digest = deterministic_hash(&[DetArg::Str(credential_id)]);
    let prefix = &digest[0..16];
    let value = u64::from_str_radix(prefix, 16).unwrap_or(0);
    value % CAPACITY
}

fn leaf_value(credential_id: &str, revoked_at: i64) -> String {
    deterministic_hash(&[
        DetArg::Str("revoked"),
        DetArg::Str(credential_id),
        DetArg::Int(revoked_at as u64),
    ])
}

/// Revocation state: the accumulator tree, a `credentialId -> record`
/// index for O(1) lookups, and a monotonic version bumped on every write.
pub struct RevocationRegistry {
    tree: SparseMerkleTree,
    records: DashMap<String, RevocationRecord>,
    version: AtomicU64,
}

impl Default for RevocationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RevocationRegistry {
    pub fn new() -> Self {
        Self {
            tree: SparseMerkleTree::new(),
            records: DashMap::new(),
            version: AtomicU64::new(0),
        }
    }

    pub fn revoke(
        &self,
        credential_id: &str,
        reason: &str,
        now_ms: i64,
    ) -> Result<RevocationRecord, CoreError> {
        validate_credential_id(credential_id)?;
        if self.records.contains_key(credential_id) {
            return Err(CoreError::already_revoked(credential_id));
        }
        let index = leaf_index(credential_id);
        let leaf = leaf_value(credential_id, now_ms);
        self.tree
            .insert(index, leaf)
            .map_err(|e| CoreError::Cryptographic(e.to_string()))?;

        let record = RevocationRecord {
            credential_id: credential_id.to_string(),
            index,
            reason: reason.to_string(),
            revoked_at: now_ms,
        };
        self.records
            .insert(credential_id.to_string(), record.clone());
        self.version.fetch_add(1, Ordering::SeqCst);
        CREDENTIALS_REVOKED.inc();
        Ok(record)
    }

    /// Revoke each id independently; a failure on one does not prevent the
    /// others from being recorded.
    pub fn batch_revoke(
        &self,
        credential_ids: &[String],
        reason: &str,
        now_ms: i64,
    ) -> Result<Vec<Result<RevocationRecord, CoreError>>, CoreError> {
        if credential_ids.len() > MAX_BATCH_SIZE {
            return Err(CoreError::Validation(veilcred_common::ValidationError::new(
                format!(
                    "batch size {} exceeds maximum {MAX_BATCH_SIZE}",
                    credential_ids.len()
                ),
            )));
        }
        Ok(credential_ids
            .iter()
            .map(|id| self.revoke(id, reason, now_ms))
            .collect())
    }

    pub fn is_revoked(&self, credential_id: &str) -> bool {
        self.records.contains_key(credential_id)
    }

    pub fn get(&self, credential_id: &str) -> Option<RevocationRecord> {
        self.records.get(credential_id).map(|e| e.value().clone())
    }

    pub fn list(&self, limit: usize, offset: usize) -> Result<Vec<RevocationRecord>, CoreError> {
        if limit > MAX_LIST_LIMIT {
            return Err(CoreError::Validation(veilcred_common::ValidationError::new(
                format!("list limit {limit} exceeds {MAX_LIST_LIMIT}"),
            )));
        }
        let mut all: Vec<RevocationRecord> =
            self.records.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| {
            a.revoked_at
                .cmp(&b.revoked_at)
                .then(a.credential_id.cmp(&b.credential_id))
        });
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    /// `{revoked: false, proof: []}` for an unknown id; otherwise
    /// `{revoked: true, proof: [root, …siblings]}` against the current tree.
    pub fn generate_proof(&self, credential_id: &str) -> Result<RevocationProof, CoreError> {
        validate_credential_id(credential_id)?;
        if !self.is_revoked(credential_id) {
            return Ok(RevocationProof {
                revoked: false,
                proof: Vec::new(),
            });
        }
        let index = leaf_index(credential_id);
        let inclusion = self
            .tree
            .generate_proof(index)
            .map_err(|e| CoreError::Cryptographic(e.to_string()))?;
        let mut proof = Vec::with_capacity(1 + inclusion.siblings.len());
        proof.push(inclusion.root);
        proof.extend(inclusion.siblings);
        Ok(RevocationProof {
            revoked: true,
            proof,
        })
    }

    pub fn batch_check(&self, credential_ids: &[String]) -> Vec<bool> {
        credential_ids.iter().map(|id| self.is_revoked(id)).collect()
    }

    pub fn in_range(&self, start_ms: i64, end_ms: i64) -> Vec<RevocationRecord> {
        let mut matches: Vec<RevocationRecord> = self
            .records
            .iter()
            .filter(|e| e.value().revoked_at >= start_ms && e.value().revoked_at <= end_ms)
            .map(|e| e.value().clone())
            .collect();
        matches.sort_by(|a, b| a.revoked_at.cmp(&b.revoked_at));
        matches
    }

    pub fn statistics(&self, now_ms: i64) -> RevocationStatistics {
        let mut revocations_by_reason: HashMap<String, usize> = HashMap::new();
        let mut revoked_last_24h = 0usize;
        for entry in self.records.iter() {
            *revocations_by_reason
                .entry(entry.value().reason.clone())
                .or_insert(0) += 1;
            if now_ms - entry.value().revoked_at <= DAY_MS {
                revoked_last_24h += 1;
            }
        }
        RevocationStatistics {
            total_revoked: self.records.len(),
            revoked_last_24h,
            revocations_by_reason,
            root: self.tree.root(),
            version: self.version.load(Ordering::SeqCst),
        }
    }

    pub fn root(&self) -> String {
        self.tree.root()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Administrative reversal: removes the `credentialId -> record` entry
    /// and bumps `version`. The SMT leaf is *not* cleared — the credential
    /// id no longer reads as revoked through `records`, but its leaf value
    /// remains in the tree and the root is unaffected by this call.
    pub fn restore(&mut self, credential_id: &str) -> Result<(), CoreError> {
        validate_credential_id(credential_id)?;
        self.records
            .remove(credential_id)
            .ok_or_else(|| CoreError::not_found("revocation", credential_id))?;
        self.version.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(n: u8) -> String {
        format!("cred_{}", hex::encode([n; 16]))
    }

    #[test]
    fn revoke_then_is_revoked_and_proof_matches_current_root() {
        let registry = RevocationRegistry::new();
        let id = cred(1);
        registry.revoke(&id, "compromised", 1_700_000_000_000).unwrap();
        assert!(registry.is_revoked(&id));
        let proof = registry.generate_proof(&id).unwrap();
        assert!(proof.revoked);
        assert_eq!(proof.proof.len(), 1 + crate::smt::DEPTH as usize);
        assert_eq!(proof.proof[0], registry.root());
    }

    #[test]
    fn generate_proof_on_unknown_id_returns_empty_proof() {
        let registry = RevocationRegistry::new();
        let proof = registry.generate_proof(&cred(99)).unwrap();
        assert!(!proof.revoked);
        assert!(proof.proof.is_empty());
    }

    #[test]
    fn double_revoke_is_rejected() {
        let registry = RevocationRegistry::new();
        let id = cred(2);
        registry.revoke(&id, "r1", 1_700_000_000_000).unwrap();
        let second = registry.revoke(&id, "r2", 1_700_000_000_001);
        assert!(matches!(second, Err(CoreError::Revocation(_))));
    }

    #[test]
    fn batch_check_reports_per_id_status() {
        let registry = RevocationRegistry::new();
        let revoked = cred(3);
        let not_revoked = cred(4);
        registry.revoke(&revoked, "r", 1_700_000_000_000).unwrap();
        let results = registry.batch_check(&[revoked.clone(), not_revoked.clone()]);
        assert_eq!(results, vec![true, false]);
    }

    #[test]
    fn version_increments_on_every_successful_revoke() {
        let registry = RevocationRegistry::new();
        assert_eq!(registry.version(), 0);
        registry.revoke(&cred(5), "r", 1_700_000_000_000).unwrap();
        assert_eq!(registry.version(), 1);
        registry.revoke(&cred(6), "r", 1_700_000_000_000).unwrap();
        assert_eq!(registry.version(), 2);
    }

    #[test]
    fn in_range_filters_by_revoked_at() {
        let registry = RevocationRegistry::new();
        registry.revoke(&cred(7), "r", 1_000).unwrap();
        registry.revoke(&cred(8), "r", 2_000).unwrap();
        registry.revoke(&cred(9), "r", 3_000).unwrap();
        let window = registry.in_range(1_500, 2_500);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].revoked_at, 2_000);
    }

    #[test]
    fn statistics_reflect_revocation_count_root_and_reason_breakdown() {
        let registry = RevocationRegistry::new();
        registry.revoke(&cred(10), "expired", 1_700_000_000_000).unwrap();
        registry.revoke(&cred(11), "expired", 1_700_000_000_001).unwrap();
        registry.revoke(&cred(12), "compromised", 1_700_000_000_002).unwrap();
        let stats = registry.statistics(1_700_000_000_002);
        assert_eq!(stats.total_revoked, 3);
        assert_eq!(stats.root, registry.root());
        assert_eq!(stats.revocations_by_reason.get("expired"), Some(&2));
        assert_eq!(stats.revocations_by_reason.get("compromised"), Some(&1));
        assert_eq!(stats.revoked_last_24h, 3);
    }

    #[test]
    fn statistics_24h_window_excludes_older_revocations() {
        let registry = RevocationRegistry::new();
        registry.revoke(&cred(13), "r", 0).unwrap();
        registry.revoke(&cred(14), "r", 1_700_000_000_000).unwrap();
        let stats = registry.statistics(1_700_000_000_000);
        assert_eq!(stats.total_revoked, 2);
        assert_eq!(stats.revoked_last_24h, 1);
    }

    #[test]
    fn restore_removes_record_but_leaves_leaf_and_bumps_version() {
        let mut registry = RevocationRegistry::new();
        let id = cred(11);
        registry.revoke(&id, "r", 1_700_000_000_000).unwrap();
        let root_before = registry.root();
        let version_before = registry.version();

        registry.restore(&id).unwrap();

        assert!(!registry.is_revoked(&id));
        assert_eq!(registry.root(), root_before);
        assert_eq!(registry.version(), version_before + 1);
    }

    #[test]
    fn restore_on_unknown_id_errors() {
        let mut registry = RevocationRegistry::new();
        assert!(registry.restore(&cred(42)).is_err());
    }
}
