//! C10 — structural validation, a bounded result cache, and a
//! [`GrothVerifier`] port call behind a timeout.
//!
//! The cache only ever stores `true` results: a cache hit short-circuits a
//! verification that has already succeeded once, but a failing proof is
//! always re-verified (it could be a transient verifier-side fault, and
//! caching a rejection saves nothing an attacker cares about). The cache
//! is an [`lru::LruCache`] used strictly insert-only — this module never
//! calls `.get()` on it — so its internal ordering degenerates to plain
//! FIFO by insertion, matching the "evict oldest" policy below rather than
//! the crate's usual recency-based eviction.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use veilcred_common::crypto::{constant_time_eq, hash};
use veilcred_zk::wire::{Proof, CURVE, MAX_PROOF_SERIALIZED_BYTES, MAX_PUBLIC_SIGNALS, PROTOCOL};
use veilcred_zk::{ClaimStatement, GrothVerifier};

use crate::error::CoreError;
use crate::metrics::{PROOFS_VERIFICATION_CACHE_HITS, PROOFS_VERIFIED};

pub const VERIFICATION_TIMEOUT_MS: u64 = 10_000;
pub const CACHE_CAPACITY: usize = 1000;
const EVICTION_FRACTION: f64 = 0.2;
pub const MAX_BATCH_SIZE: usize = 100;
pub const BATCH_CONCURRENCY: usize = 10;

/// Opaque message attached to structurally malformed proofs. Deliberately
/// unspecific: nothing about the actual failure is leaked to the caller.
const GENERIC_FAILURE_MESSAGE: &str = "Verification failed";

/// The outcome of a verification call, matching what a caller outside this
/// process is allowed to see: `error` is only ever the generic message
/// above, never the structural reason behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub valid: bool,
    pub statement: String,
    pub timestamp: i64,
    pub verification_time_ms: Option<i64>,
    pub cached: Option<bool>,
    pub error: Option<String>,
}

impl VerificationResult {
    fn structural_failure(statement: String, timestamp: i64) -> Self {
        Self {
            valid: false,
            statement,
            timestamp,
            verification_time_ms: None,
            cached: None,
            error: Some(GENERIC_FAILURE_MESSAGE.to_string()),
        }
    }

    fn cache_hit(statement: String, timestamp: i64) -> Self {
        Self {
            valid: true,
            statement,
            timestamp,
            verification_time_ms: None,
            cached: Some(true),
            error: None,
        }
    }

    fn checked(statement: String, timestamp: i64, valid: bool, elapsed_ms: i64) -> Self {
        Self {
            valid,
            statement,
            timestamp,
            verification_time_ms: Some(elapsed_ms),
            cached: Some(false),
            error: None,
        }
    }
}

fn cache_key(proof: &Proof) -> Result<String, CoreError> {
    let bytes = serde_json::to_vec(proof).map_err(|e| CoreError::Cryptographic(e.to_string()))?;
    Ok(hash(&bytes))
}

/// Protocol/curve tag, public-signal bounds and shape, and the 10 KB wire
/// cap. A `false` return means "reject with the opaque generic message",
/// never a propagated error.
fn validate_structure(proof: &Proof) -> bool {
    if proof.proof.protocol != PROTOCOL || proof.proof.curve != CURVE {
        return false;
    }
    if proof.public_signals.is_empty() || proof.public_signals.len() > MAX_PUBLIC_SIGNALS {
        return false;
    }
    if !proof
        .public_signals
        .iter()
        .all(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
    {
        return false;
    }
    matches!(proof.serialized_size(), Ok(size) if size <= MAX_PROOF_SERIALIZED_BYTES)
}

/// Evict the oldest 20% of entries once the cache is at capacity.
fn evict_if_full(cache: &mut LruCache<String, bool>) {
    if cache.len() >= CACHE_CAPACITY {
        let evict_count = ((CACHE_CAPACITY as f64) * EVICTION_FRACTION) as usize;
        for _ in 0..evict_count.max(1) {
            if cache.pop_lru().is_none() {
                break;
            }
        }
    }
}

/// Run the bounded, timed verify call shared by [`ProofVerifier::verify`]
/// and its batch path. Takes owned/Arc'd pieces so it is spawn-safe.
///
/// Only a prover/verifier-side fault (`ProofVerificationError`) or a
/// timeout propagates as `Err`; a structurally malformed proof becomes an
/// `Ok(VerificationResult)` with `valid: false` instead.
async fn verify_with(
    verifier: Arc<dyn GrothVerifier>,
    cache: Arc<std::sync::Mutex<LruCache<String, bool>>>,
    circuit_name: String,
    proof: Proof,
    now_ms: i64,
) -> Result<VerificationResult, CoreError> {
    if !validate_structure(&proof) {
        return Ok(VerificationResult::structural_failure(
            proof.statement.clone(),
            now_ms,
        ));
    }
    let key = cache_key(&proof)?;

    if let Some(&cached) = cache.lock().expect("proof cache lock poisoned").peek(&key) {
        if cached {
            PROOFS_VERIFICATION_CACHE_HITS.inc();
            return Ok(VerificationResult::cache_hit(proof.statement.clone(), now_ms));
        }
    }

    let proof_data = proof.proof.clone();
    let signals = proof.public_signals.clone();
    let started = Instant::now();
    let handle = tokio::task::spawn_blocking(move || verifier.verify(&circuit_name, &proof_data, &signals));

    let joined = tokio::time::timeout(Duration::from_millis(VERIFICATION_TIMEOUT_MS), handle)
        .await
        .map_err(|_| CoreError::timeout("proof_verification", VERIFICATION_TIMEOUT_MS))?;

    let valid = joined
        .map_err(|e| CoreError::ProofVerification {
            reason: e.to_string(),
            operational: false,
        })?
        .map_err(CoreError::from)?;
    let elapsed_ms = started.elapsed().as_millis() as i64;

    PROOFS_VERIFIED.inc();
    if valid {
        let mut locked = cache.lock().expect("proof cache lock poisoned");
        evict_if_full(&mut locked);
        locked.put(key, true);
    }

    Ok(VerificationResult::checked(
        proof.statement.clone(),
        now_ms,
        valid,
        elapsed_ms,
    ))
}

pub struct ProofVerifier {
    verifier: Arc<dyn GrothVerifier>,
    cache: Arc<std::sync::Mutex<LruCache<String, bool>>>,
}

impl ProofVerifier {
    pub fn new(verifier: Arc<dyn GrothVerifier>) -> Self {
        Self {
            verifier,
            cache: Arc::new(std::sync::Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).expect("cache capacity is nonzero"),
            ))),
        }
    }

    pub async fn verify(
        &self,
        circuit_name: &str,
        proof: &Proof,
        now_ms: i64,
    ) -> Result<VerificationResult, CoreError> {
        verify_with(
            self.verifier.clone(),
            self.cache.clone(),
            circuit_name.to_string(),
            proof.clone(),
            now_ms,
        )
        .await
    }

    /// Runs the ordinary verification, then — only when it came back valid —
    /// additionally requires the proof's statement to match `claim`'s
    /// rendering in constant time. A valid proof whose statement was swapped
    /// for a different claim comes back `valid: false`, not an error.
    pub async fn verify_with_statement(
        &self,
        circuit_name: &str,
        claim: &ClaimStatement,
        proof: &Proof,
        now_ms: i64,
    ) -> Result<VerificationResult, CoreError> {
        let mut result = self.verify(circuit_name, proof, now_ms).await?;
        if result.valid && !constant_time_eq(proof.statement.as_bytes(), claim.describe().as_bytes()) {
            result.valid = false;
        }
        Ok(result)
    }

    /// Verify up to [`MAX_BATCH_SIZE`] `(circuitName, proof)` pairs with at
    /// most [`BATCH_CONCURRENCY`] verifications in flight at once.
    pub async fn batch_verify(
        &self,
        items: Vec<(String, Proof)>,
        now_ms: i64,
    ) -> Result<Vec<Result<VerificationResult, CoreError>>, CoreError> {
        if items.len() > MAX_BATCH_SIZE {
            return Err(CoreError::Validation(veilcred_common::ValidationError::new(
                format!("batch size {} exceeds maximum {MAX_BATCH_SIZE}", items.len()),
            )));
        }

        let semaphore = Arc::new(Semaphore::new(BATCH_CONCURRENCY));
        let mut joins = JoinSet::new();
        for (index, (circuit_name, proof)) in items.into_iter().enumerate() {
            let verifier = self.verifier.clone();
            let cache = self.cache.clone();
            let permit = semaphore.clone();
            joins.spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore not closed");
                (
                    index,
                    verify_with(verifier, cache, circuit_name, proof, now_ms).await,
                )
            });
        }

        let mut results: Vec<Option<Result<VerificationResult, CoreError>>> =
            (0..joins.len()).map(|_| None).collect();
        while let Some(joined) = joins.join_next().await {
            let (index, result) = joined.map_err(|e| CoreError::ProofVerification {
                reason: e.to_string(),
                operational: false,
            })?;
            results[index] = Some(result);
        }

        Ok(results.into_iter().map(|r| r.expect("every index populated")).collect())
    }

    pub fn extract_claim_result(proof: &Proof) -> bool {
        proof.extract_claim_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veilcred_zk::{generate_circuit_inputs, GrothProver, InProcessGroth16, LightPoseidonHasher, Witness};

    const NOW: i64 = 1_700_000_000_000;

    fn verifier(seed: u64) -> (ProofVerifier, InProcessGroth16) {
        let backend = InProcessGroth16::new(seed).unwrap();
        let shared = InProcessGroth16::new(seed).unwrap();
        (ProofVerifier::new(Arc::new(shared)), backend)
    }

    fn sample_proof(backend: &InProcessGroth16, age: u8, threshold: u8) -> (ClaimStatement, Proof) {
        use veilcred_zk::wire::{ProofMetadata, WIRE_VERSION};
        let claim = ClaimStatement::AgeOver { threshold };
        let witness = Witness::AgeOver { age, salt: Some(1) };
        let hasher = LightPoseidonHasher::new().unwrap();
        let inputs = generate_circuit_inputs(&claim, &witness, &hasher, 0).unwrap();
        let (proof_data, public_signals) = backend.prove(&claim, &inputs).unwrap();
        let proof = Proof {
            proof: proof_data,
            public_signals,
            statement: claim.describe(),
            metadata: ProofMetadata {
                claim_type: claim.circuit_name().to_string(),
                generated_at: 0,
                generation_time_ms: 1,
                version: WIRE_VERSION.to_string(),
            },
        };
        (claim, proof)
    }

    #[tokio::test]
    async fn valid_proof_verifies_and_is_cached() {
        let (verifier, backend) = verifier(10);
        let (_, proof) = sample_proof(&backend, 25, 18);
        let first = verifier.verify("ageOver", &proof, NOW).await.unwrap();
        assert!(first.valid);
        assert_eq!(first.cached, Some(false));
        let second = verifier.verify("ageOver", &proof, NOW).await.unwrap();
        assert!(second.valid);
        assert_eq!(second.cached, Some(true));
    }

    #[tokio::test]
    async fn verify_with_statement_rejects_mismatched_claim() {
        let (verifier, backend) = verifier(11);
        let (_, proof) = sample_proof(&backend, 25, 18);
        let wrong_claim = ClaimStatement::AgeOver { threshold: 21 };
        let result = verifier
            .verify_with_statement("ageOver", &wrong_claim, &proof, NOW)
            .await
            .unwrap();
        assert!(!result.valid);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn malformed_proof_returns_generic_failure_without_propagating() {
        let (verifier, backend) = verifier(14);
        let (_, mut proof) = sample_proof(&backend, 25, 18);
        proof.proof.protocol = "groth17".to_string();
        let result = verifier.verify("ageOver", &proof, NOW).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Verification failed"));
    }

    #[tokio::test]
    async fn batch_verify_respects_per_item_results() {
        let (verifier, backend) = verifier(12);
        let (_, over) = sample_proof(&backend, 25, 18);
        let (_, under) = sample_proof(&backend, 10, 18);
        let results = verifier
            .batch_verify(
                vec![
                    ("ageOver".to_string(), over.clone()),
                    ("ageOver".to_string(), under.clone()),
                ],
                NOW,
            )
            .await
            .unwrap();
        assert!(results[0].as_ref().unwrap().valid);
        assert!(results[1].as_ref().unwrap().valid);
        assert!(over.extract_claim_result());
        assert!(!under.extract_claim_result());
    }

    #[tokio::test]
    async fn batch_verify_rejects_oversized_batches() {
        let (verifier, backend) = verifier(13);
        let (_, proof) = sample_proof(&backend, 25, 18);
        let items: Vec<(String, Proof)> = (0..(MAX_BATCH_SIZE + 1))
            .map(|_| ("ageOver".to_string(), proof.clone()))
            .collect();
        assert!(verifier.batch_verify(items, NOW).await.is_err());
    }
}
