//! C9 — orchestrates C8's circuit-input mapping with a [`GrothProver`] port,
//! bounding generation time and output size.

use std::sync::Arc;
use std::time::{Duration, Instant};

use veilcred_zk::{
    generate_circuit_inputs, ClaimStatement, GrothProver, PoseidonHasher, Witness,
};
use veilcred_zk::wire::{Proof, ProofMetadata, WIRE_VERSION};

use crate::error::CoreError;
use crate::metrics::{PROOFS_GENERATED, PROOFS_GENERATION_FAILURES};

pub const GENERATION_TIMEOUT_MS: u64 = 30_000;

/// Composes the claim engine and a Groth16 prover behind a timeout and a
/// wire-size cap; holds no credential or revocation state of its own.
pub struct ProofGenerator {
    prover: Arc<dyn GrothProver>,
    hasher: Arc<dyn PoseidonHasher>,
}

impl ProofGenerator {
    pub fn new(prover: Arc<dyn GrothProver>, hasher: Arc<dyn PoseidonHasher>) -> Self {
        Self { prover, hasher }
    }

    /// Generate a wire-format proof for `claim` given the caller's private
    /// `witness`. `now_ms` doubles as the circuit's "current time" and the
    /// proof's `generatedAt` timestamp.
    pub async fn generate(
        &self,
        claim: ClaimStatement,
        witness: Witness,
        now_ms: i64,
    ) -> Result<Proof, CoreError> {
        let result = self.generate_inner(claim, witness, now_ms).await;
        match &result {
            Ok(_) => PROOFS_GENERATED.inc(),
            Err(_) => PROOFS_GENERATION_FAILURES.inc(),
        };
        result
    }

    async fn generate_inner(
        &self,
        claim: ClaimStatement,
        witness: Witness,
        now_ms: i64,
    ) -> Result<Proof, CoreError> {
        claim.validate()?;
        let inputs = generate_circuit_inputs(&claim, &witness, self.hasher.as_ref(), now_ms)?;

        let prover = self.prover.clone();
        let claim_for_task = claim.clone();
        let started = Instant::now();
        let handle =
            tokio::task::spawn_blocking(move || prover.prove(&claim_for_task, &inputs));

        let joined = tokio::time::timeout(Duration::from_millis(GENERATION_TIMEOUT_MS), handle)
            .await
            .map_err(|_| CoreError::timeout("proof_generation", GENERATION_TIMEOUT_MS))?;

        let (proof_data, public_signals) = joined
            .map_err(|e| CoreError::ProofGeneration {
                reason: e.to_string(),
                operational: false,
            })?
            .map_err(CoreError::from)?;

        let generation_time_ms = started.elapsed().as_millis() as i64;
        let proof = Proof {
            proof: proof_data,
            public_signals,
            statement: claim.describe(),
            metadata: ProofMetadata {
                claim_type: claim.circuit_name().to_string(),
                generated_at: now_ms,
                generation_time_ms,
                version: WIRE_VERSION.to_string(),
            },
        };

        let size = proof
            .serialized_size()
            .map_err(|e| CoreError::Cryptographic(e.to_string()))?;
        if size > veilcred_zk::wire::MAX_PROOF_SERIALIZED_BYTES {
            return Err(CoreError::ProofGeneration {
                reason: format!(
                    "serialized proof size {size} exceeds {} bytes",
                    veilcred_zk::wire::MAX_PROOF_SERIALIZED_BYTES
                ),
                operational: true,
            });
        }

        Ok(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veilcred_zk::{InProcessGroth16, LightPoseidonHasher};

    fn generator(seed: u64) -> ProofGenerator {
        let prover = Arc::new(InProcessGroth16::new(seed).unwrap());
        let hasher = Arc::new(LightPoseidonHasher::new().unwrap());
        ProofGenerator::new(prover, hasher)
    }

    #[tokio::test]
    async fn generate_produces_a_proof_under_the_size_cap() {
        let gen = generator(100);
        let claim = ClaimStatement::AgeOver { threshold: 18 };
        let witness = Witness::AgeOver {
            age: 25,
            salt: Some(42),
        };
        let proof = gen.generate(claim, witness, 0).await.unwrap();
        assert!(proof.extract_claim_result());
        assert!(proof.serialized_size().unwrap() <= veilcred_zk::wire::MAX_PROOF_SERIALIZED_BYTES);
    }

    #[tokio::test]
    async fn generate_rejects_out_of_range_claim_parameters() {
        let gen = generator(101);
        let claim = ClaimStatement::ClearanceLevel { required_level: 200 };
        let witness = Witness::ClearanceLevel {
            clearance_level: 5,
            salt: Some(1),
        };
        assert!(gen.generate(claim, witness, 0).await.is_err());
    }

    #[tokio::test]
    async fn generated_statement_matches_claim_description() {
        let gen = generator(102);
        let claim = ClaimStatement::RoleAuthorization {
            role: "admin".to_string(),
        };
        let witness = Witness::RoleAuthorization {
            role: "admin".to_string(),
            salt: Some(7),
        };
        let proof = gen.generate(claim.clone(), witness, 0).await.unwrap();
        assert_eq!(proof.statement, claim.describe());
    }
}
