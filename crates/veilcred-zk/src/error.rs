//! Error taxonomy for claim-to-circuit mapping and the Groth16 ports.

use thiserror::Error;
use veilcred_common::{CryptoError, ValidationError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZkError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Poseidon hasher or key-material loading failed at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Constraint synthesis rejected a witness/public-input assignment.
    #[error("circuit synthesis failed: {0}")]
    Circuit(String),

    #[error("proof generation failed: {0}")]
    ProofGeneration(String),

    #[error("proof verification failed: {0}")]
    ProofVerification(String),
}
