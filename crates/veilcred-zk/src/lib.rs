//! Claim-to-circuit mapping (C8) and the Groth16 proving/verification ports
//! (the external-collaborator side of C9/C10).
//!
//! This crate has no notion of credentials, revocation, or audit logging —
//! it only knows how to turn a claim and a witness into field-valid circuit
//! inputs, and how to drive a Groth16 backend over them. `veilcred-core`
//! composes it with the credential and revocation state.

pub mod circom;
pub mod circuits;
pub mod claims;
pub mod error;
pub mod field;
pub mod groth;
pub mod poseidon;
pub mod wire;

pub use claims::{generate_circuit_inputs, CircuitInputs, ClaimStatement, Witness};
pub use error::ZkError;
pub use groth::{CircuitArtifactPaths, GrothProver, GrothVerifier, InProcessGroth16};
pub use poseidon::{LightPoseidonHasher, PoseidonHasher};
pub use wire::{Proof, ProofData, ProofMetadata};
