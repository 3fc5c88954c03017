//! Poseidon hasher port (C8 initialization) and its default BN254-parameter
//! backend.
//!
//! The hasher is loaded once and is immutable thereafter, per the
//! single-context-not-global-state guidance: callers construct one
//! [`LightPoseidonHasher`] at startup and pass it into [`crate::claims`]
//! functions rather than reaching for a process-wide singleton.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher as LightPoseidonTrait};

use crate::error::ZkError;

/// Binding for a Poseidon hash over up to a handful of field elements,
/// binary-compatible with the standard BN254 Poseidon parameterization.
pub trait PoseidonHasher: Send + Sync {
    /// Hash `inputs` (each a u64 fitting comfortably below the field
    /// modulus) and return the digest as a decimal-string field element.
    fn hash(&self, inputs: &[u64]) -> Result<String, ZkError>;
}

/// Default adapter over the `light-poseidon` crate's circom-parameterized
/// instance.
pub struct LightPoseidonHasher;

impl LightPoseidonHasher {
    /// Construct the hasher. Fallible because a future parameter source
    /// (e.g. loaded constants) could fail; today this never errors.
    pub fn new() -> Result<Self, ZkError> {
        Ok(Self)
    }
}

impl Default for LightPoseidonHasher {
    fn default() -> Self {
        Self::new().expect("LightPoseidonHasher::new is infallible today")
    }
}

impl PoseidonHasher for LightPoseidonHasher {
    fn hash(&self, inputs: &[u64]) -> Result<String, ZkError> {
        if inputs.is_empty() || inputs.len() > 12 {
            return Err(ZkError::Configuration(format!(
                "poseidon input arity {} out of supported range [1, 12]",
                inputs.len()
            )));
        }
        let mut poseidon = Poseidon::<Fr>::new_circom(inputs.len())
            .map_err(|e| ZkError::Configuration(format!("poseidon init failed: {e}")))?;
        let field_inputs: Vec<Fr> = inputs.iter().map(|&v| Fr::from(v)).collect();
        let digest = poseidon
            .hash(&field_inputs)
            .map_err(|e| ZkError::Configuration(format!("poseidon hash failed: {e}")))?;
        Ok(biguint_to_decimal(digest))
    }
}

fn biguint_to_decimal(f: Fr) -> String {
    let repr = f.into_bigint();
    let bytes = repr.to_bytes_be();
    let value = num_bigint::BigUint::from_bytes_be(&bytes);
    value.to_string()
}
