//! Shared error taxonomy for the veilcred workspace.
//!
//! Every fallible operation in `veilcred-common` returns one of the variants
//! below rather than mixing panics, `Option`, and ad-hoc error strings.

use thiserror::Error;

/// A single caller-facing validation failure. Every validator function in
/// [`crate::validate`] returns this shape on rejection, never a bespoke
/// error per rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation failed: {reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors raised by the C1 cryptographic primitives.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CryptoError {
    /// `secure_random` measured below the 7.5 bits/byte Shannon-entropy floor.
    #[error("entropy shortfall: measured {measured:.3} bits/byte, required {required:.3}")]
    Entropy { measured: f64, required: f64 },

    /// A length or range precondition on a crypto primitive was violated.
    #[error("invalid crypto input: {0}")]
    InvalidInput(String),

    /// `proof_of_work` exhausted its iteration budget without finding a nonce.
    #[error("proof of work exceeded {0} iterations without success")]
    WorkExhausted(u64),

    /// HKDF expand was asked for more output than RFC 5869 allows.
    #[error("hkdf output length {requested} exceeds maximum {max}")]
    HkdfLengthExceeded { requested: usize, max: usize },
}
