//! Shared foundation for the veilcred workspace: error types, cryptographic
//! primitives (C1), and input validation (C2).
//!
//! `veilcred-zk` and `veilcred-core` both depend on this crate; it has no
//! dependency on either of them.

pub mod crypto;
pub mod error;
pub mod validate;

pub use error::{CryptoError, ValidationError};
