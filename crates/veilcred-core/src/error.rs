//! The behavioral error taxonomy §7 describes, shared across C4-C10.
//!
//! Each variant names a *behavioral kind*, not an implementation detail:
//! callers match on the kind to decide whether to surface a message
//! verbatim, redact it, or treat it as operational vs. non-operational.

use thiserror::Error;
use veilcred_common::ValidationError;
use veilcred_zk::ZkError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Caller bug: surfaced verbatim.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Duplicate id or key; the conflicting id is sanitized before display.
    #[error("conflict: {resource} '{existing_id}' already exists")]
    Conflict { resource: String, existing_id: String },

    /// Missing resource, surfaced with kind and id.
    #[error("not found: {resource} '{id}'")]
    NotFound { resource: String, id: String },

    #[error("revocation error: {0}")]
    Revocation(#[from] RevocationErrorKind),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("proof generation failed: {reason}")]
    ProofGeneration { reason: String, operational: bool },

    #[error("proof verification failed: {reason}")]
    ProofVerification { reason: String, operational: bool },

    #[error("operation '{operation}' exceeded its {limit_ms} ms deadline")]
    Timeout { operation: String, limit_ms: u64 },

    /// Missing artifact or hash-engine init failure; non-operational.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Entropy shortfall, hash failure, signing failure; non-operational.
    #[error("cryptographic error: {0}")]
    Cryptographic(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RevocationErrorKind {
    #[error("credential '{0}' is already revoked")]
    AlreadyRevoked(String),

    #[error("invalid credential id format: {0}")]
    InvalidId(String),
}

impl From<ZkError> for CoreError {
    fn from(e: ZkError) -> Self {
        match e {
            ZkError::Validation(v) => CoreError::Validation(v),
            ZkError::Crypto(c) => CoreError::Cryptographic(c.to_string()),
            ZkError::Configuration(reason) => CoreError::Configuration(reason),
            ZkError::Circuit(reason) => CoreError::ProofGeneration {
                reason,
                operational: false,
            },
            ZkError::ProofGeneration(reason) => CoreError::ProofGeneration {
                reason,
                operational: true,
            },
            ZkError::ProofVerification(reason) => CoreError::ProofVerification {
                reason,
                operational: true,
            },
        }
    }
}

impl CoreError {
    pub fn conflict(resource: impl Into<String>, existing_id: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.into(),
            existing_id: existing_id.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn already_revoked(id: impl Into<String>) -> Self {
        Self::Revocation(RevocationErrorKind::AlreadyRevoked(id.into()))
    }

    pub fn timeout(operation: impl Into<String>, limit_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            limit_ms,
        }
    }
}
