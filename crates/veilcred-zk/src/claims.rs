//! C8 — the ZK claim engine: mapping a typed claim and its private witness
//! into bounded, field-valid circuit inputs.
//!
//! The four claim kinds are a closed sum type, not a string-keyed dispatch
//! table: `generate_circuit_inputs` exhaustively matches on
//! [`ClaimStatement`] paired with [`Witness`], so the compiler rejects a
//! claim/witness mismatch and a new claim kind cannot be added without
//! updating every match arm here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use veilcred_common::crypto::secure_random;
use veilcred_common::validate::{sanitize_string, validate_field_u64};

use crate::error::ZkError;
use crate::field::djb2;
use crate::poseidon::PoseidonHasher;

const MAX_AGE_THRESHOLD: u8 = 150;
const MAX_CLEARANCE_LEVEL: u8 = 10;
const MAX_STRING_LEN: usize = 100;

/// A closed predicate over private witness data. Each variant carries only
/// its public parameters; the corresponding [`Witness`] variant carries the
/// private data that must satisfy it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ClaimStatement {
    AgeOver { threshold: u8 },
    LicenseValid { license_type: String },
    ClearanceLevel { required_level: u8 },
    RoleAuthorization { role: String },
}

impl ClaimStatement {
    /// Validate the claim's own parameters (independent of any witness).
    pub fn validate(&self) -> Result<(), ZkError> {
        match self {
            ClaimStatement::AgeOver { threshold } => {
                if *threshold > MAX_AGE_THRESHOLD {
                    return Err(ZkError::Validation(veilcred_common::ValidationError::new(
                        format!("age threshold {threshold} exceeds {MAX_AGE_THRESHOLD}"),
                    )));
                }
                Ok(())
            }
            ClaimStatement::LicenseValid { license_type } => {
                sanitize_string(license_type, MAX_STRING_LEN)?;
                if license_type.is_empty() {
                    return Err(ZkError::Validation(veilcred_common::ValidationError::new(
                        "required license type must not be empty",
                    )));
                }
                Ok(())
            }
            ClaimStatement::ClearanceLevel { required_level } => {
                if *required_level > MAX_CLEARANCE_LEVEL {
                    return Err(ZkError::Validation(veilcred_common::ValidationError::new(
                        format!("required clearance level {required_level} exceeds {MAX_CLEARANCE_LEVEL}"),
                    )));
                }
                Ok(())
            }
            ClaimStatement::RoleAuthorization { role } => {
                sanitize_string(role, MAX_STRING_LEN)?;
                if role.is_empty() {
                    return Err(ZkError::Validation(veilcred_common::ValidationError::new(
                        "required role must not be empty",
                    )));
                }
                Ok(())
            }
        }
    }

    /// A human-readable rendering used as `Proof::statement`.
    pub fn describe(&self) -> String {
        match self {
            ClaimStatement::AgeOver { threshold } => format!("age is over {threshold}"),
            ClaimStatement::LicenseValid { license_type } => {
                format!("license of type '{license_type}' is valid")
            }
            ClaimStatement::ClearanceLevel { required_level } => {
                format!("clearance level is at least {required_level}")
            }
            ClaimStatement::RoleAuthorization { role } => {
                format!("role is authorized as '{role}'")
            }
        }
    }

    /// The circuit identifier used to resolve proving/verification artifacts.
    pub fn circuit_name(&self) -> &'static str {
        match self {
            ClaimStatement::AgeOver { .. } => "ageOver",
            ClaimStatement::LicenseValid { .. } => "licenseValid",
            ClaimStatement::ClearanceLevel { .. } => "clearanceLevel",
            ClaimStatement::RoleAuthorization { .. } => "roleAuthorization",
        }
    }
}

/// Private witness data, one variant per claim kind. `salt` is always
/// optional on the wire; [`generate_circuit_inputs`] draws a fresh 32-bit
/// CSPRNG salt when it is absent.
#[derive(Debug, Clone, PartialEq)]
pub enum Witness {
    AgeOver {
        age: u8,
        salt: Option<u32>,
    },
    LicenseValid {
        license_type: String,
        expiration_date_ms: i64,
        salt: Option<u32>,
    },
    ClearanceLevel {
        clearance_level: u8,
        salt: Option<u32>,
    },
    RoleAuthorization {
        role: String,
        salt: Option<u32>,
    },
}

/// The field-valid, decimal-string circuit inputs produced for a claim.
/// Keys are stable per claim kind; values are always decimal integers
/// strictly below `BN254_PRIME`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitInputs(pub BTreeMap<String, String>);

impl CircuitInputs {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    fn insert(&mut self, key: &str, value: impl ToString) {
        self.0.insert(key.to_string(), value.to_string());
    }
}

fn resolve_salt(salt: Option<u32>) -> Result<u32, ZkError> {
    match salt {
        Some(s) => Ok(s),
        None => {
            let bytes = secure_random(4)?;
            Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
    }
}

/// Map `(claim, witness)` to bounded, field-valid circuit inputs, per claim
/// kind. `now_ms` stands in for "current time" so the function stays a
/// total, deterministic mapping over its explicit inputs.
pub fn generate_circuit_inputs(
    claim: &ClaimStatement,
    witness: &Witness,
    hasher: &dyn PoseidonHasher,
    now_ms: i64,
) -> Result<CircuitInputs, ZkError> {
    claim.validate()?;
    let mut out = CircuitInputs::default();

    match (claim, witness) {
        (ClaimStatement::AgeOver { threshold }, Witness::AgeOver { age, salt }) => {
            if *age > MAX_AGE_THRESHOLD {
                return Err(ZkError::Validation(veilcred_common::ValidationError::new(
                    format!("age {age} exceeds {MAX_AGE_THRESHOLD}"),
                )));
            }
            let salt = resolve_salt(*salt)?;
            let age_hash = hasher.hash(&[*age as u64, salt as u64])?;
            validate_field_u64(salt as u64)?;
            let is_over = if *age as u64 >= *threshold as u64 { 1 } else { 0 };
            out.insert("ageHash", age_hash);
            out.insert("threshold", *threshold);
            out.insert("age", *age);
            out.insert("salt", salt);
            out.insert("isOver", is_over);
            Ok(out)
        }
        (
            ClaimStatement::LicenseValid {
                license_type: required_license_type,
            },
            Witness::LicenseValid {
                license_type,
                expiration_date_ms,
                salt,
            },
        ) => {
            if license_type.is_empty() || required_license_type.is_empty() {
                return Err(ZkError::Validation(veilcred_common::ValidationError::new(
                    "license type strings must be non-empty",
                )));
            }
            if *expiration_date_ms <= 0 {
                return Err(ZkError::Validation(veilcred_common::ValidationError::new(
                    "expiration date must be positive",
                )));
            }
            let salt = resolve_salt(*salt)?;
            let license_type_hash = djb2(license_type);
            let license_hash = hasher.hash(&[
                license_type_hash as u64,
                *expiration_date_ms as u64,
                salt as u64,
            ])?;
            let is_valid = if license_type == required_license_type && *expiration_date_ms > now_ms
            {
                1
            } else {
                0
            };
            out.insert("licenseHash", license_hash);
            out.insert("requiredLicenseType", djb2(required_license_type));
            out.insert("licenseType", license_type_hash);
            out.insert("expirationDate", *expiration_date_ms);
            out.insert("currentDate", now_ms);
            out.insert("salt", salt);
            out.insert("isValid", is_valid);
            Ok(out)
        }
        (
            ClaimStatement::ClearanceLevel { required_level },
            Witness::ClearanceLevel {
                clearance_level,
                salt,
            },
        ) => {
            if *clearance_level > MAX_CLEARANCE_LEVEL {
                return Err(ZkError::Validation(veilcred_common::ValidationError::new(
                    format!("clearance level {clearance_level} exceeds {MAX_CLEARANCE_LEVEL}"),
                )));
            }
            let salt = resolve_salt(*salt)?;
            let clearance_hash = hasher.hash(&[*clearance_level as u64, salt as u64])?;
            let has_access = if *clearance_level as u64 >= *required_level as u64 {
                1
            } else {
                0
            };
            out.insert("clearanceHash", clearance_hash);
            out.insert("requiredLevel", *required_level);
            out.insert("clearanceLevel", *clearance_level);
            out.insert("salt", salt);
            out.insert("hasAccess", has_access);
            Ok(out)
        }
        (
            ClaimStatement::RoleAuthorization {
                role: required_role,
            },
            Witness::RoleAuthorization { role, salt },
        ) => {
            if role.is_empty() || required_role.is_empty() {
                return Err(ZkError::Validation(veilcred_common::ValidationError::new(
                    "role strings must be non-empty",
                )));
            }
            let salt = resolve_salt(*salt)?;
            let role_hash_input = djb2(role);
            let role_hash = hasher.hash(&[role_hash_input as u64, salt as u64])?;
            let is_authorized = if role == required_role { 1 } else { 0 };
            out.insert("roleHash", role_hash);
            out.insert("requiredRole", djb2(required_role));
            out.insert("role", role_hash_input);
            out.insert("salt", salt);
            out.insert("isAuthorized", is_authorized);
            Ok(out)
        }
        _ => Err(ZkError::Validation(veilcred_common::ValidationError::new(
            "claim and witness kinds do not match",
        ))),
    }
}
