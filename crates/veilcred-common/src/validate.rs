//! C2 — input validator: a pure module of total functions over payloads.
//!
//! Every rule here is normative per the attribute-verification data model.
//! All functions return `Result<(), ValidationError>` or a parsed value
//! wrapped the same way; none of them panic on bad input.

use crate::error::ValidationError;
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use std::str::FromStr;

/// BN254 scalar field modulus.
pub const BN254_PRIME_DECIMAL: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

static BN254_PRIME: Lazy<BigUint> =
    Lazy::new(|| BigUint::from_str(BN254_PRIME_DECIMAL).expect("BN254 prime parses"));

const MAX_ATTRIBUTE_VALUE_BYTES: usize = 1024;
const MIN_ATTRIBUTES: usize = 1;
const MAX_ATTRIBUTES: usize = 100;
const TEN_YEARS_MS: i64 = 10 * 365 * 24 * 60 * 60 * 1000;
const FIVE_MINUTES_MS: i64 = 5 * 60 * 1000;

fn err<S: Into<String>>(reason: S) -> ValidationError {
    ValidationError::new(reason)
}

/// Validate a hex-encoded public key: optional `0x` prefix, 64-130 hex
/// characters.
pub fn validate_public_key(pk: &str) -> Result<(), ValidationError> {
    let body = pk.strip_prefix("0x").unwrap_or(pk);
    if !(64..=130).contains(&body.len()) {
        return Err(err(format!(
            "public key must be 64-130 hex chars, got {}",
            body.len()
        )));
    }
    if !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(err("public key must be hexadecimal"));
    }
    Ok(())
}

fn validate_id(id: &str, prefix: &str, expected_hex_len: usize) -> Result<(), ValidationError> {
    let rest = id
        .strip_prefix(prefix)
        .ok_or_else(|| err(format!("id must start with '{prefix}'")))?;
    if rest.len() != expected_hex_len {
        return Err(err(format!(
            "id hex suffix must be {expected_hex_len} chars, got {}",
            rest.len()
        )));
    }
    if !rest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
        return Err(err("id hex suffix must be lowercase hex"));
    }
    Ok(())
}

/// `^id_[0-9a-f]{32}$`
pub fn validate_identity_id(id: &str) -> Result<(), ValidationError> {
    validate_id(id, "id_", 32)
}

/// `^cred_[0-9a-f]{32}$`
pub fn validate_credential_id(id: &str) -> Result<(), ValidationError> {
    validate_id(id, "cred_", 32)
}

/// `name: [A-Za-z0-9_]{1,64}`.
pub fn validate_attribute_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > 64 {
        return Err(err(format!(
            "attribute name length must be 1-64, got {}",
            name.len()
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(err("attribute name must match [A-Za-z0-9_]+"));
    }
    Ok(())
}

/// Tagged attribute value. Serialization canonicalizes to JSON with a fixed
/// type tag so `String("1")` and `Number(1)` never collide on the wire.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl AttributeValue {
    /// Serialized byte size, used to enforce the 1024-byte cap.
    pub fn serialized_size(&self) -> Result<usize, ValidationError> {
        serde_json::to_vec(self)
            .map(|b| b.len())
            .map_err(|e| err(format!("attribute value not serializable: {e}")))
    }
}

/// A single immutable, timestamped attribute.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
    pub timestamp_ms: i64,
}

/// Validate one attribute: name format, value size, and timestamp window
/// `[now - 10y, now + 5min]`.
pub fn validate_attribute(attr: &Attribute, now_ms: i64) -> Result<(), ValidationError> {
    validate_attribute_name(&attr.name)?;
    let size = attr.value.serialized_size()?;
    if size > MAX_ATTRIBUTE_VALUE_BYTES {
        return Err(err(format!(
            "attribute value serialized size {size} exceeds {MAX_ATTRIBUTE_VALUE_BYTES} bytes"
        )));
    }
    let earliest = now_ms - TEN_YEARS_MS;
    let latest = now_ms + FIVE_MINUTES_MS;
    if attr.timestamp_ms < earliest || attr.timestamp_ms > latest {
        return Err(err(format!(
            "attribute timestamp {} outside window [{earliest}, {latest}]",
            attr.timestamp_ms
        )));
    }
    Ok(())
}

/// Validate a full attribute list: `1..=100` entries, unique names, each
/// attribute individually valid.
pub fn validate_attribute_list(attrs: &[Attribute], now_ms: i64) -> Result<(), ValidationError> {
    if attrs.len() < MIN_ATTRIBUTES || attrs.len() > MAX_ATTRIBUTES {
        return Err(err(format!(
            "attribute count must be {MIN_ATTRIBUTES}-{MAX_ATTRIBUTES}, got {}",
            attrs.len()
        )));
    }
    let mut seen = std::collections::HashSet::with_capacity(attrs.len());
    for attr in attrs {
        validate_attribute(attr, now_ms)?;
        if !seen.insert(attr.name.as_str()) {
            return Err(err(format!("duplicate attribute name '{}'", attr.name)));
        }
    }
    Ok(())
}

/// Validate an optional expiration timestamp: strictly greater than `now`
/// and no more than 10 years out.
pub fn validate_expiration(expires_at_ms: Option<i64>, now_ms: i64) -> Result<(), ValidationError> {
    match expires_at_ms {
        None => Ok(()),
        Some(exp) => {
            if exp <= now_ms {
                return Err(err("expiration must be strictly after now"));
            }
            if exp > now_ms + TEN_YEARS_MS {
                return Err(err("expiration must be at most 10 years from now"));
            }
            Ok(())
        }
    }
}

/// Validate that a decimal-string circuit input is finite, non-negative,
/// and strictly less than `BN254_PRIME`.
pub fn validate_field_element(decimal: &str) -> Result<(), ValidationError> {
    if decimal.is_empty() || !decimal.chars().all(|c| c.is_ascii_digit()) {
        return Err(err(format!(
            "field element '{decimal}' must be a non-negative decimal integer"
        )));
    }
    let value = BigUint::from_str(decimal)
        .map_err(|e| err(format!("field element '{decimal}' failed to parse: {e}")))?;
    if value >= *BN254_PRIME {
        return Err(err(format!(
            "field element '{decimal}' must be < BN254_PRIME"
        )));
    }
    Ok(())
}

/// Validate a u64 circuit input against the same field bound.
pub fn validate_field_u64(value: u64) -> Result<(), ValidationError> {
    validate_field_element(&value.to_string())
}

/// Strip NUL bytes, trim whitespace, and enforce a maximum length.
pub fn sanitize_string(input: &str, max_len: usize) -> Result<String, ValidationError> {
    let cleaned: String = input.chars().filter(|&c| c != '\0').collect();
    let trimmed = cleaned.trim().to_string();
    if trimmed.len() > max_len {
        return Err(err(format!(
            "string length {} exceeds maximum {max_len} after sanitization",
            trimmed.len()
        )));
    }
    Ok(trimmed)
}
