//! C6 — deterministic signing over canonicalized attributes.
//!
//! The signing contract is an HMAC-style deterministic tag rather than a
//! public-key signature: `signingKey = HKDF(issuerKey, salt=issuerName,
//! info="credential-signature")`, `signature = sha3(canonical || signingKey)`.
//! Swapping this for a public-key scheme at deployment time only requires a
//! different `sign`/`verify` pair behind the same canonical-form contract.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use veilcred_common::crypto::{constant_time_eq, hash, hkdf, secure_random, secure_zero};
use veilcred_common::validate::{
    sanitize_string, validate_attribute_list, validate_credential_id, validate_expiration,
    validate_identity_id, Attribute,
};

use crate::error::CoreError;
use crate::metrics::CREDENTIALS_ISSUED;

const MAX_ISSUER_NAME_LEN: usize = 100;
const MAX_LIST_LIMIT: usize = 1000;
const SIGNING_KEY_LEN: usize = 32;
const SIGNING_INFO: &[u8] = b"credential-signature";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub identity_id: String,
    pub issuer: String,
    pub attributes: Vec<Attribute>,
    pub signature: String,
    pub issued_at: i64,
    pub expires_at: Option<i64>,
}

/// The exact shape signed over: field order here is the canonical order.
#[derive(Serialize)]
struct CanonicalCredential<'a> {
    id: &'a str,
    identity_id: &'a str,
    issuer: &'a str,
    attributes: &'a [Attribute],
    issued_at: i64,
    expires_at: Option<i64>,
}

fn normalize_attributes(attributes: &[Attribute]) -> Vec<Attribute> {
    let mut normalized = attributes.to_vec();
    normalized.sort_by(|a, b| a.name.cmp(&b.name));
    normalized
}

fn canonical_bytes(
    id: &str,
    identity_id: &str,
    issuer: &str,
    normalized_attributes: &[Attribute],
    issued_at: i64,
    expires_at: Option<i64>,
) -> Result<Vec<u8>, CoreError> {
    let canonical = CanonicalCredential {
        id,
        identity_id,
        issuer,
        attributes: normalized_attributes,
        issued_at,
        expires_at,
    };
    serde_json::to_vec(&canonical)
        .map_err(|e| CoreError::Credential(format!("canonicalization failed: {e}")))
}

/// State: issuer identity, credential store, and the subject→credential
/// secondary index.
pub struct CredentialIssuer {
    issuer_name: String,
    issuer_key: [u8; 32],
    credentials: DashMap<String, Credential>,
    subject_index: DashMap<String, Vec<String>>,
}

impl CredentialIssuer {
    /// `issuer_key` must be exactly 32 bytes; pass `None` to draw it from
    /// the CSPRNG.
    pub fn new(issuer_name: &str, issuer_key: Option<[u8; 32]>) -> Result<Self, CoreError> {
        let issuer_name = sanitize_string(issuer_name, MAX_ISSUER_NAME_LEN)?;
        let issuer_key = match issuer_key {
            Some(k) => k,
            None => {
                let bytes = secure_random(32).map_err(|e| CoreError::Cryptographic(e.to_string()))?;
                let mut k = [0u8; 32];
                k.copy_from_slice(&bytes);
                k
            }
        };
        Ok(Self {
            issuer_name,
            issuer_key,
            credentials: DashMap::new(),
            subject_index: DashMap::new(),
        })
    }

    fn generate_credential_id() -> Result<String, CoreError> {
        let bytes = secure_random(16).map_err(|e| CoreError::Cryptographic(e.to_string()))?;
        Ok(format!("cred_{}", hex::encode(bytes)))
    }

    fn derive_signing_key(&self) -> Result<[u8; 32], CoreError> {
        let okm = hkdf(
            &self.issuer_key,
            self.issuer_name.as_bytes(),
            SIGNING_INFO,
            SIGNING_KEY_LEN,
        )
        .map_err(|e| CoreError::Cryptographic(e.to_string()))?;
        let mut key = [0u8; 32];
        key.copy_from_slice(&okm);
        Ok(key)
    }

    fn sign(
        &self,
        id: &str,
        identity_id: &str,
        issuer: &str,
        normalized_attributes: &[Attribute],
        issued_at: i64,
        expires_at: Option<i64>,
    ) -> Result<String, CoreError> {
        let canonical = canonical_bytes(
            id,
            identity_id,
            issuer,
            normalized_attributes,
            issued_at,
            expires_at,
        )?;
        let mut signing_key = self.derive_signing_key()?;
        let mut buf = Vec::with_capacity(canonical.len() + signing_key.len());
        buf.extend_from_slice(&canonical);
        buf.extend_from_slice(&signing_key);
        let signature = hash(&buf);
        secure_zero(&mut signing_key);
        Ok(signature)
    }

    /// Validate, normalize attributes, sign, and store a new credential.
    pub fn issue(
        &self,
        identity_id: &str,
        attributes: Vec<Attribute>,
        expires_at: Option<i64>,
        now_ms: i64,
    ) -> Result<Credential, CoreError> {
        validate_identity_id(identity_id)?;
        validate_attribute_list(&attributes, now_ms)?;
        validate_expiration(expires_at, now_ms)?;

        let id = Self::generate_credential_id()?;
        let normalized = normalize_attributes(&attributes);
        let signature = self.sign(
            &id,
            identity_id,
            &self.issuer_name,
            &normalized,
            now_ms,
            expires_at,
        )?;

        let credential = Credential {
            id: id.clone(),
            identity_id: identity_id.to_string(),
            issuer: self.issuer_name.clone(),
            attributes: normalized,
            signature,
            issued_at: now_ms,
            expires_at,
        };

        self.credentials.insert(id.clone(), credential.clone());
        self.subject_index
            .entry(identity_id.to_string())
            .or_default()
            .push(id);
        CREDENTIALS_ISSUED.inc();
        Ok(credential)
    }

    /// Recompute the expected signature over the credential's normalized
    /// form and compare in constant time. Returns `false` on any structural
    /// defect without ever throwing.
    pub fn verify(&self, credential: &Credential) -> bool {
        if validate_credential_id(&credential.id).is_err() {
            return false;
        }
        let normalized = normalize_attributes(&credential.attributes);
        let expected = match self.sign(
            &credential.id,
            &credential.identity_id,
            &credential.issuer,
            &normalized,
            credential.issued_at,
            credential.expires_at,
        ) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        constant_time_eq(expected.as_bytes(), credential.signature.as_bytes())
    }

    /// `expiresAt` strictly in the past. Exactly-now is not expired.
    pub fn is_expired(&self, credential: &Credential, now_ms: i64) -> bool {
        matches!(credential.expires_at, Some(exp) if exp <= now_ms)
    }

    pub fn is_valid(&self, credential: &Credential, now_ms: i64) -> bool {
        self.verify(credential) && !self.is_expired(credential, now_ms)
    }

    pub fn get(&self, id: &str) -> Option<Credential> {
        self.credentials.get(id).map(|e| e.value().clone())
    }

    pub fn for_subject(
        &self,
        identity_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Credential>, CoreError> {
        if limit > MAX_LIST_LIMIT {
            return Err(CoreError::Validation(veilcred_common::ValidationError::new(
                format!("list limit {limit} exceeds {MAX_LIST_LIMIT}"),
            )));
        }
        let ids = self
            .subject_index
            .get(identity_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        let credentials: Vec<Credential> = ids
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|id| self.get(&id))
            .collect();
        Ok(credentials)
    }

    pub fn count_for_subject(&self, identity_id: &str) -> usize {
        self.subject_index
            .get(identity_id)
            .map(|e| e.value().len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veilcred_common::validate::AttributeValue;

    fn age_attrs() -> Vec<Attribute> {
        vec![Attribute {
            name: "age".to_string(),
            value: AttributeValue::Number(25.0),
            timestamp_ms: 1_700_000_000_000,
        }]
    }

    #[test]
    fn issued_credential_verifies() {
        let issuer = CredentialIssuer::new("test-issuer", Some([9u8; 32])).unwrap();
        let credential = issuer
            .issue(&format!("id_{}", "a".repeat(32)), age_attrs(), None, 1_700_000_000_000)
            .unwrap();
        assert!(issuer.verify(&credential));
    }

    #[test]
    fn tampered_credential_fails_verification() {
        let issuer = CredentialIssuer::new("test-issuer", Some([9u8; 32])).unwrap();
        let mut credential = issuer
            .issue(&format!("id_{}", "a".repeat(32)), age_attrs(), None, 1_700_000_000_000)
            .unwrap();
        credential.issuer = "someone-else".to_string();
        assert!(!issuer.verify(&credential));
    }

    #[test]
    fn expiry_exactly_now_is_not_expired() {
        let issuer = CredentialIssuer::new("test-issuer", Some([9u8; 32])).unwrap();
        let credential = issuer
            .issue(
                &format!("id_{}", "a".repeat(32)),
                age_attrs(),
                Some(1_700_000_100_000),
                1_700_000_000_000,
            )
            .unwrap();
        assert!(!issuer.is_expired(&credential, 1_700_000_100_000));
        assert!(issuer.is_expired(&credential, 1_700_000_100_001));
    }

    #[test]
    fn for_subject_and_count_agree() {
        let issuer = CredentialIssuer::new("test-issuer", Some([9u8; 32])).unwrap();
        let identity_id = format!("id_{}", "b".repeat(32));
        issuer
            .issue(&identity_id, age_attrs(), None, 1_700_000_000_000)
            .unwrap();
        issuer
            .issue(&identity_id, age_attrs(), None, 1_700_000_000_001)
            .unwrap();
        assert_eq!(issuer.count_for_subject(&identity_id), 2);
        assert_eq!(issuer.for_subject(&identity_id, 10, 0).unwrap().len(), 2);
    }

    #[test]
    fn deterministic_signing_is_reproducible_across_issuers_with_same_key() {
        let issuer_a = CredentialIssuer::new("same-issuer", Some([1u8; 32])).unwrap();
        let issuer_b = CredentialIssuer::new("same-issuer", Some([1u8; 32])).unwrap();
        let identity_id = format!("id_{}", "c".repeat(32));
        let credential = issuer_a
            .issue(&identity_id, age_attrs(), None, 1_700_000_000_000)
            .unwrap();
        assert!(issuer_b.verify(&credential));
    }
}
