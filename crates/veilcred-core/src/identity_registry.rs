//! C5 — subject records keyed by id and by public key.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use veilcred_common::crypto::secure_random;
use veilcred_common::validate::{validate_attribute_list, validate_public_key, Attribute};

use crate::error::CoreError;
use crate::metrics::IDENTITIES_REGISTERED;

const MAX_LIST_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub public_key: String,
    pub attributes: Vec<Attribute>,
    pub created_at: i64,
}

/// Subject records keyed by id, with a paired `publicKey -> id` index kept
/// consistent by every write.
pub struct IdentityRegistry {
    by_id: DashMap<String, Identity>,
    by_public_key: DashMap<String, String>,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            by_public_key: DashMap::new(),
        }
    }

    fn generate_id() -> Result<String, CoreError> {
        let bytes = secure_random(16).map_err(|e| CoreError::Cryptographic(e.to_string()))?;
        Ok(format!("id_{}", hex::encode(bytes)))
    }

    /// Register a new identity. Fails with `Conflict` if `public_key` is
    /// already mapped to an existing identity.
    pub fn register(
        &self,
        public_key: &str,
        attributes: Vec<Attribute>,
        now_ms: i64,
    ) -> Result<Identity, CoreError> {
        validate_public_key(public_key)?;
        validate_attribute_list(&attributes, now_ms)?;

        if let Some(existing) = self.by_public_key.get(public_key) {
            return Err(CoreError::conflict("identity", existing.value().clone()));
        }

        let id = Self::generate_id()?;
        let identity = Identity {
            id: id.clone(),
            public_key: public_key.to_string(),
            attributes,
            created_at: now_ms,
        };

        self.by_public_key
            .insert(public_key.to_string(), id.clone());
        self.by_id.insert(id, identity.clone());
        IDENTITIES_REGISTERED.inc();
        Ok(identity)
    }

    pub fn get(&self, id: &str) -> Option<Identity> {
        self.by_id.get(id).map(|e| e.value().clone())
    }

    pub fn find_by_public_key(&self, public_key: &str) -> Option<Identity> {
        let id = self.by_public_key.get(public_key)?.value().clone();
        self.get(&id)
    }

    pub fn has(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Atomically replace the entire attribute set; the prior set is
    /// discarded.
    pub fn update_attributes(
        &self,
        id: &str,
        attributes: Vec<Attribute>,
        now_ms: i64,
    ) -> Result<Identity, CoreError> {
        validate_attribute_list(&attributes, now_ms)?;
        let mut entry = self
            .by_id
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("identity", id))?;
        entry.attributes = attributes;
        Ok(entry.clone())
    }

    pub fn list(&self, limit: usize, offset: usize) -> Result<Vec<Identity>, CoreError> {
        if limit > MAX_LIST_LIMIT {
            return Err(CoreError::Validation(veilcred_common::ValidationError::new(
                format!("list limit {limit} exceeds {MAX_LIST_LIMIT}"),
            )));
        }
        let mut all: Vec<Identity> = self.by_id.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> Vec<Attribute> {
        vec![Attribute {
            name: "name".to_string(),
            value: veilcred_common::validate::AttributeValue::String("Alice".to_string()),
            timestamp_ms: 1_700_000_000_000,
        }]
    }

    #[test]
    fn register_then_find_by_public_key_round_trips() {
        let registry = IdentityRegistry::new();
        let pk = format!("0x{}", "1".repeat(64));
        let identity = registry.register(&pk, attrs(), 1_700_000_000_000).unwrap();
        let found = registry.find_by_public_key(&pk).unwrap();
        assert_eq!(found.id, identity.id);
    }

    #[test]
    fn duplicate_public_key_registration_conflicts() {
        let registry = IdentityRegistry::new();
        let pk = format!("0x{}", "2".repeat(64));
        registry.register(&pk, attrs(), 1_700_000_000_000).unwrap();
        let second = registry.register(&pk, attrs(), 1_700_000_000_000);
        assert!(matches!(second, Err(CoreError::Conflict { .. })));
    }

    #[test]
    fn update_attributes_replaces_the_full_set() {
        let registry = IdentityRegistry::new();
        let pk = format!("0x{}", "3".repeat(64));
        let identity = registry.register(&pk, attrs(), 1_700_000_000_000).unwrap();
        let new_attrs = vec![Attribute {
            name: "age".to_string(),
            value: veilcred_common::validate::AttributeValue::Number(30.0),
            timestamp_ms: 1_700_000_000_000,
        }];
        let updated = registry
            .update_attributes(&identity.id, new_attrs.clone(), 1_700_000_000_000)
            .unwrap();
        assert_eq!(updated.attributes, new_attrs);
    }

    #[test]
    fn list_respects_limit_and_offset() {
        let registry = IdentityRegistry::new();
        for i in 0..5u8 {
            let pk = format!("0x{}", hex::encode([i; 32]));
            registry.register(&pk, attrs(), 1_700_000_000_000 + i as i64).unwrap();
        }
        let page = registry.list(2, 1).unwrap();
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn list_rejects_limit_above_1000() {
        let registry = IdentityRegistry::new();
        assert!(registry.list(1001, 0).is_err());
    }
}
