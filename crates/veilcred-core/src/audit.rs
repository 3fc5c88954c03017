//! C4 — the tamper-evident, hash-chained audit log.
//!
//! `sequenceNumber` and `previousHash` give every event a position and a
//! link to its predecessor; `hash` covers every other field in a fixed
//! order. [`AuditLog::verify_integrity`] replays the whole chain and
//! reports every place those three invariants fail, rather than stopping at
//! the first violation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use veilcred_common::crypto::{hash, secure_random};

use crate::error::CoreError;
use crate::metrics::AUDIT_EVENTS_RECORDED;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    IdentityRegistered,
    CredentialIssued,
    ProofGenerated,
    ProofVerified,
    CredentialRevoked,
    SecurityViolation,
    Authentication,
    AccessControl,
    DataAccess,
    RateLimitViolation,
}

impl EventType {
    fn as_str(&self) -> &'static str {
        match self {
            EventType::IdentityRegistered => "IDENTITY_REGISTERED",
            EventType::CredentialIssued => "CREDENTIAL_ISSUED",
            EventType::ProofGenerated => "PROOF_GENERATED",
            EventType::ProofVerified => "PROOF_VERIFIED",
            EventType::CredentialRevoked => "CREDENTIAL_REVOKED",
            EventType::SecurityViolation => "SECURITY_VIOLATION",
            EventType::Authentication => "AUTHENTICATION",
            EventType::AccessControl => "ACCESS_CONTROL",
            EventType::DataAccess => "DATA_ACCESS",
            EventType::RateLimitViolation => "RATE_LIMIT_VIOLATION",
        }
    }
}

/// A logged event, minus the fields the log itself assigns.
#[derive(Debug, Clone)]
pub struct AuditEventDraft {
    pub event_type: EventType,
    pub severity: Severity,
    pub actor: String,
    pub resource: String,
    pub action: String,
    pub details: BTreeMap<String, String>,
    pub outcome: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub timestamp: i64,
    pub sequence_number: u64,
    pub event_type_str: String,
    pub severity_str: String,
    pub actor: String,
    pub resource: String,
    pub action: String,
    pub details: BTreeMap<String, String>,
    pub outcome: String,
    pub previous_hash: String,
    pub hash: String,
}

impl AuditEvent {
    /// SHA3-256 of the canonical encoding of every field except `hash`.
    fn compute_hash(&self) -> String {
        let mut buf = String::new();
        buf.push_str(&self.id);
        buf.push('|');
        buf.push_str(&self.timestamp.to_string());
        buf.push('|');
        buf.push_str(&self.sequence_number.to_string());
        buf.push('|');
        buf.push_str(&self.event_type_str);
        buf.push('|');
        buf.push_str(&self.severity_str);
        buf.push('|');
        buf.push_str(&self.actor);
        buf.push('|');
        buf.push_str(&self.resource);
        buf.push('|');
        buf.push_str(&self.action);
        buf.push('|');
        for (k, v) in &self.details {
            buf.push_str(k);
            buf.push('=');
            buf.push_str(v);
            buf.push(';');
        }
        buf.push('|');
        buf.push_str(&self.outcome);
        buf.push('|');
        buf.push_str(&self.previous_hash);
        hash(buf.as_bytes())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    SequenceGap { expected: u64, found: u64 },
    PreviousHashMismatch { sequence_number: u64 },
    HashMismatch { sequence_number: u64 },
}

/// Anomaly-detection thresholds. Configuration, not hardcoded semantics.
#[derive(Debug, Clone, Copy)]
pub struct AnomalyThresholds {
    pub auth_failure_threshold: u32,
    pub data_access_threshold: u32,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            auth_failure_threshold: 5,
            data_access_threshold: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalySeverity {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    pub actor: String,
    pub description: String,
    pub severity: AnomalySeverity,
}

/// Mask a sensitive value (a public key, typically) to `<first4>...<last4>`.
pub fn mask_sensitive(value: &str) -> String {
    if value.chars().count() <= 8 {
        return value.to_string();
    }
    let chars: Vec<char> = value.chars().collect();
    let first: String = chars[..4].iter().collect();
    let last: String = chars[chars.len() - 4..].iter().collect();
    format!("{first}...{last}")
}

fn generate_event_id() -> Result<String, CoreError> {
    let bytes = secure_random(16).map_err(|e| CoreError::Cryptographic(e.to_string()))?;
    Ok(format!("evt_{}", hex::encode(bytes)))
}

/// Single-writer, hash-chained sequence of security-relevant events.
pub struct AuditLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Append `draft`, assigning `sequenceNumber`, `previousHash`, and
    /// `hash` in that order.
    pub fn log(&self, draft: AuditEventDraft, now_ms: i64) -> Result<AuditEvent, CoreError> {
        let mut events = self.events.lock().expect("audit log mutex poisoned");
        let sequence_number = events.len() as u64;
        let previous_hash = events
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| "0".repeat(64));
        let mut event = AuditEvent {
            id: generate_event_id()?,
            timestamp: now_ms,
            sequence_number,
            event_type_str: draft.event_type.as_str().to_string(),
            severity_str: draft.severity.as_str().to_string(),
            actor: draft.actor,
            resource: draft.resource,
            action: draft.action,
            details: draft.details,
            outcome: draft.outcome,
            previous_hash,
            hash: String::new(),
        };
        event.hash = event.compute_hash();
        events.push(event.clone());
        AUDIT_EVENTS_RECORDED.inc();
        Ok(event)
    }

    /// A read-only snapshot of every event logged so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit log mutex poisoned").clone()
    }

    pub fn by_resource(&self, resource: &str) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.resource == resource)
            .collect()
    }

    pub fn by_actor(&self, actor: &str) -> Vec<AuditEvent> {
        self.events().into_iter().filter(|e| e.actor == actor).collect()
    }

    pub fn by_type(&self, event_type: EventType) -> Vec<AuditEvent> {
        let wanted = event_type.as_str();
        self.events()
            .into_iter()
            .filter(|e| e.event_type_str == wanted)
            .collect()
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<AuditEvent> {
        let wanted = severity.as_str();
        self.events()
            .into_iter()
            .filter(|e| e.severity_str == wanted)
            .collect()
    }

    pub fn by_time_range(&self, start_ms: i64, end_ms: i64) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.timestamp >= start_ms && e.timestamp <= end_ms)
            .collect()
    }

    /// Replay the chain, returning every sequence-number gap,
    /// previous-hash mismatch, and recomputed-hash mismatch found.
    pub fn verify_integrity(&self) -> Vec<IntegrityViolation> {
        let events = self.events();
        let mut violations = Vec::new();
        let mut expected_prev = "0".repeat(64);
        for (i, event) in events.iter().enumerate() {
            let expected_seq = i as u64;
            if event.sequence_number != expected_seq {
                violations.push(IntegrityViolation::SequenceGap {
                    expected: expected_seq,
                    found: event.sequence_number,
                });
            }
            if event.previous_hash != expected_prev {
                violations.push(IntegrityViolation::PreviousHashMismatch {
                    sequence_number: event.sequence_number,
                });
            }
            if event.compute_hash() != event.hash {
                violations.push(IntegrityViolation::HashMismatch {
                    sequence_number: event.sequence_number,
                });
            }
            expected_prev = event.hash.clone();
        }
        violations
    }

    /// Flag (a) actors with `>= threshold` authentication failures and
    /// (b) actors with `> threshold` data-access events.
    pub fn detect_anomalies(&self, thresholds: &AnomalyThresholds) -> Vec<Anomaly> {
        let events = self.events();
        let mut auth_failures: HashMap<String, u32> = HashMap::new();
        let mut data_access: HashMap<String, u32> = HashMap::new();

        for event in &events {
            if event.event_type_str == EventType::Authentication.as_str() && event.outcome == "failure"
            {
                *auth_failures.entry(event.actor.clone()).or_insert(0) += 1;
            }
            if event.event_type_str == EventType::DataAccess.as_str() {
                *data_access.entry(event.actor.clone()).or_insert(0) += 1;
            }
        }

        let mut anomalies = Vec::new();
        for (actor, count) in auth_failures {
            if count >= thresholds.auth_failure_threshold {
                anomalies.push(Anomaly {
                    actor,
                    description: format!("{count} authentication failures"),
                    severity: AnomalySeverity::High,
                });
            }
        }
        for (actor, count) in data_access {
            if count > thresholds.data_access_threshold {
                anomalies.push(Anomaly {
                    actor,
                    description: format!("{count} data-access events"),
                    severity: AnomalySeverity::Medium,
                });
            }
        }
        anomalies
    }

    // --- typed helpers -------------------------------------------------

    pub fn record_identity_registration(
        &self,
        actor: &str,
        identity_id: &str,
        public_key: &str,
        now_ms: i64,
    ) -> Result<AuditEvent, CoreError> {
        let mut details = BTreeMap::new();
        details.insert("publicKey".to_string(), mask_sensitive(public_key));
        self.log(
            AuditEventDraft {
                event_type: EventType::IdentityRegistered,
                severity: Severity::Info,
                actor: actor.to_string(),
                resource: identity_id.to_string(),
                action: "register".to_string(),
                details,
                outcome: "success".to_string(),
            },
            now_ms,
        )
    }

    pub fn record_credential_issuance(
        &self,
        actor: &str,
        credential_id: &str,
        now_ms: i64,
    ) -> Result<AuditEvent, CoreError> {
        self.log(
            AuditEventDraft {
                event_type: EventType::CredentialIssued,
                severity: Severity::Info,
                actor: actor.to_string(),
                resource: credential_id.to_string(),
                action: "issue".to_string(),
                details: BTreeMap::new(),
                outcome: "success".to_string(),
            },
            now_ms,
        )
    }

    pub fn record_proof_generation(
        &self,
        actor: &str,
        claim_type: &str,
        success: bool,
        now_ms: i64,
    ) -> Result<AuditEvent, CoreError> {
        let mut details = BTreeMap::new();
        details.insert("claimType".to_string(), claim_type.to_string());
        self.log(
            AuditEventDraft {
                event_type: EventType::ProofGenerated,
                severity: if success { Severity::Info } else { Severity::Warning },
                actor: actor.to_string(),
                resource: claim_type.to_string(),
                action: "generate_proof".to_string(),
                details,
                outcome: if success { "success" } else { "failure" }.to_string(),
            },
            now_ms,
        )
    }

    pub fn record_proof_verification(
        &self,
        actor: &str,
        valid: bool,
        now_ms: i64,
    ) -> Result<AuditEvent, CoreError> {
        self.log(
            AuditEventDraft {
                event_type: EventType::ProofVerified,
                severity: Severity::Info,
                actor: actor.to_string(),
                resource: "proof".to_string(),
                action: "verify".to_string(),
                details: BTreeMap::new(),
                outcome: if valid { "valid" } else { "invalid" }.to_string(),
            },
            now_ms,
        )
    }

    pub fn record_credential_revocation(
        &self,
        actor: &str,
        credential_id: &str,
        reason: Option<&str>,
        now_ms: i64,
    ) -> Result<AuditEvent, CoreError> {
        let mut details = BTreeMap::new();
        details.insert(
            "reason".to_string(),
            reason.unwrap_or("unspecified").to_string(),
        );
        self.log(
            AuditEventDraft {
                event_type: EventType::CredentialRevoked,
                severity: Severity::Warning,
                actor: actor.to_string(),
                resource: credential_id.to_string(),
                action: "revoke".to_string(),
                details,
                outcome: "success".to_string(),
            },
            now_ms,
        )
    }

    pub fn record_security_violation(
        &self,
        actor: &str,
        description: &str,
        now_ms: i64,
    ) -> Result<AuditEvent, CoreError> {
        let mut details = BTreeMap::new();
        details.insert("description".to_string(), description.to_string());
        self.log(
            AuditEventDraft {
                event_type: EventType::SecurityViolation,
                severity: Severity::Critical,
                actor: actor.to_string(),
                resource: "security".to_string(),
                action: "violation".to_string(),
                details,
                outcome: "blocked".to_string(),
            },
            now_ms,
        )
    }

    pub fn record_authentication(
        &self,
        actor: &str,
        success: bool,
        now_ms: i64,
    ) -> Result<AuditEvent, CoreError> {
        self.log(
            AuditEventDraft {
                event_type: EventType::Authentication,
                severity: if success { Severity::Info } else { Severity::Warning },
                actor: actor.to_string(),
                resource: "auth".to_string(),
                action: "authenticate".to_string(),
                details: BTreeMap::new(),
                outcome: if success { "success" } else { "failure" }.to_string(),
            },
            now_ms,
        )
    }

    pub fn record_access_control_decision(
        &self,
        actor: &str,
        resource: &str,
        allowed: bool,
        now_ms: i64,
    ) -> Result<AuditEvent, CoreError> {
        self.log(
            AuditEventDraft {
                event_type: EventType::AccessControl,
                severity: if allowed { Severity::Info } else { Severity::Warning },
                actor: actor.to_string(),
                resource: resource.to_string(),
                action: "access_decision".to_string(),
                details: BTreeMap::new(),
                outcome: if allowed { "allowed" } else { "denied" }.to_string(),
            },
            now_ms,
        )
    }

    pub fn record_data_access(
        &self,
        actor: &str,
        resource: &str,
        now_ms: i64,
    ) -> Result<AuditEvent, CoreError> {
        self.log(
            AuditEventDraft {
                event_type: EventType::DataAccess,
                severity: Severity::Info,
                actor: actor.to_string(),
                resource: resource.to_string(),
                action: "access".to_string(),
                details: BTreeMap::new(),
                outcome: "success".to_string(),
            },
            now_ms,
        )
    }

    pub fn record_rate_limit_violation(
        &self,
        actor: &str,
        resource: &str,
        now_ms: i64,
    ) -> Result<AuditEvent, CoreError> {
        self.log(
            AuditEventDraft {
                event_type: EventType::RateLimitViolation,
                severity: Severity::Warning,
                actor: actor.to_string(),
                resource: resource.to_string(),
                action: "rate_limit".to_string(),
                details: BTreeMap::new(),
                outcome: "blocked".to_string(),
            },
            now_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_three_events_has_no_integrity_violations() {
        let log = AuditLog::new();
        log.record_identity_registration("system", "id_abc", &"a".repeat(64), 1000)
            .unwrap();
        log.record_credential_issuance("system", "cred_abc", 1001)
            .unwrap();
        log.record_proof_verification("alice", true, 1002).unwrap();
        assert!(log.verify_integrity().is_empty());
    }

    #[test]
    fn tampering_a_field_produces_a_hash_mismatch_violation() {
        let log = AuditLog::new();
        log.record_identity_registration("system", "id_abc", &"a".repeat(64), 1000)
            .unwrap();
        log.record_credential_issuance("system", "cred_abc", 1001)
            .unwrap();
        log.record_proof_verification("alice", true, 1002).unwrap();

        {
            let mut events = log.events.lock().unwrap();
            events[1].resource = "tampered".to_string();
        }

        let violations = log.verify_integrity();
        assert!(violations
            .iter()
            .any(|v| matches!(v, IntegrityViolation::HashMismatch { sequence_number: 1 })));
    }

    #[test]
    fn five_authentication_failures_trigger_high_anomaly() {
        let log = AuditLog::new();
        for i in 0..5 {
            log.record_authentication("mallory", false, 1000 + i).unwrap();
        }
        let anomalies = log.detect_anomalies(&AnomalyThresholds::default());
        assert!(anomalies
            .iter()
            .any(|a| a.actor == "mallory" && a.severity == AnomalySeverity::High));
    }

    #[test]
    fn mask_sensitive_keeps_first_and_last_four() {
        let masked = mask_sensitive(&"1".repeat(64));
        assert_eq!(masked, "1111...1111");
    }

    #[test]
    fn short_values_are_not_masked() {
        assert_eq!(mask_sensitive("abcd"), "abcd");
    }

    #[test]
    fn queries_filter_by_resource_and_severity() {
        let log = AuditLog::new();
        log.record_credential_issuance("system", "cred_a", 1000).unwrap();
        log.record_credential_revocation("system", "cred_a", Some("expired"), 1001)
            .unwrap();
        assert_eq!(log.by_resource("cred_a").len(), 2);
        assert_eq!(log.by_severity(Severity::Warning).len(), 1);
    }
}
