//! Cross-module seed scenarios: issue → prove → verify, revoke → SMT proof,
//! and audit chain tampering.

use std::sync::Arc;

use veilcred_common::validate::{Attribute, AttributeValue};
use veilcred_core::audit::AuditLog;
use veilcred_core::credential_issuer::CredentialIssuer;
use veilcred_core::identity_registry::IdentityRegistry;
use veilcred_core::proof_generator::ProofGenerator;
use veilcred_core::proof_verifier::ProofVerifier;
use veilcred_core::revocation_registry::RevocationRegistry;
use veilcred_zk::{ClaimStatement, InProcessGroth16, LightPoseidonHasher, Witness};

const NOW: i64 = 1_700_000_000_000;

fn backend_pair(seed: u64) -> (Arc<InProcessGroth16>, Arc<InProcessGroth16>) {
    (
        Arc::new(InProcessGroth16::new(seed).unwrap()),
        Arc::new(InProcessGroth16::new(seed).unwrap()),
    )
}

fn name_attribute() -> Vec<Attribute> {
    vec![Attribute {
        name: "name".to_string(),
        value: AttributeValue::String("Alice".to_string()),
        timestamp_ms: NOW,
    }]
}

fn age_attribute(age: f64) -> Vec<Attribute> {
    vec![Attribute {
        name: "age".to_string(),
        value: AttributeValue::Number(age),
        timestamp_ms: NOW,
    }]
}

#[tokio::test]
async fn over_18_positive_scenario_verifies_true() {
    let (prove_backend, verify_backend) = backend_pair(1);
    let hasher = Arc::new(LightPoseidonHasher::new().unwrap());
    let generator = ProofGenerator::new(prove_backend, hasher);
    let verifier = ProofVerifier::new(verify_backend);

    let identities = IdentityRegistry::new();
    let public_key = format!("0x{}", "11".repeat(32));
    identities.register(&public_key, name_attribute(), NOW).unwrap();

    let issuer = CredentialIssuer::new("veilcred-test-issuer", Some([3u8; 32])).unwrap();
    let identity_id = identities.find_by_public_key(&public_key).unwrap().id;
    issuer
        .issue(&identity_id, age_attribute(25.0), None, NOW)
        .unwrap();

    let claim = ClaimStatement::AgeOver { threshold: 18 };
    let witness = Witness::AgeOver {
        age: 25,
        salt: Some(12345),
    };
    let proof = generator.generate(claim, witness, NOW).await.unwrap();
    assert_eq!(proof.last_public_signal(), Some("1"));
    assert!(verifier.verify("ageOver", &proof, NOW).await.unwrap().valid);
}

#[tokio::test]
async fn under_18_negative_scenario_verifies_but_claim_is_false() {
    let (prove_backend, verify_backend) = backend_pair(2);
    let hasher = Arc::new(LightPoseidonHasher::new().unwrap());
    let generator = ProofGenerator::new(prove_backend, hasher);
    let verifier = ProofVerifier::new(verify_backend);

    let claim = ClaimStatement::AgeOver { threshold: 18 };
    let witness = Witness::AgeOver {
        age: 15,
        salt: Some(12345),
    };
    let proof = generator.generate(claim, witness, NOW).await.unwrap();
    assert!(!proof.extract_claim_result());
    assert!(verifier.verify("ageOver", &proof, NOW).await.unwrap().valid);
}

#[tokio::test]
async fn license_valid_scenario_verifies_true() {
    let (prove_backend, verify_backend) = backend_pair(3);
    let hasher = Arc::new(LightPoseidonHasher::new().unwrap());
    let generator = ProofGenerator::new(prove_backend, hasher);
    let verifier = ProofVerifier::new(verify_backend);

    let claim = ClaimStatement::LicenseValid {
        license_type: "Professional Engineer".to_string(),
    };
    let witness = Witness::LicenseValid {
        license_type: "Professional Engineer".to_string(),
        expiration_date_ms: NOW + 100_000,
        salt: Some(67890),
    };
    let proof = generator.generate(claim, witness, NOW).await.unwrap();
    assert_eq!(proof.last_public_signal(), Some("1"));
    assert!(verifier.verify("licenseValid", &proof, NOW).await.unwrap().valid);
}

#[tokio::test]
async fn clearance_insufficient_scenario_verifies_false() {
    let (prove_backend, verify_backend) = backend_pair(4);
    let hasher = Arc::new(LightPoseidonHasher::new().unwrap());
    let generator = ProofGenerator::new(prove_backend, hasher);
    let verifier = ProofVerifier::new(verify_backend);

    let claim = ClaimStatement::ClearanceLevel { required_level: 5 };
    let witness = Witness::ClearanceLevel {
        clearance_level: 3,
        salt: Some(1),
    };
    let proof = generator.generate(claim, witness, NOW).await.unwrap();
    assert_eq!(proof.last_public_signal(), Some("0"));
    assert!(!proof.extract_claim_result());
    assert!(verifier.verify("clearanceLevel", &proof, NOW).await.unwrap().valid);
}

#[test]
fn revocation_path_scenario() {
    let issuer = CredentialIssuer::new("veilcred-test-issuer", Some([5u8; 32])).unwrap();
    let identity_id = format!("id_{}", "a".repeat(32));
    let credential = issuer
        .issue(&identity_id, age_attribute(30.0), None, NOW)
        .unwrap();

    let revocations = RevocationRegistry::new();
    revocations
        .revoke(&credential.id, "expired", NOW)
        .unwrap();

    assert!(revocations.is_revoked(&credential.id));
    let stats = revocations.statistics(NOW);
    assert_eq!(stats.revocations_by_reason.get("expired"), Some(&1));
    assert_eq!(stats.revoked_last_24h, 1);

    let proof = revocations.generate_proof(&credential.id).unwrap();
    assert!(proof.revoked);
    assert_eq!(proof.proof[0], revocations.root());
}

#[test]
fn audit_chain_has_no_violations_when_untampered() {
    // The tamper-detection path itself (mutating a logged event in place
    // and observing `HashMismatch`) requires reaching into the log's
    // private event storage and is covered by the module's own unit test
    // in `audit.rs`; this integration test exercises the same three-event
    // chain from the crate's public surface and confirms a clean chain
    // verifies with zero violations end to end.
    let log = AuditLog::new();
    log.record_identity_registration("system", "id_abc", &"a".repeat(64), NOW)
        .unwrap();
    log.record_credential_issuance("system", "cred_abc", NOW + 1)
        .unwrap();
    log.record_proof_verification("alice", true, NOW + 2).unwrap();

    let events = log.events();
    assert_eq!(events.len(), 3);
    assert!(log.verify_integrity().is_empty());
}
