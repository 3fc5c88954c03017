//! Groth16 prover/verifier ports (C9/C10 external collaborators) plus a
//! default in-process adapter over `ark-groth16`.
//!
//! The external trusted-setup ceremony and a `(circuit).wasm`/`(circuit).zkey`
//! artifact pair are genuinely out of scope for this crate — [`CircuitArtifactPaths`]
//! documents that file-resolution contract for a production adapter that
//! shells out to such artifacts. [`InProcessGroth16`] is the adapter this
//! workspace actually exercises: it runs its own circuit-specific setup at
//! construction time so the whole proving/verification pipeline is testable
//! without an external snarkjs/circom toolchain. Swapping in a real
//! ceremony-backed adapter only requires a different `GrothProver`/
//! `GrothVerifier` implementation; callers depend on the trait, not the type.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ark_bn254::{Bn254, Fr};
use ark_ff::PrimeField;
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof as ArkProof, ProvingKey};
use ark_snark::SNARK;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::circuits::{AgeOverCircuit, ClearanceLevelCircuit, LicenseValidCircuit, RoleAuthorizationCircuit};
use crate::claims::{CircuitInputs, ClaimStatement};
use crate::error::ZkError;
use crate::wire::ProofData;

/// A leading auxiliary signal (the Poseidon commitment) precedes the
/// circuit-enforced public inputs in every claim kind's wire-level
/// `publicSignals`.
pub const AUX_SIGNAL_COUNT: usize = 1;

/// Where a production adapter resolves `(circuit).wasm` / `(circuit).zkey` /
/// `(circuit)_verification_key.json` from, keyed by claim circuit name.
/// Unused by [`InProcessGroth16`]; documents the file-based contract §6
/// assumes for a deployment that consumes real trusted-setup artifacts.
#[derive(Debug, Clone)]
pub struct CircuitArtifactPaths {
    pub wasm_path: PathBuf,
    pub zkey_path: PathBuf,
    pub verification_key_path: PathBuf,
}

impl CircuitArtifactPaths {
    pub fn for_circuit(base_dir: &Path, circuit_name: &str) -> Self {
        Self {
            wasm_path: base_dir.join(format!("{circuit_name}.wasm")),
            zkey_path: base_dir.join(format!("{circuit_name}.zkey")),
            verification_key_path: base_dir.join(format!("{circuit_name}_verification_key.json")),
        }
    }
}

/// Port for the external Groth16 prover: `prove(wasm, zkey, inputs) →
/// {proof, publicSignals}`, specialized here to dispatch on claim kind
/// rather than raw artifact paths.
pub trait GrothProver: Send + Sync {
    fn prove(
        &self,
        claim: &ClaimStatement,
        inputs: &CircuitInputs,
    ) -> Result<(ProofData, Vec<String>), ZkError>;
}

/// Port for the external Groth16 verifier: `verify(verificationKey,
/// publicSignals, proof) → bool`.
pub trait GrothVerifier: Send + Sync {
    fn verify(
        &self,
        circuit_name: &str,
        proof: &ProofData,
        public_signals: &[String],
    ) -> Result<bool, ZkError>;
}

fn parse_u64(inputs: &CircuitInputs, key: &str) -> Result<u64, ZkError> {
    inputs
        .get(key)
        .ok_or_else(|| ZkError::Circuit(format!("missing circuit input '{key}'")))?
        .parse::<u64>()
        .map_err(|e| ZkError::Circuit(format!("circuit input '{key}' not a u64: {e}")))
}

fn field_to_decimal<F: PrimeField>(f: F) -> String {
    let bytes = f.into_bigint().to_bytes_be();
    num_bigint::BigUint::from_bytes_be(&bytes).to_string()
}

/// A single-circuit Groth16 key pair, produced by a local circuit-specific
/// setup. Stands in for a production trusted-setup ceremony: fine for an
/// in-process adapter, unacceptable for a deployment that needs the keys to
/// be publicly auditable.
struct CircuitKeys {
    proving_key: ProvingKey<Bn254>,
    prepared_vk: PreparedVerifyingKey<Bn254>,
}

/// Default in-process Groth16 adapter covering all four claim circuits.
pub struct InProcessGroth16 {
    keys: HashMap<&'static str, CircuitKeys>,
}

impl InProcessGroth16 {
    /// Run circuit-specific setup for all four circuits with a seeded RNG.
    /// Deterministic so repeated construction in tests yields stable keys.
    pub fn new(seed: u64) -> Result<Self, ZkError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut keys = HashMap::new();

        let age_over = AgeOverCircuit {
            age: 0,
            salt: 0,
            threshold: 0,
            is_over: false,
        };
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(age_over, &mut rng)
            .map_err(|e| ZkError::Configuration(format!("ageOver setup failed: {e}")))?;
        keys.insert(
            "ageOver",
            CircuitKeys {
                proving_key: pk,
                prepared_vk: Groth16::<Bn254>::process_vk(&vk)
                    .map_err(|e| ZkError::Configuration(format!("ageOver vk prep failed: {e}")))?,
            },
        );

        let license_valid = LicenseValidCircuit {
            license_type_hash: 0,
            expiration_date: 0,
            salt: 0,
            required_type_hash: 0,
            current_date: 0,
            is_valid: false,
        };
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(license_valid, &mut rng)
            .map_err(|e| ZkError::Configuration(format!("licenseValid setup failed: {e}")))?;
        keys.insert(
            "licenseValid",
            CircuitKeys {
                proving_key: pk,
                prepared_vk: Groth16::<Bn254>::process_vk(&vk).map_err(|e| {
                    ZkError::Configuration(format!("licenseValid vk prep failed: {e}"))
                })?,
            },
        );

        let clearance_level = ClearanceLevelCircuit {
            clearance_level: 0,
            salt: 0,
            required_level: 0,
            has_access: false,
        };
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(clearance_level, &mut rng)
            .map_err(|e| ZkError::Configuration(format!("clearanceLevel setup failed: {e}")))?;
        keys.insert(
            "clearanceLevel",
            CircuitKeys {
                proving_key: pk,
                prepared_vk: Groth16::<Bn254>::process_vk(&vk).map_err(|e| {
                    ZkError::Configuration(format!("clearanceLevel vk prep failed: {e}"))
                })?,
            },
        );

        let role_authorization = RoleAuthorizationCircuit {
            role_hash: 0,
            salt: 0,
            required_role_hash: 0,
            is_authorized: false,
        };
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(role_authorization, &mut rng)
            .map_err(|e| ZkError::Configuration(format!("roleAuthorization setup failed: {e}")))?;
        keys.insert(
            "roleAuthorization",
            CircuitKeys {
                proving_key: pk,
                prepared_vk: Groth16::<Bn254>::process_vk(&vk).map_err(|e| {
                    ZkError::Configuration(format!("roleAuthorization vk prep failed: {e}"))
                })?,
            },
        );

        Ok(Self { keys })
    }

    fn keys_for(&self, circuit_name: &str) -> Result<&CircuitKeys, ZkError> {
        self.keys
            .get(circuit_name)
            .ok_or_else(|| ZkError::Configuration(format!("unknown circuit '{circuit_name}'")))
    }
}

fn proof_to_wire(proof: &ArkProof<Bn254>) -> ProofData {
    let a = proof.a;
    let b = proof.b;
    let c = proof.c;
    ProofData::new(
        [
            field_to_decimal(a.x),
            field_to_decimal(a.y),
            "1".to_string(),
        ],
        [
            [field_to_decimal(b.x.c0), field_to_decimal(b.x.c1)],
            [field_to_decimal(b.y.c0), field_to_decimal(b.y.c1)],
            ["1".to_string(), "0".to_string()],
        ],
        [
            field_to_decimal(c.x),
            field_to_decimal(c.y),
            "1".to_string(),
        ],
    )
}

impl GrothProver for InProcessGroth16 {
    fn prove(
        &self,
        claim: &ClaimStatement,
        inputs: &CircuitInputs,
    ) -> Result<(ProofData, Vec<String>), ZkError> {
        let circuit_name = claim.circuit_name();
        let keys = self.keys_for(circuit_name)?;
        let mut rng = StdRng::from_entropy();

        let (ark_proof, mut signals): (ArkProof<Bn254>, Vec<String>) = match claim {
            ClaimStatement::AgeOver { .. } => {
                let age = parse_u64(inputs, "age")?;
                let salt = parse_u64(inputs, "salt")?;
                let threshold = parse_u64(inputs, "threshold")?;
                let is_over = parse_u64(inputs, "isOver")? == 1;
                let circuit = AgeOverCircuit {
                    age,
                    salt,
                    threshold,
                    is_over,
                };
                let proof = Groth16::<Bn254>::prove(&keys.proving_key, circuit, &mut rng)
                    .map_err(|e| ZkError::ProofGeneration(format!("ageOver prove failed: {e}")))?;
                let signals = vec![
                    field_to_decimal(Fr::from(threshold)),
                    field_to_decimal(Fr::from(is_over as u64)),
                ];
                (proof, signals)
            }
            ClaimStatement::LicenseValid { .. } => {
                let license_type_hash = parse_u64(inputs, "licenseType")?;
                let expiration_date = parse_u64(inputs, "expirationDate")?;
                let salt = parse_u64(inputs, "salt")?;
                let required_type_hash = parse_u64(inputs, "requiredLicenseType")?;
                let current_date = parse_u64(inputs, "currentDate")?;
                let is_valid = parse_u64(inputs, "isValid")? == 1;
                let circuit = LicenseValidCircuit {
                    license_type_hash,
                    expiration_date,
                    salt,
                    required_type_hash,
                    current_date,
                    is_valid,
                };
                let proof = Groth16::<Bn254>::prove(&keys.proving_key, circuit, &mut rng)
                    .map_err(|e| ZkError::ProofGeneration(format!("licenseValid prove failed: {e}")))?;
                let signals = vec![
                    field_to_decimal(Fr::from(required_type_hash)),
                    field_to_decimal(Fr::from(current_date)),
                    field_to_decimal(Fr::from(is_valid as u64)),
                ];
                (proof, signals)
            }
            ClaimStatement::ClearanceLevel { .. } => {
                let clearance_level = parse_u64(inputs, "clearanceLevel")?;
                let salt = parse_u64(inputs, "salt")?;
                let required_level = parse_u64(inputs, "requiredLevel")?;
                let has_access = parse_u64(inputs, "hasAccess")? == 1;
                let circuit = ClearanceLevelCircuit {
                    clearance_level,
                    salt,
                    required_level,
                    has_access,
                };
                let proof = Groth16::<Bn254>::prove(&keys.proving_key, circuit, &mut rng).map_err(
                    |e| ZkError::ProofGeneration(format!("clearanceLevel prove failed: {e}")),
                )?;
                let signals = vec![
                    field_to_decimal(Fr::from(required_level)),
                    field_to_decimal(Fr::from(has_access as u64)),
                ];
                (proof, signals)
            }
            ClaimStatement::RoleAuthorization { .. } => {
                let role_hash = parse_u64(inputs, "role")?;
                let salt = parse_u64(inputs, "salt")?;
                let required_role_hash = parse_u64(inputs, "requiredRole")?;
                let is_authorized = parse_u64(inputs, "isAuthorized")? == 1;
                let circuit = RoleAuthorizationCircuit {
                    role_hash,
                    salt,
                    required_role_hash,
                    is_authorized,
                };
                let proof = Groth16::<Bn254>::prove(&keys.proving_key, circuit, &mut rng).map_err(
                    |e| ZkError::ProofGeneration(format!("roleAuthorization prove failed: {e}")),
                )?;
                let signals = vec![
                    field_to_decimal(Fr::from(required_role_hash)),
                    field_to_decimal(Fr::from(is_authorized as u64)),
                ];
                (proof, signals)
            }
        };

        let hash_key = match claim {
            ClaimStatement::AgeOver { .. } => "ageHash",
            ClaimStatement::LicenseValid { .. } => "licenseHash",
            ClaimStatement::ClearanceLevel { .. } => "clearanceHash",
            ClaimStatement::RoleAuthorization { .. } => "roleHash",
        };
        let hash = inputs
            .get(hash_key)
            .ok_or_else(|| ZkError::Circuit(format!("missing commitment '{hash_key}'")))?
            .to_string();
        let mut public_signals = Vec::with_capacity(AUX_SIGNAL_COUNT + signals.len());
        public_signals.push(hash);
        public_signals.append(&mut signals);

        Ok((proof_to_wire(&ark_proof), public_signals))
    }
}

impl GrothVerifier for InProcessGroth16 {
    fn verify(
        &self,
        circuit_name: &str,
        proof: &ProofData,
        public_signals: &[String],
    ) -> Result<bool, ZkError> {
        let keys = self.keys_for(circuit_name)?;
        if public_signals.len() <= AUX_SIGNAL_COUNT {
            return Err(ZkError::ProofVerification(
                "public signals shorter than the auxiliary commitment prefix".to_string(),
            ));
        }
        let circuit_signals = &public_signals[AUX_SIGNAL_COUNT..];
        let mut field_inputs = Vec::with_capacity(circuit_signals.len());
        for s in circuit_signals {
            let v: u64 = s
                .parse()
                .map_err(|e| ZkError::ProofVerification(format!("signal '{s}' not numeric: {e}")))?;
            field_inputs.push(Fr::from(v));
        }

        let ark_proof = wire_to_proof(proof)?;
        Groth16::<Bn254>::verify_with_processed_vk(&keys.prepared_vk, &field_inputs, &ark_proof)
            .map_err(|e| ZkError::ProofVerification(format!("groth16 verify failed: {e}")))
    }
}

fn parse_fq(s: &str) -> Result<ark_bn254::Fq, ZkError> {
    ark_bn254::Fq::from_str(s)
        .map_err(|_| ZkError::ProofVerification(format!("invalid base field element '{s}'")))
}

/// Reparse the wire format's decimal-string affine coordinates back into
/// curve points. The inverse of [`proof_to_wire`].
fn wire_to_proof(data: &ProofData) -> Result<ArkProof<Bn254>, ZkError> {
    let a = ark_bn254::g1::G1Affine::new_unchecked(
        parse_fq(&data.pi_a[0])?,
        parse_fq(&data.pi_a[1])?,
    );
    let b = ark_bn254::g2::G2Affine::new_unchecked(
        ark_bn254::Fq2::new(parse_fq(&data.pi_b[0][0])?, parse_fq(&data.pi_b[0][1])?),
        ark_bn254::Fq2::new(parse_fq(&data.pi_b[1][0])?, parse_fq(&data.pi_b[1][1])?),
    );
    let c = ark_bn254::g1::G1Affine::new_unchecked(
        parse_fq(&data.pi_c[0])?,
        parse_fq(&data.pi_c[1])?,
    );
    Ok(ArkProof { a, b, c })
}
