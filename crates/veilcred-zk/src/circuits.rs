//! R1CS circuits for the four claim kinds.
//!
//! Unlike a "prove the predicate holds" circuit, every circuit here proves a
//! *result bit is correctly computed* from the witness: a prover with a
//! failing witness still produces a valid proof, just one whose public
//! `result` signal is `0`. This is what lets a verifier distinguish "proof
//! checks out, claim is false" from "proof is malformed".

use ark_bn254::Fr;
use ark_r1cs_std::cmp::CmpGadget;
use ark_r1cs_std::eq::EqGadget;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

/// `isOver = (age >= threshold)`.
#[derive(Clone)]
pub struct AgeOverCircuit {
    pub age: u64,
    pub salt: u64,
    pub threshold: u64,
    pub is_over: bool,
}

impl ConstraintSynthesizer<Fr> for AgeOverCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let age = FpVar::<Fr>::new_witness(cs.clone(), || Ok(Fr::from(self.age)))?;
        let _salt = FpVar::<Fr>::new_witness(cs.clone(), || Ok(Fr::from(self.salt)))?;
        let threshold = FpVar::<Fr>::new_input(cs.clone(), || Ok(Fr::from(self.threshold)))?;
        let is_over = Boolean::new_input(cs, || Ok(self.is_over))?;

        let computed = age.is_ge(&threshold)?;
        computed.enforce_equal(&is_over)?;
        Ok(())
    }
}

/// `isValid = (license_type_hash == required_hash) && (expiration > current)`.
#[derive(Clone)]
pub struct LicenseValidCircuit {
    pub license_type_hash: u64,
    pub expiration_date: u64,
    pub salt: u64,
    pub required_type_hash: u64,
    pub current_date: u64,
    pub is_valid: bool,
}

impl ConstraintSynthesizer<Fr> for LicenseValidCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let license_type_hash =
            FpVar::<Fr>::new_witness(cs.clone(), || Ok(Fr::from(self.license_type_hash)))?;
        let expiration_date =
            FpVar::<Fr>::new_witness(cs.clone(), || Ok(Fr::from(self.expiration_date)))?;
        let _salt = FpVar::<Fr>::new_witness(cs.clone(), || Ok(Fr::from(self.salt)))?;
        let required_type_hash =
            FpVar::<Fr>::new_input(cs.clone(), || Ok(Fr::from(self.required_type_hash)))?;
        let current_date = FpVar::<Fr>::new_input(cs.clone(), || Ok(Fr::from(self.current_date)))?;
        let is_valid = Boolean::new_input(cs, || Ok(self.is_valid))?;

        let type_matches = license_type_hash.is_eq(&required_type_hash)?;
        let not_expired = expiration_date.is_gt(&current_date)?;
        let computed = type_matches.and(&not_expired)?;
        computed.enforce_equal(&is_valid)?;
        Ok(())
    }
}

/// `hasAccess = (clearance_level >= required_level)`.
#[derive(Clone)]
pub struct ClearanceLevelCircuit {
    pub clearance_level: u64,
    pub salt: u64,
    pub required_level: u64,
    pub has_access: bool,
}

impl ConstraintSynthesizer<Fr> for ClearanceLevelCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let clearance_level =
            FpVar::<Fr>::new_witness(cs.clone(), || Ok(Fr::from(self.clearance_level)))?;
        let _salt = FpVar::<Fr>::new_witness(cs.clone(), || Ok(Fr::from(self.salt)))?;
        let required_level = FpVar::<Fr>::new_input(cs.clone(), || Ok(Fr::from(self.required_level)))?;
        let has_access = Boolean::new_input(cs, || Ok(self.has_access))?;

        let computed = clearance_level.is_ge(&required_level)?;
        computed.enforce_equal(&has_access)?;
        Ok(())
    }
}

/// `isAuthorized = (role_hash == required_role_hash)`.
#[derive(Clone)]
pub struct RoleAuthorizationCircuit {
    pub role_hash: u64,
    pub salt: u64,
    pub required_role_hash: u64,
    pub is_authorized: bool,
}

impl ConstraintSynthesizer<Fr> for RoleAuthorizationCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let role_hash = FpVar::<Fr>::new_witness(cs.clone(), || Ok(Fr::from(self.role_hash)))?;
        let _salt = FpVar::<Fr>::new_witness(cs.clone(), || Ok(Fr::from(self.salt)))?;
        let required_role_hash =
            FpVar::<Fr>::new_input(cs.clone(), || Ok(Fr::from(self.required_role_hash)))?;
        let is_authorized = Boolean::new_input(cs, || Ok(self.is_authorized))?;

        let computed = role_hash.is_eq(&required_role_hash)?;
        computed.enforce_equal(&is_authorized)?;
        Ok(())
    }
}
