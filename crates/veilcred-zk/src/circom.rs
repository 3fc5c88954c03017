//! Per-claim Circom source text.
//!
//! These strings are the authoritative specification of each circuit for a
//! trusted-setup ceremony; they are not parsed, compiled, or executed by
//! this crate. The in-process [`crate::circuits`] are the Rust-native
//! equivalent actually exercised by [`crate::groth`].

pub const AGE_OVER_CIRCOM: &str = r#"
pragma circom 2.0.0;

template AgeOver() {
    signal input age;
    signal input salt;
    signal input threshold;
    signal output isOver;

    component gte = GreaterEqThan(8);
    gte.in[0] <== age;
    gte.in[1] <== threshold;
    isOver <== gte.out;
}

component main {public [threshold]} = AgeOver();
"#;

pub const LICENSE_VALID_CIRCOM: &str = r#"
pragma circom 2.0.0;

template LicenseValid() {
    signal input licenseTypeHash;
    signal input expirationDate;
    signal input salt;
    signal input requiredTypeHash;
    signal input currentDate;
    signal output isValid;

    component eq = IsEqual();
    eq.in[0] <== licenseTypeHash;
    eq.in[1] <== requiredTypeHash;

    component gt = GreaterThan(40);
    gt.in[0] <== expirationDate;
    gt.in[1] <== currentDate;

    isValid <== eq.out * gt.out;
}

component main {public [requiredTypeHash, currentDate]} = LicenseValid();
"#;

pub const CLEARANCE_LEVEL_CIRCOM: &str = r#"
pragma circom 2.0.0;

template ClearanceLevel() {
    signal input clearanceLevel;
    signal input salt;
    signal input requiredLevel;
    signal output hasAccess;

    component gte = GreaterEqThan(4);
    gte.in[0] <== clearanceLevel;
    gte.in[1] <== requiredLevel;
    hasAccess <== gte.out;
}

component main {public [requiredLevel]} = ClearanceLevel();
"#;

pub const ROLE_AUTHORIZATION_CIRCOM: &str = r#"
pragma circom 2.0.0;

template RoleAuthorization() {
    signal input roleHash;
    signal input salt;
    signal input requiredRoleHash;
    signal output isAuthorized;

    component eq = IsEqual();
    eq.in[0] <== roleHash;
    eq.in[1] <== requiredRoleHash;
    isAuthorized <== eq.out;
}

component main {public [requiredRoleHash]} = RoleAuthorization();
"#;

/// Look up the Circom source for a circuit by the name returned from
/// `ClaimStatement::circuit_name`.
pub fn source_for(circuit_name: &str) -> Option<&'static str> {
    match circuit_name {
        "ageOver" => Some(AGE_OVER_CIRCOM),
        "licenseValid" => Some(LICENSE_VALID_CIRCOM),
        "clearanceLevel" => Some(CLEARANCE_LEVEL_CIRCOM),
        "roleAuthorization" => Some(ROLE_AUTHORIZATION_CIRCOM),
        _ => None,
    }
}
