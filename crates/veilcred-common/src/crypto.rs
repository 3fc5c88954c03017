//! C1 — cryptographic primitives.
//!
//! Every operation here fails fast with a typed [`CryptoError`]; none of
//! them fall back to a weaker behavior on error the way ad-hoc scripts do.

use hkdf::Hkdf;
use rand_core::{OsRng, RngCore};
use sha2::Sha256;
use sha3::{Digest, Sha3_256};
use zeroize::Zeroize;

use crate::error::CryptoError;

const MIN_ENTROPY_BITS_PER_BYTE: f64 = 7.5;
const MAX_RANDOM_BYTES: usize = 1024;
const MAX_HKDF_OUTPUT: usize = 255 * 32;
const MAX_POW_ITERATIONS: u64 = 10_000_000;

/// Length-independent byte comparison. Unequal-length inputs are still
/// compared byte-by-byte over a padded buffer the size of the longer input,
/// and the function never returns early on the first differing byte — the
/// only branch is the final boolean reduction.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let max_len = a.len().max(b.len());
    let len_differs = a.len() != b.len();
    let mut diff: u8 = 0;
    for i in 0..max_len {
        let ai = a.get(i).copied().unwrap_or(0);
        let bi = b.get(i).copied().unwrap_or(0);
        diff |= ai ^ bi;
    }
    diff == 0 && !len_differs
}

/// Shannon entropy of a byte slice, in bits/byte.
fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0u32; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let len = data.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Draw `n` cryptographically-random bytes, `1 <= n <= 1024`, rejecting the
/// draw if its measured Shannon entropy falls below 7.5 bits/byte.
pub fn secure_random(n: usize) -> Result<Vec<u8>, CryptoError> {
    if n == 0 || n > MAX_RANDOM_BYTES {
        return Err(CryptoError::InvalidInput(format!(
            "secure_random length {n} out of range [1, {MAX_RANDOM_BYTES}]"
        )));
    }
    let mut buf = vec![0u8; n];
    OsRng.fill_bytes(&mut buf);
    let measured = shannon_entropy(&buf);
    if measured < MIN_ENTROPY_BITS_PER_BYTE {
        log::warn!("secure_random entropy shortfall: {measured:.3} bits/byte for {n} bytes");
        return Err(CryptoError::Entropy {
            measured,
            required: MIN_ENTROPY_BITS_PER_BYTE,
        });
    }
    Ok(buf)
}

/// SHA3-256 of `x`, returned as lowercase hex.
pub fn hash(x: &[u8]) -> String {
    let digest = Sha3_256::digest(x);
    hex::encode(digest)
}

/// HKDF-extract-then-expand per RFC 5869 with SHA-256.
pub fn hkdf(master: &[u8], salt: &[u8], info: &[u8], len: usize) -> Result<Vec<u8>, CryptoError> {
    if master.len() < 32 {
        return Err(CryptoError::InvalidInput(
            "hkdf master key must be at least 32 bytes".into(),
        ));
    }
    if len > MAX_HKDF_OUTPUT {
        return Err(CryptoError::HkdfLengthExceeded {
            requested: len,
            max: MAX_HKDF_OUTPUT,
        });
    }
    let hk = Hkdf::<Sha256>::new(Some(salt), master);
    let mut okm = vec![0u8; len];
    hk.expand(info, &mut okm)
        .map_err(|_| CryptoError::HkdfLengthExceeded {
            requested: len,
            max: MAX_HKDF_OUTPUT,
        })?;
    Ok(okm)
}

/// One argument to [`deterministic_hash`]'s canonical encoding.
#[derive(Debug, Clone)]
pub enum DetArg<'a> {
    Int(u64),
    Str(&'a str),
}

/// Canonical, deterministic hash used by the sparse Merkle tree: integers
/// encode as 16 hex chars (8 bytes, big-endian), strings as their raw UTF-8
/// bytes, concatenated in argument order and hashed with SHA3-256.
pub fn deterministic_hash(args: &[DetArg<'_>]) -> String {
    let mut buf = Vec::new();
    for arg in args {
        match arg {
            DetArg::Int(v) => buf.extend_from_slice(&v.to_be_bytes()),
            DetArg::Str(s) => buf.extend_from_slice(s.as_bytes()),
        }
    }
    hash(&buf)
}

/// A Pedersen-style hash commitment: `h = sha3(v || blinding)`. Generates a
/// fresh 32-byte blinding factor when none is supplied.
pub fn commitment(v: &[u8], blinding: Option<[u8; 32]>) -> Result<(String, [u8; 32]), CryptoError> {
    let blinding = match blinding {
        Some(b) => b,
        None => {
            let random = secure_random(32)?;
            let mut out = [0u8; 32];
            out.copy_from_slice(&random);
            out
        }
    };
    let mut buf = Vec::with_capacity(v.len() + 32);
    buf.extend_from_slice(v);
    buf.extend_from_slice(&blinding);
    Ok((hash(&buf), blinding))
}

/// Verify a commitment produced by [`commitment`] in constant time.
pub fn verify_commitment(v: &[u8], blinding: &[u8; 32], h: &str) -> bool {
    let mut buf = Vec::with_capacity(v.len() + 32);
    buf.extend_from_slice(v);
    buf.extend_from_slice(blinding);
    let expected = hash(&buf);
    constant_time_eq(expected.as_bytes(), h.as_bytes())
}

/// Overwrite `buf` with random bytes, then zero it. The random pass plus the
/// `zeroize` crate's volatile write defeats dead-store elimination that
/// would otherwise drop a plain `buf.fill(0)`.
pub fn secure_zero(buf: &mut [u8]) {
    if !buf.is_empty() {
        OsRng.fill_bytes(buf);
    }
    buf.zeroize();
}

/// Find a 16-hex-char (8-byte) nonce such that
/// `hash(challenge || nonce)` has `difficulty` leading hex zeros, bounded to
/// 10^7 attempts.
pub fn proof_of_work(challenge: &[u8], difficulty: u32) -> Result<String, CryptoError> {
    if !(1..=32).contains(&difficulty) {
        return Err(CryptoError::InvalidInput(format!(
            "proof_of_work difficulty {difficulty} out of range [1, 32]"
        )));
    }
    let prefix: String = std::iter::repeat('0').take(difficulty as usize).collect();
    for nonce in 0..MAX_POW_ITERATIONS {
        let nonce_hex = format!("{nonce:016x}");
        let mut buf = Vec::with_capacity(challenge.len() + 8);
        buf.extend_from_slice(challenge);
        buf.extend_from_slice(&nonce.to_be_bytes());
        let digest = hash(&buf);
        if digest.starts_with(&prefix) {
            return Ok(nonce_hex);
        }
    }
    Err(CryptoError::WorkExhausted(MAX_POW_ITERATIONS))
}
