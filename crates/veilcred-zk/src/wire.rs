//! The on-the-wire `Proof` shape (§6 wire format): a Groth16 blob plus
//! decimal-string public signals, a human-readable statement, and metadata.

use serde::{Deserialize, Serialize};

pub const WIRE_VERSION: &str = "1.0.0";
pub const PROTOCOL: &str = "groth16";
pub const CURVE: &str = "bn128";
pub const MAX_PROOF_SERIALIZED_BYTES: usize = 10 * 1024;
pub const MAX_PUBLIC_SIGNALS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofData {
    pub pi_a: [String; 3],
    pub pi_b: [[String; 2]; 3],
    pub pi_c: [String; 3],
    pub protocol: String,
    pub curve: String,
}

impl ProofData {
    pub fn new(pi_a: [String; 3], pi_b: [[String; 2]; 3], pi_c: [String; 3]) -> Self {
        Self {
            pi_a,
            pi_b,
            pi_c,
            protocol: PROTOCOL.to_string(),
            curve: CURVE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofMetadata {
    pub claim_type: String,
    pub generated_at: i64,
    pub generation_time_ms: i64,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    pub proof: ProofData,
    pub public_signals: Vec<String>,
    pub statement: String,
    pub metadata: ProofMetadata,
}

impl Proof {
    /// Serialized byte size, per the 10 KB hard cap.
    pub fn serialized_size(&self) -> Result<usize, serde_json::Error> {
        Ok(serde_json::to_vec(self)?.len())
    }

    /// The last public signal, the convention every claim kind relies on for
    /// its boolean result.
    pub fn last_public_signal(&self) -> Option<&str> {
        self.public_signals.last().map(|s| s.as_str())
    }

    /// `true` iff the last public signal is the literal string `"1"`.
    pub fn extract_claim_result(&self) -> bool {
        self.last_public_signal() == Some("1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Proof {
        Proof {
            proof: ProofData::new(
                ["1".into(), "2".into(), "3".into()],
                [
                    ["4".into(), "5".into()],
                    ["6".into(), "7".into()],
                    ["8".into(), "9".into()],
                ],
                ["10".into(), "11".into(), "12".into()],
            ),
            public_signals: vec!["42".into(), "1".into()],
            statement: "age is over 18".into(),
            metadata: ProofMetadata {
                claim_type: "ageOver".into(),
                generated_at: 1_700_000_000_000,
                generation_time_ms: 42,
                version: WIRE_VERSION.into(),
            },
        }
    }

    #[test]
    fn extract_claim_result_reads_last_signal() {
        assert!(sample().extract_claim_result());
    }

    #[test]
    fn extract_claim_result_false_when_last_signal_zero() {
        let mut p = sample();
        p.public_signals = vec!["42".into(), "0".into()];
        assert!(!p.extract_claim_result());
    }

    #[test]
    fn serialized_size_is_well_under_10kb_for_small_proofs() {
        assert!(sample().serialized_size().unwrap() < MAX_PROOF_SERIALIZED_BYTES);
    }
}
