use serde::{Deserialize, Serialize};

use crate::ids::{CircuitId, ContributionId, ParticipantId};

/// The literal index reserved for a finalization ("beacon") contribution.
pub const FINAL_ZKEY_INDEX: &str = "final";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContributionFiles {
    pub last_zkey_filename: String,
    pub last_zkey_storage_path: String,
    pub last_zkey_blake2b_hash: String,
    pub transcript_filename: String,
    pub transcript_storage_path: String,
    pub transcript_blake2b_hash: String,
    /// Only populated for the final ("beacon") contribution.
    pub verifier_storage_path: Option<String>,
    pub verification_key_storage_path: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contribution {
    pub id: ContributionId,
    pub circuit_id: CircuitId,
    pub participant_id: ParticipantId,
    /// Left-zero-padded decimal counter, or the literal `"final"`.
    pub zkey_index: String,
    pub contribution_computation_time: i64,
    pub verification_computation_time: i64,
    pub files: ContributionFiles,
    pub valid: bool,
    /// Public randomness used only by the final, beacon contribution.
    pub beacon: Option<String>,
}

impl Contribution {
    pub fn is_final(&self) -> bool {
        self.zkey_index == FINAL_ZKEY_INDEX
    }
}

/// Left-zero-pads `index` to `width` decimal digits.
///
/// `width` is driven by the configured `FIRST_ZKEY_INDEX` knob: per the
/// source this was distilled from, its *length* is the width, not its
/// numeric value.
pub fn format_zkey_index(index: u64, width: usize) -> String {
    format!("{index:0width$}", width = width)
}

/// Inverse of [`format_zkey_index`]. Returns `None` if `formatted` is not a
/// plain decimal (e.g. it is the literal `"final"`).
pub fn parse_zkey_index(formatted: &str) -> Option<u64> {
    formatted.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_and_parse_round_trip() {
        for k in 0..10_000u64 {
            let formatted = format_zkey_index(k, 5);
            assert_eq!(formatted.len(), 5);
            assert_eq!(parse_zkey_index(&formatted), Some(k));
        }
    }

    #[test]
    fn format_pads_with_zeros() {
        assert_eq!(format_zkey_index(7, 5), "00007");
        assert_eq!(format_zkey_index(123, 5), "00123");
    }

    #[test]
    fn parse_rejects_final_literal() {
        assert_eq!(parse_zkey_index(FINAL_ZKEY_INDEX), None);
    }
}
