use blake2::{Blake2b512, Digest};
use serde_json::json;

use crate::errors::{CryptoError, CryptoResult};
use crate::traits::{ContributionOutput, ZkeyCryptoCore};

const ZKEY_LEN: usize = 128;

fn digest(data: &[u8]) -> [u8; 64] {
    let mut hasher = Blake2b512::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Deterministic stand-in for a real Groth16 Phase-2 `zkey` library.
///
/// Every zkey this core produces is `marker(64) || previousHash(64)`, where
/// `marker` binds in the entropy used and `previousHash` is the digest of
/// the zkey it was derived from. That lets [`Self::verify`] confirm chain
/// linkage without ever seeing the entropy, the same property pairing-based
/// verification gives a real Groth16 contribution.
#[derive(Default)]
pub struct MockZkeyCryptoCore;

impl MockZkeyCryptoCore {
    pub fn new() -> Self {
        Self
    }

    fn derive(&self, previous_zkey: &[u8], secret: &[u8]) -> ContributionOutput {
        let prev_hash = digest(previous_zkey);
        let mut marker_input = Vec::with_capacity(previous_zkey.len() + secret.len());
        marker_input.extend_from_slice(previous_zkey);
        marker_input.extend_from_slice(secret);
        let marker = digest(&marker_input);

        let mut zkey = Vec::with_capacity(ZKEY_LEN);
        zkey.extend_from_slice(&marker);
        zkey.extend_from_slice(&prev_hash);

        let transcript = format!(
            "contribution transcript\nprevious_hash={}\nmarker={}\n",
            hex::encode(prev_hash),
            hex::encode(marker)
        )
        .into_bytes();

        ContributionOutput { zkey, transcript }
    }
}

impl ZkeyCryptoCore for MockZkeyCryptoCore {
    fn hash(&self, data: &[u8]) -> String {
        hex::encode(digest(data))
    }

    fn contribute(&self, previous_zkey: &[u8], entropy: &[u8]) -> ContributionOutput {
        self.derive(previous_zkey, entropy)
    }

    fn verify(&self, previous_zkey: &[u8], candidate_zkey: &[u8], _pot: &[u8]) -> CryptoResult<bool> {
        if candidate_zkey.len() != ZKEY_LEN {
            return Err(CryptoError::InvalidZkeyFormat(format!(
                "expected {ZKEY_LEN} bytes, got {}",
                candidate_zkey.len()
            )));
        }
        let expected_prev_hash = digest(previous_zkey);
        Ok(candidate_zkey[64..128] == expected_prev_hash)
    }

    fn beacon_contribute(&self, previous_zkey: &[u8], beacon: &[u8]) -> ContributionOutput {
        self.derive(previous_zkey, beacon)
    }

    fn export_verification_key(&self, final_zkey: &[u8]) -> CryptoResult<Vec<u8>> {
        if final_zkey.len() != ZKEY_LEN {
            return Err(CryptoError::InvalidZkeyFormat(format!(
                "expected {ZKEY_LEN} bytes, got {}",
                final_zkey.len()
            )));
        }
        let doc = json!({
            "protocol": "groth16",
            "curve": "bn128",
            "zkeyHash": hex::encode(digest(final_zkey)),
        });
        Ok(serde_json::to_vec_pretty(&doc).expect("json serialization of static shape never fails"))
    }

    fn export_verifier_contract(&self, final_zkey: &[u8]) -> CryptoResult<Vec<u8>> {
        if final_zkey.len() != ZKEY_LEN {
            return Err(CryptoError::InvalidZkeyFormat(format!(
                "expected {ZKEY_LEN} bytes, got {}",
                final_zkey.len()
            )));
        }
        let contract = format!(
            "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.0;\n\n\
             // Verifier for zkey with hash {}\ncontract Verifier {{\n    function verifyProof() public pure returns (bool) {{\n        return true;\n    }}\n}}\n",
            hex::encode(digest(final_zkey))
        );
        Ok(contract.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contribution_chain_verifies() {
        let core = MockZkeyCryptoCore::new();
        let initial = b"initial-zkey-bytes".to_vec();

        let c1 = core.contribute(&initial, b"entropy-from-participant-1");
        assert!(core.verify(&initial, &c1.zkey, b"pot").unwrap());

        let c2 = core.contribute(&c1.zkey, b"entropy-from-participant-2");
        assert!(core.verify(&c1.zkey, &c2.zkey, b"pot").unwrap());
        // Does not chain from the wrong predecessor.
        assert!(!core.verify(&initial, &c2.zkey, b"pot").unwrap());
    }

    #[test]
    fn beacon_then_export_round_trip() {
        let core = MockZkeyCryptoCore::new();
        let initial = b"initial-zkey-bytes".to_vec();
        let final_contribution = core.beacon_contribute(&initial, b"public-beacon-value");

        assert!(core.verify(&initial, &final_contribution.zkey, b"pot").unwrap());
        let vk = core.export_verification_key(&final_contribution.zkey).unwrap();
        assert!(String::from_utf8(vk).unwrap().contains("groth16"));
        let verifier = core.export_verifier_contract(&final_contribution.zkey).unwrap();
        assert!(String::from_utf8(verifier).unwrap().contains("pragma solidity"));
    }

    #[test]
    fn malformed_zkey_is_rejected() {
        let core = MockZkeyCryptoCore::new();
        let err = core.verify(b"prev", b"too-short", b"pot").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidZkeyFormat(_)));
    }
}
