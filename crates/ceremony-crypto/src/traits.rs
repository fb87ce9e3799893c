//! The cryptographic core boundary.
//!
//! The ceremony coordination engine never redefines Groth16 Phase-2
//! arithmetic; it treats `zkey` contribution, verification, and export as a
//! pure-function library it calls into. [`MockZkeyCryptoCore`] stands in for
//! that library so the rest of the engine — queueing, timeouts, the upload
//! protocol, finalization — can be built and tested without linking a real
//! SNARK toolchain.

use crate::errors::CryptoResult;

/// One contribution's output: the updated zkey bytes and a human-readable
/// transcript a verifier (or auditor) can inspect.
pub struct ContributionOutput {
    pub zkey: Vec<u8>,
    pub transcript: Vec<u8>,
}

pub trait ZkeyCryptoCore: Send + Sync {
    /// BLAKE2b-512 digest of `data`, hex-encoded. Used for the `*BlakeHash`
    /// fields recorded on circuits and contributions.
    fn hash(&self, data: &[u8]) -> String;

    /// Applies `entropy` to `previous_zkey`, producing the next zkey in the
    /// chain and a transcript of the operation.
    fn contribute(&self, previous_zkey: &[u8], entropy: &[u8]) -> ContributionOutput;

    /// Verifies that `candidate_zkey` is a valid descendant of
    /// `previous_zkey` under the powers-of-tau file `pot`, without requiring
    /// the entropy used to produce it.
    fn verify(&self, previous_zkey: &[u8], candidate_zkey: &[u8], pot: &[u8]) -> CryptoResult<bool>;

    /// The deterministic "beacon" contribution run once per circuit during
    /// finalization, using a public random value instead of participant
    /// entropy.
    fn beacon_contribute(&self, previous_zkey: &[u8], beacon: &[u8]) -> ContributionOutput;

    /// Exports the verification key JSON for a finalized zkey.
    fn export_verification_key(&self, final_zkey: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Exports the Solidity verifier contract for a finalized zkey.
    fn export_verifier_contract(&self, final_zkey: &[u8]) -> CryptoResult<Vec<u8>>;
}
