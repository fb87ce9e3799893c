//! Canonical object-store paths, relative to a ceremony's bucket.
//!
//! Bit-exact layout per the external interfaces table: every artifact a
//! circuit produces or consumes lives at one of these paths, namespaced by
//! ceremony prefix and then circuit prefix.

pub fn pot_path(ceremony_prefix: &str, pot_filename: &str) -> String {
    format!("{ceremony_prefix}/ptau/{pot_filename}")
}

pub fn r1cs_path(ceremony_prefix: &str, circuit_prefix: &str) -> String {
    format!("{ceremony_prefix}/circuits/{circuit_prefix}/{circuit_prefix}.r1cs")
}

pub fn wasm_path(ceremony_prefix: &str, circuit_prefix: &str) -> String {
    format!("{ceremony_prefix}/circuits/{circuit_prefix}/{circuit_prefix}.wasm")
}

/// The zkey produced by the contribution at `zkey_index` (a left-zero-padded
/// counter, or the literal `"final"`). `"00000"` is the circuit's initial
/// zkey, seeded at setup time.
pub fn contribution_zkey_path(ceremony_prefix: &str, circuit_prefix: &str, zkey_index: &str) -> String {
    format!("{ceremony_prefix}/circuits/{circuit_prefix}/contributions/{circuit_prefix}_{zkey_index}.zkey")
}

pub fn transcript_path(ceremony_prefix: &str, circuit_prefix: &str, zkey_index: &str, gh_username: &str) -> String {
    format!(
        "{ceremony_prefix}/circuits/{circuit_prefix}/transcripts/{circuit_prefix}_{zkey_index}_{gh_username}_verification_transcript.log"
    )
}

pub fn verification_key_path(ceremony_prefix: &str, circuit_prefix: &str) -> String {
    format!("{ceremony_prefix}/circuits/{circuit_prefix}/{circuit_prefix}_verification_key.json")
}

pub fn verifier_contract_path(ceremony_prefix: &str, circuit_prefix: &str) -> String {
    format!("{ceremony_prefix}/circuits/{circuit_prefix}/{circuit_prefix}_verifier.sol")
}

/// The bucket a ceremony's artifacts live in. Kept distinct from the
/// ceremony prefix (which still appears at the head of every object key)
/// so multiple ceremonies could in principle share a bucket namespace.
pub fn bucket_name(ceremony_prefix: &str) -> String {
    format!("ceremony-{ceremony_prefix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_match_canonical_layout() {
        assert_eq!(pot_path("setup1", "pot.ptau"), "setup1/ptau/pot.ptau");
        assert_eq!(r1cs_path("setup1", "circuitA"), "setup1/circuits/circuitA/circuitA.r1cs");
        assert_eq!(
            contribution_zkey_path("setup1", "circuitA", "00001"),
            "setup1/circuits/circuitA/contributions/circuitA_00001.zkey"
        );
        assert_eq!(
            transcript_path("setup1", "circuitA", "00001", "alice"),
            "setup1/circuits/circuitA/transcripts/circuitA_00001_alice_verification_transcript.log"
        );
        assert_eq!(
            verification_key_path("setup1", "circuitA"),
            "setup1/circuits/circuitA/circuitA_verification_key.json"
        );
        assert_eq!(verifier_contract_path("setup1", "circuitA"), "setup1/circuits/circuitA/circuitA_verifier.sol");
    }
}
