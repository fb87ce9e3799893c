use serde::{Deserialize, Serialize};

use crate::{
    ceremony::MillisTimestamp,
    ids::{CeremonyId, CircuitId, ParticipantId},
};

/// Finalization artifact handed to the (external) attestation publisher
/// after a circuit's beacon contribution is accepted. A failure to publish
/// this is logged and surfaced separately; it never rolls back ceremony
/// state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttestationRecord {
    pub ceremony_id: CeremonyId,
    pub circuit_id: CircuitId,
    pub last_zkey_blake2b_hash: String,
    pub contributors_ordered: Vec<ParticipantId>,
    pub published_at: MillisTimestamp,
}
