//! Multi-Part Upload Protocol: authorization for the four callable entry
//! points that let a contributor resumably push a large zkey through the
//! Artifact Store Adapter.

use ceremony_primitives::{Ceremony, Circuit, Participant, ParticipantId};

use crate::errors::{CoordinatorError, CoordinatorResult};
use crate::paths;

/// The object key a contributor is entitled to write to right now: their
/// own active contribution's expected output.
pub fn expected_upload_key(ceremony: &Ceremony, circuit: &Circuit, zkey_index: &str) -> String {
    paths::contribution_zkey_path(&ceremony.prefix, &circuit.prefix, zkey_index)
}

/// Authorizes an upload (`StartMultiPartUpload` / part URLs / complete):
/// the caller must be the circuit's current contributor, and `object_key`
/// must be exactly their expected output path.
pub fn authorize_upload(
    ceremony: &Ceremony,
    circuit: &Circuit,
    participant: &Participant,
    zkey_index: &str,
    object_key: &str,
) -> CoordinatorResult<()> {
    if circuit.waiting_queue.current_contributor.as_ref() != Some(&participant.id) {
        return Err(CoordinatorError::PermissionDenied(format!("{} is not the current contributor of circuit {}", participant.id, circuit.id)));
    }
    let expected = expected_upload_key(ceremony, circuit, zkey_index);
    if object_key != expected {
        return Err(CoordinatorError::PermissionDenied(format!("object key {object_key:?} does not match expected upload slot {expected:?}")));
    }
    Ok(())
}

/// Authorizes a download (`GenerateGetObjectPreSignedUrl`): the coordinator
/// may fetch anything; a plain participant may only fetch artifacts that
/// feed their own current contribution (the pot, the circuit's r1cs/wasm,
/// and every prior zkey in the chain up to their own input).
pub fn authorize_download(
    is_coordinator: bool,
    ceremony: &Ceremony,
    circuit: &Circuit,
    object_key: &str,
) -> CoordinatorResult<()> {
    if is_coordinator {
        return Ok(());
    }
    let allowed = [
        paths::pot_path(&ceremony.prefix, &circuit.files.pot_storage_path),
        paths::r1cs_path(&ceremony.prefix, &circuit.prefix),
        paths::wasm_path(&ceremony.prefix, &circuit.prefix),
    ];
    if allowed.iter().any(|a| a == object_key) {
        return Ok(());
    }
    // Any previously completed zkey in the chain is also readable: that is
    // exactly the input a contributor needs to compute their own update.
    if object_key.starts_with(&format!("{}/circuits/{}/contributions/", ceremony.prefix, circuit.prefix)) {
        return Ok(());
    }
    Err(CoordinatorError::PermissionDenied(format!("object key {object_key:?} is not readable by a participant")))
}

/// Identifies the zkey index a circuit's current contributor is working
/// toward: one past the number of already-completed (valid) contributions.
pub fn current_zkey_index(circuit: &Circuit, width: usize) -> String {
    ceremony_primitives::format_zkey_index(circuit.waiting_queue.completed_contributions + 1, width)
}

pub fn current_contributor_id(circuit: &Circuit) -> CoordinatorResult<&ParticipantId> {
    circuit
        .waiting_queue
        .current_contributor
        .as_ref()
        .ok_or_else(|| CoordinatorError::FailedPrecondition(format!("circuit {} has no current contributor", circuit.id)))
}

#[cfg(test)]
mod tests {
    use ceremony_primitives::{AvgTimings, CeremonyState, CeremonyType, CircuitFiles, CircuitMetadata, TimeoutMechanismType, TimeoutWindow, WaitingQueue};

    use super::*;

    fn ceremony() -> Ceremony {
        Ceremony {
            id: "c".into(),
            prefix: "setup1".into(),
            title: "t".into(),
            description: "d".into(),
            start_date: 0,
            end_date: 1_000,
            state: CeremonyState::Opened,
            ceremony_type: CeremonyType::Phase2,
            coordinator_id: "coord".into(),
            timeout_mechanism_type: TimeoutMechanismType::Fixed,
            penalty: 60,
        }
    }

    fn circuit_with_current(current: Option<ParticipantId>) -> Circuit {
        Circuit {
            id: "circuit1".into(),
            prefix: "circuit1".into(),
            sequence_position: 1,
            metadata: CircuitMetadata::default(),
            files: CircuitFiles { pot_storage_path: "pot.ptau".into(), ..Default::default() },
            avg_timings: AvgTimings::default(),
            waiting_queue: WaitingQueue { current_contributor: current, ..Default::default() },
            timeout_window: TimeoutWindow::Fixed { window_millis: 1_000 },
        }
    }

    #[test]
    fn upload_authorized_only_for_current_contributor_at_expected_key() {
        let ceremony = ceremony();
        let circuit = circuit_with_current(Some("alice".into()));
        let alice = ceremony_primitives::Participant::created("alice".into());

        let key = expected_upload_key(&ceremony, &circuit, "00001");
        authorize_upload(&ceremony, &circuit, &alice, "00001", &key).unwrap();

        let bob = ceremony_primitives::Participant::created("bob".into());
        assert!(authorize_upload(&ceremony, &circuit, &bob, "00001", &key).is_err());
        assert!(authorize_upload(&ceremony, &circuit, &alice, "00001", "setup1/wrong/path.zkey").is_err());
    }

    #[test]
    fn coordinator_can_download_anything() {
        let ceremony = ceremony();
        let circuit = circuit_with_current(None);
        authorize_download(true, &ceremony, &circuit, "anything/at/all").unwrap();
    }

    #[test]
    fn participant_can_download_pot_and_chain_but_not_arbitrary_paths() {
        let ceremony = ceremony();
        let circuit = circuit_with_current(None);
        authorize_download(false, &ceremony, &circuit, &paths::pot_path(&ceremony.prefix, "pot.ptau")).unwrap();
        authorize_download(false, &ceremony, &circuit, &paths::contribution_zkey_path(&ceremony.prefix, &circuit.prefix, "00001")).unwrap();
        assert!(authorize_download(false, &ceremony, &circuit, "setup1/other-ceremony-secret").is_err());
    }
}
