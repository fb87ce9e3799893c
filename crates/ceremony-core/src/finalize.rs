//! Finalization: the coordinator's beacon contribution and ceremony
//! close-out.

use ceremony_primitives::{Ceremony, CeremonyState, Circuit, Contribution, ContributionFiles, ContributionId, FINAL_ZKEY_INDEX};

use crate::errors::{CoordinatorError, CoordinatorResult};

/// Guard for `FinalizeCircuit`: the ceremony must be `CLOSED`.
pub fn require_closed(ceremony: &Ceremony) -> CoordinatorResult<()> {
    if ceremony.state != CeremonyState::Closed {
        return Err(CoordinatorError::CeremonyNotClosed);
    }
    Ok(())
}

/// Assembles the `"final"` Contribution document for a circuit's beacon
/// contribution.
#[allow(clippy::too_many_arguments)]
pub fn build_final_contribution(
    id: ContributionId,
    circuit: &Circuit,
    coordinator_id: impl Into<ceremony_primitives::ParticipantId>,
    beacon_hex: String,
    last_zkey_filename: String,
    last_zkey_storage_path: String,
    last_zkey_blake2b_hash: String,
    transcript_filename: String,
    transcript_storage_path: String,
    transcript_blake2b_hash: String,
    verifier_storage_path: String,
    verification_key_storage_path: String,
) -> Contribution {
    Contribution {
        id,
        circuit_id: circuit.id.clone(),
        participant_id: coordinator_id.into(),
        zkey_index: FINAL_ZKEY_INDEX.to_string(),
        contribution_computation_time: 0,
        verification_computation_time: 0,
        files: ContributionFiles {
            last_zkey_filename,
            last_zkey_storage_path,
            last_zkey_blake2b_hash,
            transcript_filename,
            transcript_storage_path,
            transcript_blake2b_hash,
            verifier_storage_path: Some(verifier_storage_path),
            verification_key_storage_path: Some(verification_key_storage_path),
        },
        valid: true,
        beacon: Some(beacon_hex),
    }
}

/// `FinalizeCeremony`'s invariant: every circuit must carry exactly one
/// valid `"final"` contribution before the ceremony may flip to `FINALIZED`.
pub fn all_circuits_finalized(circuits: &[Circuit], contributions_by_circuit: &[Vec<Contribution>]) -> bool {
    circuits.iter().zip(contributions_by_circuit.iter()).all(|(_circuit, contributions)| {
        contributions.iter().filter(|c| c.is_final() && c.valid).count() == 1
    })
}

#[cfg(test)]
mod tests {
    use ceremony_primitives::{AvgTimings, CircuitFiles, CircuitMetadata, TimeoutWindow, WaitingQueue};

    use super::*;

    fn sample_circuit(id: &str) -> Circuit {
        Circuit {
            id: id.into(),
            prefix: id.into(),
            sequence_position: 1,
            metadata: CircuitMetadata::default(),
            files: CircuitFiles::default(),
            avg_timings: AvgTimings::default(),
            waiting_queue: WaitingQueue::default(),
            timeout_window: TimeoutWindow::Fixed { window_millis: 1_000 },
        }
    }

    fn sample_final_contribution(circuit_id: &str, valid: bool) -> Contribution {
        Contribution {
            id: "final1".into(),
            circuit_id: circuit_id.into(),
            participant_id: "coord".into(),
            zkey_index: FINAL_ZKEY_INDEX.to_string(),
            contribution_computation_time: 0,
            verification_computation_time: 0,
            files: ContributionFiles::default(),
            valid,
            beacon: Some("beacon".into()),
        }
    }

    #[test]
    fn requires_closed_ceremony() {
        let mut ceremony = Ceremony {
            id: "c".into(),
            prefix: "p".into(),
            title: "t".into(),
            description: "d".into(),
            start_date: 0,
            end_date: 1_000,
            state: CeremonyState::Opened,
            ceremony_type: ceremony_primitives::CeremonyType::Phase2,
            coordinator_id: "coord".into(),
            timeout_mechanism_type: ceremony_primitives::TimeoutMechanismType::Fixed,
            penalty: 60,
        };
        assert!(require_closed(&ceremony).is_err());
        ceremony.state = CeremonyState::Closed;
        assert!(require_closed(&ceremony).is_ok());
    }

    #[test]
    fn ceremony_finalizes_only_when_every_circuit_has_one_valid_final() {
        let circuits = vec![sample_circuit("c1"), sample_circuit("c2")];
        let complete = vec![vec![sample_final_contribution("c1", true)], vec![sample_final_contribution("c2", true)]];
        assert!(all_circuits_finalized(&circuits, &complete));

        let missing = vec![vec![sample_final_contribution("c1", true)], vec![]];
        assert!(!all_circuits_finalized(&circuits, &missing));

        let invalid = vec![vec![sample_final_contribution("c1", true)], vec![sample_final_contribution("c2", false)]];
        assert!(!all_circuits_finalized(&circuits, &invalid));
    }
}
