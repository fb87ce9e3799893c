//! Verification Worker: validates an uploaded contribution and updates the
//! circuit's running averages and completion counters.
//!
//! The actual artifact fetch / crypto call / upload is orchestrated by
//! [`crate::engine::CoordinatorEngine::verify_contribution`]; this module
//! holds the pure parts — the running-average update and the Contribution
//! record assembly — so they can be unit-tested without an artifact store.

use ceremony_primitives::{
    AvgTimings, Circuit, Contribution, ContributionFiles, ContributionId, Participant, ParticipantId, ParticipantStatus,
};

use crate::errors::{CoordinatorError, CoordinatorResult};

/// Guard for `VerifyContribution`: the caller must be the circuit's current
/// contributor, mid-upload-verification.
pub fn require_verifying_contributor(circuit: &Circuit, participant: &Participant) -> CoordinatorResult<()> {
    if circuit.waiting_queue.current_contributor.as_ref() != Some(&participant.id) {
        return Err(CoordinatorError::InvalidRequest(format!("{} is not the current contributor of circuit {}", participant.id, circuit.id)));
    }
    if participant.status != ParticipantStatus::Contributing {
        return Err(CoordinatorError::InvalidRequest("participant is not currently contributing".into()));
    }
    if participant.contribution_step != Some(ceremony_primitives::ContributionStep::Verifying) {
        return Err(CoordinatorError::InvalidRequest("participant has not reached the VERIFYING step".into()));
    }
    Ok(())
}

/// Applies the running-average update used for every `avgTimings` field:
/// `new = (old + sample) / 2` once a prior sample exists, else `sample`.
pub fn update_avg_timings(current: &mut AvgTimings, contribution_computation_millis: i64, verification_millis: i64) {
    current.contribution_computation = AvgTimings::update(current.contribution_computation, contribution_computation_millis);
    current.verify_cloud_function = AvgTimings::update(current.verify_cloud_function, verification_millis);
    current.full_contribution =
        AvgTimings::update(current.full_contribution, contribution_computation_millis + verification_millis);
}

/// Bumps the circuit's completion counters after a contribution has been
/// recorded.
pub fn update_queue_counters(circuit: &mut Circuit, valid: bool) {
    if valid {
        circuit.waiting_queue.completed_contributions += 1;
    } else {
        circuit.waiting_queue.failed_contributions += 1;
    }
}

/// Assembles the Contribution document for a just-verified (or
/// just-rejected) upload.
#[allow(clippy::too_many_arguments)]
pub fn build_contribution(
    id: ContributionId,
    circuit: &Circuit,
    participant_id: ParticipantId,
    zkey_index: String,
    contribution_computation_time: i64,
    verification_computation_time: i64,
    last_zkey_filename: String,
    last_zkey_storage_path: String,
    last_zkey_blake2b_hash: String,
    transcript_filename: String,
    transcript_storage_path: String,
    transcript_blake2b_hash: String,
    valid: bool,
) -> Contribution {
    Contribution {
        id,
        circuit_id: circuit.id.clone(),
        participant_id,
        zkey_index,
        contribution_computation_time,
        verification_computation_time,
        files: ContributionFiles {
            last_zkey_filename,
            last_zkey_storage_path,
            last_zkey_blake2b_hash,
            transcript_filename,
            transcript_storage_path,
            transcript_blake2b_hash,
            verifier_storage_path: None,
            verification_key_storage_path: None,
        },
        valid,
        beacon: None,
    }
}

#[cfg(test)]
mod tests {
    use ceremony_primitives::{CircuitFiles, CircuitMetadata, TimeoutWindow, WaitingQueue};

    use super::*;

    fn circuit_with_queue(current: Option<ParticipantId>) -> Circuit {
        Circuit {
            id: "c1".into(),
            prefix: "c1".into(),
            sequence_position: 1,
            metadata: CircuitMetadata::default(),
            files: CircuitFiles::default(),
            avg_timings: AvgTimings::default(),
            waiting_queue: WaitingQueue { current_contributor: current, ..Default::default() },
            timeout_window: TimeoutWindow::Fixed { window_millis: 60_000 },
        }
    }

    #[test]
    fn guard_rejects_non_current_contributor() {
        let circuit = circuit_with_queue(Some("alice".into()));
        let mut bob = Participant::created("bob".into());
        bob.status = ParticipantStatus::Contributing;
        bob.contribution_step = Some(ceremony_primitives::ContributionStep::Verifying);
        let err = require_verifying_contributor(&circuit, &bob).unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidRequest(_)));
    }

    #[test]
    fn guard_rejects_wrong_step() {
        let circuit = circuit_with_queue(Some("alice".into()));
        let mut alice = Participant::created("alice".into());
        alice.status = ParticipantStatus::Contributing;
        alice.contribution_step = Some(ceremony_primitives::ContributionStep::Uploading);
        let err = require_verifying_contributor(&circuit, &alice).unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidRequest(_)));
    }

    #[test]
    fn guard_accepts_current_contributor_verifying() {
        let circuit = circuit_with_queue(Some("alice".into()));
        let mut alice = Participant::created("alice".into());
        alice.status = ParticipantStatus::Contributing;
        alice.contribution_step = Some(ceremony_primitives::ContributionStep::Verifying);
        require_verifying_contributor(&circuit, &alice).unwrap();
    }

    #[test]
    fn running_average_seeds_from_first_sample() {
        let mut avg = AvgTimings::default();
        update_avg_timings(&mut avg, 10_000, 2_000);
        assert_eq!(avg.contribution_computation, 10_000);
        assert_eq!(avg.verify_cloud_function, 2_000);
        assert_eq!(avg.full_contribution, 12_000);
    }

    #[test]
    fn running_average_halves_the_delta_on_subsequent_samples() {
        let mut avg = AvgTimings::default();
        update_avg_timings(&mut avg, 10_000, 2_000);
        update_avg_timings(&mut avg, 20_000, 4_000);
        assert_eq!(avg.contribution_computation, 15_000);
        assert_eq!(avg.verify_cloud_function, 3_000);
    }

    #[test]
    fn counters_split_on_validity() {
        let mut circuit = circuit_with_queue(None);
        update_queue_counters(&mut circuit, true);
        update_queue_counters(&mut circuit, false);
        assert_eq!(circuit.waiting_queue.completed_contributions, 1);
        assert_eq!(circuit.waiting_queue.failed_contributions, 1);
    }
}
