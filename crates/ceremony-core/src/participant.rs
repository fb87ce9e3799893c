//! Participant State Machine: join, per-circuit step advancement, and
//! timeout resumption. These are pure mutators over already-loaded
//! documents, in the same style as [`crate::queue`] — the engine wraps each
//! call in a Record Store batch alongside whatever Circuit mutation it also
//! requires.

use ceremony_primitives::{
    Ceremony, ContributionId, ContributionStep, MillisTimestamp, Participant, ParticipantId, ParticipantStatus,
    TempContributionData, Timeout,
};

use crate::errors::{CoordinatorError, CoordinatorResult};

/// Outcome of [`check_participant_for_ceremony`].
pub struct CheckOutcome {
    pub participant: Participant,
    pub eligible: bool,
    /// Set when the participant document did not exist before this call.
    /// The engine uses this to decide whether to run the Queue Manager's
    /// first `Enqueue` for circuit 0.
    pub newly_created: bool,
}

/// `CheckParticipantForCeremony`. `active_timeout` must already be filtered
/// by the caller to only a timeout with `endDate > now` (see
/// [`ceremony_db::RecordStore::active_timeout`]).
pub fn check_participant_for_ceremony(
    ceremony: &Ceremony,
    existing: Option<Participant>,
    active_timeout: Option<&Timeout>,
    user_id: &ParticipantId,
) -> CoordinatorResult<CheckOutcome> {
    if !ceremony.is_open() {
        return Err(CoordinatorError::CeremonyNotOpened);
    }

    let Some(mut participant) = existing else {
        return Ok(CheckOutcome { participant: Participant::created(user_id.clone()), eligible: true, newly_created: true });
    };

    if matches!(participant.status, ParticipantStatus::Done | ParticipantStatus::Finalized) {
        return Ok(CheckOutcome { participant, eligible: false, newly_created: false });
    }
    if participant.status == ParticipantStatus::Contributing {
        return Ok(CheckOutcome { participant, eligible: false, newly_created: false });
    }
    if active_timeout.is_some() {
        return Ok(CheckOutcome { participant, eligible: false, newly_created: false });
    }

    // No active timeout. A participant sitting in TIMEDOUT with an expired
    // timeout is exhumed here; a later `ResumeContributionAfterTimeoutExpiration`
    // call moves them the rest of the way to READY and re-enqueues them.
    if participant.status == ParticipantStatus::TimedOut {
        participant.status = ParticipantStatus::Exhumed;
    }

    Ok(CheckOutcome { participant, eligible: true, newly_created: false })
}

/// `ResumeContributionAfterTimeoutExpiration`: `EXHUMED -> READY`. The
/// engine follows this with a Queue Manager `Enqueue` for the participant's
/// current circuit, at the tail.
pub fn resume_after_timeout_expiration(participant: &mut Participant) -> CoordinatorResult<()> {
    if participant.status != ParticipantStatus::Exhumed {
        return Err(CoordinatorError::FailedPrecondition(format!(
            "participant {} has no expired timeout to resume from (status={:?})",
            participant.id, participant.status
        )));
    }
    participant.status = ParticipantStatus::Ready;
    Ok(())
}

/// `ProgressToNextCircuitForContribution` (and its resume variant):
/// prepares a participant with no circuit-specific work in flight — freshly
/// joined, or just exhumed — to be handed to the Queue Manager for their
/// next circuit (`contributionProgress`). The engine follows this with
/// [`crate::queue::enqueue`].
pub fn progress_to_next_circuit_for_contribution(participant: &mut Participant) -> CoordinatorResult<()> {
    if !matches!(participant.status, ParticipantStatus::Created | ParticipantStatus::Ready) {
        return Err(CoordinatorError::FailedPrecondition(format!(
            "participant {} is not ready to progress to the next circuit (status={:?})",
            participant.id, participant.status
        )));
    }
    participant.status = ParticipantStatus::Ready;
    participant.contribution_step = None;
    Ok(())
}

pub enum StepOutcome {
    /// Ordinary sub-step advance within the current circuit.
    Advanced,
    /// This was the last circuit; the participant is now fully `DONE`.
    Finished,
}

/// `ProgressToNextContributionStep`.
///
/// Advances `DOWNLOADING -> COMPUTING -> UPLOADING -> VERIFYING` while the
/// participant is `CONTRIBUTING`. `VERIFYING` is a dead end here — only
/// [`crate::verification`] may resolve it. Once the participant has
/// finished every circuit (`status == CONTRIBUTED`), a further call closes
/// the ceremony out for them: `contributionProgress` takes its final `+1`
/// and `status` becomes `DONE`.
pub fn advance_contribution_step(participant: &mut Participant, num_circuits: u32) -> CoordinatorResult<StepOutcome> {
    match participant.status {
        ParticipantStatus::Contributed => {
            if participant.contribution_progress != num_circuits {
                return Err(CoordinatorError::FailedPrecondition(
                    "contribution progress does not match a fully-contributed participant".into(),
                ));
            }
            participant.contribution_progress += 1;
            participant.status = ParticipantStatus::Done;
            participant.contribution_step = Some(ContributionStep::Completed);
            Ok(StepOutcome::Finished)
        }
        ParticipantStatus::Contributing => {
            let next = match participant.contribution_step {
                None => ContributionStep::Downloading,
                Some(ContributionStep::Downloading) => ContributionStep::Computing,
                Some(ContributionStep::Computing) => ContributionStep::Uploading,
                Some(ContributionStep::Uploading) => ContributionStep::Verifying,
                Some(ContributionStep::Verifying) => {
                    return Err(CoordinatorError::FailedPrecondition(
                        "verification is owned by the server; call verifyContribution instead".into(),
                    ));
                }
                Some(ContributionStep::Completed) => {
                    return Err(CoordinatorError::FailedPrecondition("this circuit's contribution is already completed".into()));
                }
            };
            participant.contribution_step = Some(next);
            Ok(StepOutcome::Advanced)
        }
        other => Err(CoordinatorError::FailedPrecondition(format!("participant is not contributing (status={other:?})"))),
    }
}

/// `TemporaryStoreUploadId`.
pub fn store_upload_id(participant: &mut Participant, upload_id: String) -> CoordinatorResult<()> {
    require_uploading(participant)?;
    participant.temp_contribution_data.upload_id = Some(upload_id);
    Ok(())
}

/// `TemporaryStoreChunkData`: records one `{ETag, PartNumber}` after a
/// successful part PUT. Idempotent on the same part number (a retried PUT
/// overwrites, it does not duplicate).
pub fn store_chunk_data(participant: &mut Participant, e_tag: String, part_number: u32) -> CoordinatorResult<()> {
    require_uploading(participant)?;
    let chunks = &mut participant.temp_contribution_data.chunks;
    if let Some(existing) = chunks.iter_mut().find(|c| c.part_number == part_number) {
        existing.e_tag = e_tag;
    } else {
        chunks.push(ceremony_primitives::UploadedChunk { e_tag, part_number });
    }
    Ok(())
}

/// `PermanentlyStoreCurrentContributionTimeAndHash`: records the
/// client-measured computation time ahead of `VerifyContribution`. The
/// hash is advisory bookkeeping only — the Verification Worker always
/// recomputes it from the downloaded artifact rather than trusting the
/// client.
pub fn store_contribution_time_and_hash(
    participant: &mut Participant,
    computation_time_millis: i64,
    _claimed_hash: String,
) -> CoordinatorResult<()> {
    if participant.status != ParticipantStatus::Contributing {
        return Err(CoordinatorError::FailedPrecondition("participant is not currently contributing".into()));
    }
    participant.temp_contribution_data.contribution_computation_time = Some(computation_time_millis);
    Ok(())
}

fn require_uploading(participant: &Participant) -> CoordinatorResult<()> {
    if participant.status != ParticipantStatus::Contributing {
        return Err(CoordinatorError::FailedPrecondition("participant is not currently contributing".into()));
    }
    Ok(())
}

/// `RefreshParticipantAfterContributionVerification`: the post-write hook
/// that reacts to a freshly created Contribution document. Returns `true`
/// iff the participant has at least one more circuit to attempt (the
/// engine uses this to decide whether to enqueue the next circuit).
pub fn refresh_after_verification(
    participant: &mut Participant,
    contribution_id: ContributionId,
    computation_time: i64,
    hash: String,
    num_circuits: u32,
) -> bool {
    participant.contributions.push(ceremony_primitives::ParticipantContributionRef {
        contribution_id,
        computation_time,
        hash,
    });
    participant.contribution_progress += 1;
    participant.contribution_step = None;
    participant.contribution_started_at = None;
    participant.verification_started_at = None;
    participant.temp_contribution_data = TempContributionData::default();

    let more_remaining = participant.contribution_progress < num_circuits;
    participant.status = if more_remaining { ParticipantStatus::Ready } else { ParticipantStatus::Contributed };
    more_remaining
}

/// Evicts `participant` after a Timeout Controller deadline miss:
/// `CONTRIBUTING -> TIMEDOUT`.
pub fn evict_for_timeout(participant: &mut Participant) {
    participant.status = ParticipantStatus::TimedOut;
    participant.contribution_step = None;
    participant.contribution_started_at = None;
    participant.temp_contribution_data = TempContributionData::default();
}

#[cfg(test)]
mod tests {
    use ceremony_primitives::{CeremonyState, CeremonyType, TimeoutMechanismType, TimeoutType};

    use super::*;

    fn opened_ceremony() -> Ceremony {
        Ceremony {
            id: "c".into(),
            prefix: "setup1".into(),
            title: "t".into(),
            description: "d".into(),
            start_date: 0,
            end_date: 1_000_000,
            state: CeremonyState::Opened,
            ceremony_type: CeremonyType::Phase2,
            coordinator_id: "coord".into(),
            timeout_mechanism_type: TimeoutMechanismType::Dynamic,
            penalty: 60,
        }
    }

    #[test]
    fn join_creates_new_participant_eligible() {
        let ceremony = opened_ceremony();
        let outcome = check_participant_for_ceremony(&ceremony, None, None, &"alice".into()).unwrap();
        assert!(outcome.eligible);
        assert!(outcome.newly_created);
        assert_eq!(outcome.participant.status, ParticipantStatus::Created);
    }

    #[test]
    fn join_rejects_closed_ceremony() {
        let mut ceremony = opened_ceremony();
        ceremony.state = CeremonyState::Closed;
        let err = check_participant_for_ceremony(&ceremony, None, None, &"alice".into()).unwrap_err();
        assert!(matches!(err, CoordinatorError::CeremonyNotOpened));
    }

    #[test]
    fn active_timeout_blocks_rejoin() {
        let ceremony = opened_ceremony();
        let mut participant = Participant::created("alice".into());
        participant.status = ParticipantStatus::TimedOut;
        let timeout = Timeout { id: "t1".into(), start_date: 0, end_date: 10_000, timeout_type: TimeoutType::BlockingContribution };

        let outcome = check_participant_for_ceremony(&ceremony, Some(participant), Some(&timeout), &"alice".into()).unwrap();
        assert!(!outcome.eligible);
        assert_eq!(outcome.participant.status, ParticipantStatus::TimedOut);
    }

    #[test]
    fn expired_timeout_exhumes() {
        let ceremony = opened_ceremony();
        let mut participant = Participant::created("alice".into());
        participant.status = ParticipantStatus::TimedOut;

        let outcome = check_participant_for_ceremony(&ceremony, Some(participant), None, &"alice".into()).unwrap();
        assert!(outcome.eligible);
        assert_eq!(outcome.participant.status, ParticipantStatus::Exhumed);
    }

    #[test]
    fn contributing_participant_is_ineligible_but_unchanged() {
        let ceremony = opened_ceremony();
        let mut participant = Participant::created("alice".into());
        participant.status = ParticipantStatus::Contributing;

        let outcome = check_participant_for_ceremony(&ceremony, Some(participant), None, &"alice".into()).unwrap();
        assert!(!outcome.eligible);
    }

    #[test]
    fn step_advances_through_the_inner_sub_machine() {
        let mut participant = Participant::created("alice".into());
        participant.status = ParticipantStatus::Contributing;

        advance_contribution_step(&mut participant, 2).unwrap();
        assert_eq!(participant.contribution_step, Some(ContributionStep::Downloading));
        advance_contribution_step(&mut participant, 2).unwrap();
        assert_eq!(participant.contribution_step, Some(ContributionStep::Computing));
        advance_contribution_step(&mut participant, 2).unwrap();
        assert_eq!(participant.contribution_step, Some(ContributionStep::Uploading));
        advance_contribution_step(&mut participant, 2).unwrap();
        assert_eq!(participant.contribution_step, Some(ContributionStep::Verifying));

        let err = advance_contribution_step(&mut participant, 2).unwrap_err();
        assert!(matches!(err, CoordinatorError::FailedPrecondition(_)));
    }

    #[test]
    fn closeout_after_last_circuit_reaches_done_at_n_plus_one() {
        let mut participant = Participant::created("alice".into());
        participant.status = ParticipantStatus::Contributed;
        participant.contribution_progress = 1;

        let outcome = advance_contribution_step(&mut participant, 1).unwrap();
        assert!(matches!(outcome, StepOutcome::Finished));
        assert_eq!(participant.status, ParticipantStatus::Done);
        assert_eq!(participant.contribution_progress, 2);
        assert!(participant.is_done(1));
    }

    #[test]
    fn refresh_after_verification_advances_to_ready_when_more_circuits_remain() {
        let mut participant = Participant::created("alice".into());
        participant.status = ParticipantStatus::Contributing;
        participant.contribution_progress = 0;

        let more = refresh_after_verification(&mut participant, "contrib1".into(), 1_000, "hash".into(), 2);
        assert!(more);
        assert_eq!(participant.status, ParticipantStatus::Ready);
        assert_eq!(participant.contribution_progress, 1);
        assert_eq!(participant.contributions.len(), 1);
    }

    #[test]
    fn progress_to_next_circuit_accepts_created_and_ready() {
        let mut created = Participant::created("alice".into());
        progress_to_next_circuit_for_contribution(&mut created).unwrap();
        assert_eq!(created.status, ParticipantStatus::Ready);

        let mut ready = Participant::created("bob".into());
        ready.status = ParticipantStatus::Ready;
        ready.contribution_step = Some(ContributionStep::Completed);
        progress_to_next_circuit_for_contribution(&mut ready).unwrap();
        assert_eq!(ready.status, ParticipantStatus::Ready);
        assert_eq!(ready.contribution_step, None);
    }

    #[test]
    fn progress_to_next_circuit_rejects_mid_contribution() {
        let mut participant = Participant::created("alice".into());
        participant.status = ParticipantStatus::Contributing;
        let err = progress_to_next_circuit_for_contribution(&mut participant).unwrap_err();
        assert!(matches!(err, CoordinatorError::FailedPrecondition(_)));
    }

    #[test]
    fn refresh_after_verification_marks_contributed_when_done() {
        let mut participant = Participant::created("alice".into());
        participant.status = ParticipantStatus::Contributing;
        participant.contribution_progress = 0;

        let more = refresh_after_verification(&mut participant, "contrib1".into(), 1_000, "hash".into(), 1);
        assert!(!more);
        assert_eq!(participant.status, ParticipantStatus::Contributed);
        assert_eq!(participant.contribution_progress, 1);
    }
}
