//! Circuit Queue Manager: ensures exactly one active contributor per
//! circuit, in FIFO admission order, and passes the baton on completion or
//! eviction.
//!
//! These are pure mutators over already-loaded documents; callers are
//! responsible for wrapping the mutation in a Record Store batch alongside
//! whatever Participant documents it also touches.

use ceremony_primitives::{Circuit, MillisTimestamp, Participant, ParticipantId, ParticipantStatus};

use crate::errors::{CoordinatorError, CoordinatorResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DequeueReason {
    Completed,
    Evicted,
}

/// Admits `participant` into `circuit`'s queue. A no-op if the participant
/// is already enqueued.
pub fn enqueue(circuit: &mut Circuit, participant: &mut Participant, now: MillisTimestamp) {
    if circuit.waiting_queue.contributors.contains(&participant.id) {
        return;
    }

    circuit.waiting_queue.contributors.push(participant.id.clone());
    if circuit.waiting_queue.current_contributor.is_none() {
        circuit.waiting_queue.current_contributor = Some(participant.id.clone());
        participant.status = ParticipantStatus::Contributing;
        participant.contribution_started_at = Some(now);
    } else {
        participant.status = ParticipantStatus::Waiting;
    }
}

/// Pops the head of `circuit`'s queue, which must be `participant_id`, and
/// returns the id of the new head (the participant the caller must promote
/// to `CONTRIBUTING`), if any.
pub fn dequeue(
    circuit: &mut Circuit,
    participant_id: &ParticipantId,
    reason: DequeueReason,
) -> CoordinatorResult<Option<ParticipantId>> {
    if circuit.waiting_queue.contributors.first() != Some(participant_id) {
        return Err(CoordinatorError::FailedPrecondition(format!(
            "{participant_id} is not the current contributor of circuit {}",
            circuit.id
        )));
    }

    circuit.waiting_queue.contributors.remove(0);
    let next = circuit.waiting_queue.contributors.first().cloned();
    circuit.waiting_queue.current_contributor = next.clone();
    if reason == DequeueReason::Evicted {
        circuit.waiting_queue.failed_contributions += 1;
    }
    Ok(next)
}

/// Promotes `participant` to `CONTRIBUTING` after [`dequeue`] names them the
/// new head.
pub fn promote(participant: &mut Participant, now: MillisTimestamp) {
    participant.status = ParticipantStatus::Contributing;
    participant.contribution_started_at = Some(now);
}

#[cfg(test)]
mod tests {
    use ceremony_primitives::{AvgTimings, Circuit, CircuitFiles, CircuitMetadata, TimeoutWindow, WaitingQueue};

    use super::*;

    fn empty_circuit() -> Circuit {
        Circuit {
            id: "c1".into(),
            prefix: "c1".into(),
            sequence_position: 1,
            metadata: CircuitMetadata::default(),
            files: CircuitFiles::default(),
            avg_timings: AvgTimings::default(),
            waiting_queue: WaitingQueue::default(),
            timeout_window: TimeoutWindow::Fixed { window_millis: 60_000 },
        }
    }

    #[test]
    fn first_enqueue_becomes_current_contributor() {
        let mut circuit = empty_circuit();
        let mut a = Participant::created("a".into());

        enqueue(&mut circuit, &mut a, 0);

        assert_eq!(circuit.waiting_queue.current_contributor, Some("a".into()));
        assert_eq!(a.status, ParticipantStatus::Contributing);
        assert!(circuit.queue_is_consistent());
    }

    #[test]
    fn second_enqueue_waits_behind_first() {
        let mut circuit = empty_circuit();
        let mut a = Participant::created("a".into());
        let mut b = Participant::created("b".into());

        enqueue(&mut circuit, &mut a, 0);
        enqueue(&mut circuit, &mut b, 1);

        assert_eq!(circuit.waiting_queue.contributors, vec!["a".into(), "b".into()]);
        assert_eq!(b.status, ParticipantStatus::Waiting);
        assert!(circuit.queue_is_consistent());
    }

    #[test]
    fn re_enqueue_is_a_no_op() {
        let mut circuit = empty_circuit();
        let mut a = Participant::created("a".into());
        enqueue(&mut circuit, &mut a, 0);
        enqueue(&mut circuit, &mut a, 5);

        assert_eq!(circuit.waiting_queue.contributors.len(), 1);
    }

    #[test]
    fn dequeue_promotes_successor() {
        let mut circuit = empty_circuit();
        let mut a = Participant::created("a".into());
        let mut b = Participant::created("b".into());
        enqueue(&mut circuit, &mut a, 0);
        enqueue(&mut circuit, &mut b, 1);

        let next = dequeue(&mut circuit, &a.id, DequeueReason::Completed).unwrap();
        assert_eq!(next, Some("b".into()));
        assert_eq!(circuit.waiting_queue.current_contributor, Some("b".into()));
        assert!(circuit.queue_is_consistent());
    }

    #[test]
    fn dequeue_without_successor_empties_queue() {
        let mut circuit = empty_circuit();
        let mut a = Participant::created("a".into());
        enqueue(&mut circuit, &mut a, 0);

        let next = dequeue(&mut circuit, &a.id, DequeueReason::Completed).unwrap();
        assert_eq!(next, None);
        assert_eq!(circuit.waiting_queue.current_contributor, None);
        assert!(circuit.queue_is_consistent());
    }

    #[test]
    fn evicted_dequeue_increments_failed_contributions() {
        let mut circuit = empty_circuit();
        let mut a = Participant::created("a".into());
        enqueue(&mut circuit, &mut a, 0);

        dequeue(&mut circuit, &a.id, DequeueReason::Evicted).unwrap();
        assert_eq!(circuit.waiting_queue.failed_contributions, 1);
    }

    #[test]
    fn dequeue_rejects_non_head_caller() {
        let mut circuit = empty_circuit();
        let mut a = Participant::created("a".into());
        let mut b = Participant::created("b".into());
        enqueue(&mut circuit, &mut a, 0);
        enqueue(&mut circuit, &mut b, 1);

        let err = dequeue(&mut circuit, &b.id, DequeueReason::Completed).unwrap_err();
        assert!(matches!(err, CoordinatorError::FailedPrecondition(_)));
    }
}
