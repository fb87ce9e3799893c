//! Ceremony setup: coordinator-only creation of a ceremony and its circuits.

use ceremony_primitives::{
    Ceremony, CeremonyId, CeremonyState, CeremonyType, Circuit, CircuitFiles, CircuitId, CircuitMetadata, TimeoutMechanismType,
    TimeoutWindow, WaitingQueue,
};

use crate::errors::{CoordinatorError, CoordinatorResult};

/// One circuit's setup parameters, already resolved to primitive types
/// (the wire DTO in `ceremony-rpc-api` maps onto this).
pub struct CircuitSetup {
    pub id: CircuitId,
    pub prefix: String,
    pub sequence_position: u32,
    pub metadata: CircuitMetadata,
    pub files: CircuitFiles,
    pub timeout_window: TimeoutWindow,
}

pub struct CeremonySetup {
    pub id: CeremonyId,
    pub prefix: String,
    pub title: String,
    pub description: String,
    pub start_date: i64,
    pub end_date: i64,
    pub ceremony_type: CeremonyType,
    pub coordinator_id: String,
    pub timeout_mechanism_type: TimeoutMechanismType,
    pub penalty_minutes: i64,
    pub circuits: Vec<CircuitSetup>,
}

/// `SetupCeremony`: builds the `Ceremony` (always `SCHEDULED`) and its
/// circuits (always empty queues), validating sequence positions are
/// contiguous and unique.
pub fn build_ceremony_and_circuits(setup: CeremonySetup) -> CoordinatorResult<(Ceremony, Vec<Circuit>)> {
    if setup.circuits.is_empty() {
        return Err(CoordinatorError::InvalidRequest("a ceremony must have at least one circuit".into()));
    }
    if setup.end_date <= setup.start_date {
        return Err(CoordinatorError::InvalidRequest("endDate must be after startDate".into()));
    }

    let mut positions: Vec<u32> = setup.circuits.iter().map(|c| c.sequence_position).collect();
    positions.sort_unstable();
    let expected: Vec<u32> = (1..=positions.len() as u32).collect();
    if positions != expected {
        return Err(CoordinatorError::InvalidRequest("circuit sequencePositions must be contiguous, 1..N, and unique".into()));
    }

    let ceremony = Ceremony {
        id: setup.id,
        prefix: setup.prefix,
        title: setup.title,
        description: setup.description,
        start_date: setup.start_date,
        end_date: setup.end_date,
        state: CeremonyState::Scheduled,
        ceremony_type: setup.ceremony_type,
        coordinator_id: setup.coordinator_id,
        timeout_mechanism_type: setup.timeout_mechanism_type,
        penalty: setup.penalty_minutes,
    };

    let circuits = setup
        .circuits
        .into_iter()
        .map(|c| Circuit {
            id: c.id,
            prefix: c.prefix,
            sequence_position: c.sequence_position,
            metadata: c.metadata,
            files: c.files,
            avg_timings: ceremony_primitives::AvgTimings::default(),
            waiting_queue: WaitingQueue::default(),
            timeout_window: c.timeout_window,
        })
        .collect();

    Ok((ceremony, circuits))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circuit_setup(prefix: &str, pos: u32) -> CircuitSetup {
        CircuitSetup {
            id: prefix.into(),
            prefix: prefix.into(),
            sequence_position: pos,
            metadata: CircuitMetadata::default(),
            files: CircuitFiles::default(),
            timeout_window: TimeoutWindow::Fixed { window_millis: 60_000 },
        }
    }

    fn base_setup(circuits: Vec<CircuitSetup>) -> CeremonySetup {
        CeremonySetup {
            id: "cer1".into(),
            prefix: "setup1".into(),
            title: "Setup One".into(),
            description: "desc".into(),
            start_date: 0,
            end_date: 1_000,
            ceremony_type: CeremonyType::Phase2,
            coordinator_id: "coord".into(),
            timeout_mechanism_type: TimeoutMechanismType::Dynamic,
            penalty_minutes: 60,
            circuits,
        }
    }

    #[test]
    fn builds_scheduled_ceremony_with_empty_queues() {
        let (ceremony, circuits) = build_ceremony_and_circuits(base_setup(vec![circuit_setup("a", 1), circuit_setup("b", 2)])).unwrap();
        assert_eq!(ceremony.state, CeremonyState::Scheduled);
        assert_eq!(circuits.len(), 2);
        assert!(circuits.iter().all(|c| c.waiting_queue.is_empty()));
    }

    #[test]
    fn rejects_non_contiguous_sequence_positions() {
        let err = build_ceremony_and_circuits(base_setup(vec![circuit_setup("a", 1), circuit_setup("b", 3)])).unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidRequest(_)));
    }

    #[test]
    fn rejects_empty_circuit_list() {
        let err = build_ceremony_and_circuits(base_setup(vec![])).unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidRequest(_)));
    }
}
