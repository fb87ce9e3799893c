//! Trait definition for the Record Store Adapter.
//!
//! Borrows its split between typed accessors and an explicit batch builder
//! from reth/rockbound-style storage crates: callers read through plain
//! async getters, and every write that must be atomic goes through a
//! [`Batch`] collected up front and applied in one [`RecordStore::commit`].

use async_trait::async_trait;
use ceremony_primitives::{
    Ceremony, CeremonyId, Circuit, CircuitId, Contribution, MillisTimestamp, Participant, ParticipantId, Timeout,
};
use futures::stream::BoxStream;

use crate::errors::DbResult;

/// A single mutation. Batches are built from a sequence of these and applied
/// atomically by [`RecordStore::commit`] — either all of them land, or none
/// do.
#[derive(Clone, Debug)]
pub enum BatchOp {
    PutCeremony(Ceremony),
    PutCircuit { ceremony_id: CeremonyId, circuit: Circuit },
    PutParticipant { ceremony_id: CeremonyId, participant: Participant },
    CreateContribution { ceremony_id: CeremonyId, circuit_id: CircuitId, contribution: Contribution },
    CreateTimeout { ceremony_id: CeremonyId, participant_id: ParticipantId, timeout: Timeout },
}

/// Collects the mutations of one atomic multi-document write.
#[derive(Clone, Debug, Default)]
pub struct Batch {
    pub(crate) ops: Vec<BatchOp>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_ceremony(mut self, ceremony: Ceremony) -> Self {
        self.ops.push(BatchOp::PutCeremony(ceremony));
        self
    }

    pub fn put_circuit(mut self, ceremony_id: CeremonyId, circuit: Circuit) -> Self {
        self.ops.push(BatchOp::PutCircuit { ceremony_id, circuit });
        self
    }

    pub fn put_participant(mut self, ceremony_id: CeremonyId, participant: Participant) -> Self {
        self.ops.push(BatchOp::PutParticipant { ceremony_id, participant });
        self
    }

    pub fn create_contribution(mut self, ceremony_id: CeremonyId, circuit_id: CircuitId, contribution: Contribution) -> Self {
        self.ops.push(BatchOp::CreateContribution { ceremony_id, circuit_id, contribution });
        self
    }

    pub fn create_timeout(mut self, ceremony_id: CeremonyId, participant_id: ParticipantId, timeout: Timeout) -> Self {
        self.ops.push(BatchOp::CreateTimeout { ceremony_id, participant_id, timeout });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Interface over the document database: ceremonies, and the circuits /
/// participants / contributions / timeouts hanging off them.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_ceremony(&self, ceremony: Ceremony) -> DbResult<()>;
    async fn get_ceremony(&self, id: &CeremonyId) -> DbResult<Option<Ceremony>>;
    async fn list_ceremonies(&self) -> DbResult<Vec<Ceremony>>;

    async fn get_circuit(&self, ceremony_id: &CeremonyId, circuit_id: &CircuitId) -> DbResult<Option<Circuit>>;
    async fn list_circuits(&self, ceremony_id: &CeremonyId) -> DbResult<Vec<Circuit>>;

    async fn get_participant(&self, ceremony_id: &CeremonyId, participant_id: &ParticipantId) -> DbResult<Option<Participant>>;
    async fn list_participants(&self, ceremony_id: &CeremonyId) -> DbResult<Vec<Participant>>;

    async fn list_contributions(&self, ceremony_id: &CeremonyId, circuit_id: &CircuitId) -> DbResult<Vec<Contribution>>;

    async fn list_timeouts(&self, ceremony_id: &CeremonyId, participant_id: &ParticipantId) -> DbResult<Vec<Timeout>>;

    /// Returns the participant's currently active timeout, if any. At most
    /// one such timeout exists at a time (data model invariant).
    async fn active_timeout(
        &self,
        ceremony_id: &CeremonyId,
        participant_id: &ParticipantId,
        now: MillisTimestamp,
    ) -> DbResult<Option<Timeout>>;

    /// Applies every operation in `batch` atomically. On failure, no
    /// operation in the batch is visible to subsequent reads.
    async fn commit(&self, batch: Batch) -> DbResult<()>;

    /// Subscribes to changes on a single participant document. Used by the
    /// reference CLI client to drive its local copy of the participant state
    /// machine without polling.
    fn subscribe_participant(&self, ceremony_id: &CeremonyId, participant_id: &ParticipantId) -> BoxStream<'static, Participant>;

    /// Subscribes to changes on a single circuit document.
    fn subscribe_circuit(&self, ceremony_id: &CeremonyId, circuit_id: &CircuitId) -> BoxStream<'static, Circuit>;
}
