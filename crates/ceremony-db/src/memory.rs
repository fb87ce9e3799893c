//! Reference, in-memory [`RecordStore`] implementation.
//!
//! Used by the server binary for local/dev runs and by every test in this
//! workspace; a production deployment would swap this for a real document
//! database while keeping the same trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ceremony_primitives::{
    Ceremony, CeremonyId, Circuit, CircuitId, Contribution, MillisTimestamp, Participant, ParticipantId, Timeout,
};
use futures::stream::BoxStream;
use parking_lot::{Mutex as SyncMutex, RwLock};
use futures::StreamExt;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio_stream::wrappers::BroadcastStream;

use crate::errors::{DbError, DbResult};
use crate::traits::{Batch, BatchOp, RecordStore};

/// A single document's identity, used only to pick a consistent global lock
/// order when a batch touches more than one document — see the concurrency
/// note on fixed lock ordering (ceremony, then circuits, then participants).
#[derive(Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
enum DocKey {
    Ceremony(CeremonyId),
    Circuit(CeremonyId, CircuitId),
    Participant(CeremonyId, ParticipantId),
}

impl BatchOp {
    fn doc_key(&self) -> DocKey {
        match self {
            BatchOp::PutCeremony(c) => DocKey::Ceremony(c.id.clone()),
            BatchOp::PutCircuit { ceremony_id, circuit } => {
                DocKey::Circuit(ceremony_id.clone(), circuit.id.clone())
            }
            BatchOp::PutParticipant { ceremony_id, participant } => {
                DocKey::Participant(ceremony_id.clone(), participant.id.clone())
            }
            BatchOp::CreateContribution { ceremony_id, circuit_id, .. } => {
                DocKey::Circuit(ceremony_id.clone(), circuit_id.clone())
            }
            BatchOp::CreateTimeout { ceremony_id, participant_id, .. } => {
                DocKey::Participant(ceremony_id.clone(), participant_id.clone())
            }
        }
    }
}

#[derive(Default)]
struct Tables {
    ceremonies: HashMap<CeremonyId, Ceremony>,
    prefixes: std::collections::HashSet<String>,
    circuits: HashMap<(CeremonyId, CircuitId), Circuit>,
    participants: HashMap<(CeremonyId, ParticipantId), Participant>,
    contributions: HashMap<(CeremonyId, CircuitId), Vec<Contribution>>,
    timeouts: HashMap<(CeremonyId, ParticipantId), Vec<Timeout>>,
}

struct Inner {
    tables: RwLock<Tables>,
    doc_locks: SyncMutex<HashMap<DocKey, Arc<AsyncMutex<()>>>>,
    participant_channels: SyncMutex<HashMap<(CeremonyId, ParticipantId), broadcast::Sender<Participant>>>,
    circuit_channels: SyncMutex<HashMap<(CeremonyId, CircuitId), broadcast::Sender<Circuit>>>,
}

/// In-memory Record Store Adapter.
#[derive(Clone)]
pub struct InMemoryRecordStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: RwLock::new(Tables::default()),
                doc_locks: SyncMutex::new(HashMap::new()),
                participant_channels: SyncMutex::new(HashMap::new()),
                circuit_channels: SyncMutex::new(HashMap::new()),
            }),
        }
    }

    fn lock_for(&self, key: &DocKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self.inner.doc_locks.lock();
        locks.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    fn notify_participant(&self, ceremony_id: &CeremonyId, participant: &Participant) {
        let channels = self.inner.participant_channels.lock();
        if let Some(tx) = channels.get(&(ceremony_id.clone(), participant.id.clone())) {
            let _ = tx.send(participant.clone());
        }
    }

    fn notify_circuit(&self, ceremony_id: &CeremonyId, circuit: &Circuit) {
        let channels = self.inner.circuit_channels.lock();
        if let Some(tx) = channels.get(&(ceremony_id.clone(), circuit.id.clone())) {
            let _ = tx.send(circuit.clone());
        }
    }

    fn apply(&self, op: BatchOp) -> DbResult<(Option<(CeremonyId, Participant)>, Option<(CeremonyId, Circuit)>)> {
        let mut tables = self.inner.tables.write();
        match op {
            BatchOp::PutCeremony(ceremony) => {
                let existing_prefix = tables.ceremonies.get(&ceremony.id).map(|c| c.prefix.clone());
                let prefix_taken = tables.prefixes.contains(&ceremony.prefix) && existing_prefix.as_deref() != Some(ceremony.prefix.as_str());
                if prefix_taken {
                    return Err(DbError::DuplicatePrefix(ceremony.prefix));
                }
                if let Some(old_prefix) = existing_prefix.filter(|old| *old != ceremony.prefix) {
                    tables.prefixes.remove(&old_prefix);
                }
                tables.prefixes.insert(ceremony.prefix.clone());
                tables.ceremonies.insert(ceremony.id.clone(), ceremony);
                Ok((None, None))
            }
            BatchOp::PutCircuit { ceremony_id, circuit } => {
                tables.circuits.insert((ceremony_id.clone(), circuit.id.clone()), circuit.clone());
                Ok((None, Some((ceremony_id, circuit))))
            }
            BatchOp::PutParticipant { ceremony_id, participant } => {
                tables.participants.insert((ceremony_id.clone(), participant.id.clone()), participant.clone());
                Ok((Some((ceremony_id, participant)), None))
            }
            BatchOp::CreateContribution { ceremony_id, circuit_id, contribution } => {
                tables.contributions.entry((ceremony_id, circuit_id)).or_default().push(contribution);
                Ok((None, None))
            }
            BatchOp::CreateTimeout { ceremony_id, participant_id, timeout } => {
                tables.timeouts.entry((ceremony_id, participant_id)).or_default().push(timeout);
                Ok((None, None))
            }
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create_ceremony(&self, ceremony: Ceremony) -> DbResult<()> {
        self.commit(Batch::new().put_ceremony(ceremony)).await
    }

    async fn get_ceremony(&self, id: &CeremonyId) -> DbResult<Option<Ceremony>> {
        Ok(self.inner.tables.read().ceremonies.get(id).cloned())
    }

    async fn list_ceremonies(&self) -> DbResult<Vec<Ceremony>> {
        Ok(self.inner.tables.read().ceremonies.values().cloned().collect())
    }

    async fn get_circuit(&self, ceremony_id: &CeremonyId, circuit_id: &CircuitId) -> DbResult<Option<Circuit>> {
        Ok(self.inner.tables.read().circuits.get(&(ceremony_id.clone(), circuit_id.clone())).cloned())
    }

    async fn list_circuits(&self, ceremony_id: &CeremonyId) -> DbResult<Vec<Circuit>> {
        let mut circuits: Vec<Circuit> = self
            .inner
            .tables
            .read()
            .circuits
            .iter()
            .filter(|((cid, _), _)| cid == ceremony_id)
            .map(|(_, c)| c.clone())
            .collect();
        circuits.sort_by_key(|c| c.sequence_position);
        Ok(circuits)
    }

    async fn get_participant(&self, ceremony_id: &CeremonyId, participant_id: &ParticipantId) -> DbResult<Option<Participant>> {
        Ok(self
            .inner
            .tables
            .read()
            .participants
            .get(&(ceremony_id.clone(), participant_id.clone()))
            .cloned())
    }

    async fn list_participants(&self, ceremony_id: &CeremonyId) -> DbResult<Vec<Participant>> {
        Ok(self
            .inner
            .tables
            .read()
            .participants
            .iter()
            .filter(|((cid, _), _)| cid == ceremony_id)
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn list_contributions(&self, ceremony_id: &CeremonyId, circuit_id: &CircuitId) -> DbResult<Vec<Contribution>> {
        Ok(self
            .inner
            .tables
            .read()
            .contributions
            .get(&(ceremony_id.clone(), circuit_id.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_timeouts(&self, ceremony_id: &CeremonyId, participant_id: &ParticipantId) -> DbResult<Vec<Timeout>> {
        Ok(self
            .inner
            .tables
            .read()
            .timeouts
            .get(&(ceremony_id.clone(), participant_id.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn active_timeout(
        &self,
        ceremony_id: &CeremonyId,
        participant_id: &ParticipantId,
        now: MillisTimestamp,
    ) -> DbResult<Option<Timeout>> {
        Ok(self
            .list_timeouts(ceremony_id, participant_id)
            .await?
            .into_iter()
            .find(|t| t.is_active(now)))
    }

    async fn commit(&self, batch: Batch) -> DbResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        // Acquire one async lock per distinct document touched, in a fixed
        // global order, so two concurrent batches that share a document
        // never deadlock against each other.
        let mut keys: Vec<DocKey> = batch.ops.iter().map(|op| op.doc_key()).collect();
        keys.sort();
        keys.dedup();

        let locks: Vec<Arc<AsyncMutex<()>>> = keys.iter().map(|k| self.lock_for(k)).collect();
        let mut guards = Vec::with_capacity(locks.len());
        for lock in &locks {
            guards.push(lock.lock().await);
        }

        let mut changed_participants = Vec::new();
        let mut changed_circuits = Vec::new();
        for op in batch.ops {
            let (participant_change, circuit_change) = self.apply(op)?;
            if let Some(p) = participant_change {
                changed_participants.push(p);
            }
            if let Some(c) = circuit_change {
                changed_circuits.push(c);
            }
        }

        drop(guards);

        for (ceremony_id, participant) in &changed_participants {
            self.notify_participant(ceremony_id, participant);
        }
        for (ceremony_id, circuit) in &changed_circuits {
            self.notify_circuit(ceremony_id, circuit);
        }

        Ok(())
    }

    fn subscribe_participant(&self, ceremony_id: &CeremonyId, participant_id: &ParticipantId) -> BoxStream<'static, Participant> {
        let mut channels = self.inner.participant_channels.lock();
        let tx = channels
            .entry((ceremony_id.clone(), participant_id.clone()))
            .or_insert_with(|| broadcast::channel(64).0)
            .clone();
        let rx = tx.subscribe();
        Box::pin(BroadcastStream::new(rx).filter_map(|res| res.ok()))
    }

    fn subscribe_circuit(&self, ceremony_id: &CeremonyId, circuit_id: &CircuitId) -> BoxStream<'static, Circuit> {
        let mut channels = self.inner.circuit_channels.lock();
        let tx = channels
            .entry((ceremony_id.clone(), circuit_id.clone()))
            .or_insert_with(|| broadcast::channel(64).0)
            .clone();
        let rx = tx.subscribe();
        Box::pin(BroadcastStream::new(rx).filter_map(|res| res.ok()))
    }
}

#[cfg(test)]
mod tests {
    use ceremony_primitives::{CeremonyState, CeremonyType, TimeoutMechanismType};

    use super::*;

    fn sample_ceremony(id: &str, prefix: &str) -> Ceremony {
        Ceremony {
            id: CeremonyId::new(id),
            prefix: prefix.to_string(),
            title: "test".into(),
            description: "test ceremony".into(),
            start_date: 0,
            end_date: 1_000_000,
            state: CeremonyState::Opened,
            ceremony_type: CeremonyType::Phase2,
            coordinator_id: "coord".into(),
            timeout_mechanism_type: TimeoutMechanismType::Dynamic,
            penalty: 60,
        }
    }

    #[tokio::test]
    async fn duplicate_prefix_is_rejected() {
        let store = InMemoryRecordStore::new();
        store.create_ceremony(sample_ceremony("a", "prefix")).await.unwrap();
        let err = store.create_ceremony(sample_ceremony("b", "prefix")).await.unwrap_err();
        assert!(matches!(err, DbError::DuplicatePrefix(_)));
    }

    #[tokio::test]
    async fn batch_commit_is_all_or_nothing_visible_atomically() {
        let store = InMemoryRecordStore::new();
        store.create_ceremony(sample_ceremony("a", "prefix")).await.unwrap();

        let participant = Participant::created("p1".into());
        let batch = Batch::new().put_participant(CeremonyId::new("a"), participant.clone());
        store.commit(batch).await.unwrap();

        let got = store.get_participant(&CeremonyId::new("a"), &"p1".into()).await.unwrap();
        assert_eq!(got.unwrap().id, participant.id);
    }

    #[tokio::test]
    async fn participant_subscription_observes_commits() {
        let store = InMemoryRecordStore::new();
        let ceremony_id = CeremonyId::new("a");
        let participant_id: ParticipantId = "p1".into();

        let mut stream = store.subscribe_participant(&ceremony_id, &participant_id);

        let participant = Participant::created(participant_id.clone());
        store
            .commit(Batch::new().put_participant(ceremony_id.clone(), participant.clone()))
            .await
            .unwrap();

        let observed = stream.next().await.unwrap();
        assert_eq!(observed.id, participant_id);
    }
}
