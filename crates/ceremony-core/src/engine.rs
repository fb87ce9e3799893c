//! The coordinator engine: the one place that stitches the pure mutators in
//! [`crate::queue`], [`crate::participant`], [`crate::verification`],
//! [`crate::finalize`], [`crate::multipart`] and [`crate::timeout_controller`]
//! together with the Record Store, Artifact Store, cryptographic core,
//! identity provider and attestation publisher collaborators.
//!
//! Every public method here corresponds to one row of the external
//! interfaces table; a server binary's RPC layer does nothing but resolve
//! the bearer token, translate wire DTOs to the plain input structs below,
//! call through, and translate the result back.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ceremony_crypto::ZkeyCryptoCore;
use ceremony_db::{Batch, RecordStore};
use ceremony_primitives::{
    AttestationRecord, AuthClaim, Ceremony, CeremonyId, CeremonyState, CeremonyType, Circuit, CircuitFiles, CircuitId,
    CircuitMetadata, ContributionId, ContributionStep, EngineConfig, MillisTimestamp, Participant, ParticipantId,
    ParticipantStatus, Timeout, TimeoutId, TimeoutMechanismType, TimeoutType, TimeoutWindow, UploadedChunk,
};
use ceremony_storage::{ArtifactStore, PresignedUrl};
use uuid::Uuid;

use crate::attestation::AttestationPublisher;
use crate::errors::{CoordinatorError, CoordinatorResult};
use crate::identity::IdentityProvider;
use crate::queue::{self, DequeueReason};
use crate::setup::{CeremonySetup, CircuitSetup};
use crate::{finalize, multipart, paths, participant as participant_fsm, setup, timeout_controller, verification};

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A source of wall-clock time, abstracted so tests can drive the Timeout
/// Controller and queue timestamps deterministically.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> MillisTimestamp;
}

/// Reads the system clock. Used by the server binary; tests use
/// [`ManualClock`] instead.
#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> MillisTimestamp {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
    }
}

/// A clock a test can set and advance explicitly.
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start: MillisTimestamp) -> Self {
        Self(AtomicI64::new(start))
    }

    pub fn set(&self, now: MillisTimestamp) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_millis: i64) {
        self.0.fetch_add(delta_millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> MillisTimestamp {
        self.0.load(Ordering::SeqCst)
    }
}

/// One circuit's setup parameters, without an id (the engine mints one).
pub struct CircuitSetupInput {
    pub prefix: String,
    pub sequence_position: u32,
    pub metadata: CircuitMetadata,
    pub files: CircuitFiles,
    pub timeout_window: TimeoutWindow,
}

pub struct SetupCeremonyInput {
    pub prefix: String,
    pub title: String,
    pub description: String,
    pub start_date: MillisTimestamp,
    pub end_date: MillisTimestamp,
    pub ceremony_type: CeremonyType,
    pub timeout_mechanism_type: TimeoutMechanismType,
    pub penalty_minutes: i64,
    pub circuits: Vec<CircuitSetupInput>,
}

pub struct VerifyContributionInput {
    pub circuit_id: CircuitId,
    pub contribution_computation_time_millis: i64,
    pub gh_username: String,
}

pub struct VerifyContributionOutcome {
    pub valid: bool,
    pub verification_computation_time_millis: i64,
}

pub struct FinalizeCircuitInput {
    pub circuit_id: CircuitId,
    pub beacon: Vec<u8>,
}

/// Everything a contributor client needs to resolve object-store paths and
/// decide its next move for its currently-assigned circuit, returned by
/// [`CoordinatorEngine::get_contribution_snapshot`].
pub struct ContributionSnapshot {
    pub ceremony_prefix: String,
    pub ceremony_state: CeremonyState,
    pub circuit_id: CircuitId,
    pub circuit_prefix: String,
    pub pot_storage_path: String,
    pub initial_zkey_storage_path: String,
    pub zkey_index_width: usize,
    pub chunk_size_mb: u64,
    pub completed_contributions: u64,
    pub participant_status: ParticipantStatus,
    pub contribution_step: Option<ContributionStep>,
    pub upload_id: Option<String>,
    pub chunks: Vec<UploadedChunk>,
}

/// Stitches every collaborator of the ceremony coordination engine together
/// behind trait objects, the way a server binary wires one real
/// implementation of each in and a test wires reference/mock ones in.
pub struct CoordinatorEngine {
    store: Arc<dyn RecordStore>,
    artifacts: Arc<dyn ArtifactStore>,
    crypto: Arc<dyn ZkeyCryptoCore>,
    identity: Arc<dyn IdentityProvider>,
    attestations: Arc<dyn AttestationPublisher>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl CoordinatorEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn RecordStore>,
        artifacts: Arc<dyn ArtifactStore>,
        crypto: Arc<dyn ZkeyCryptoCore>,
        identity: Arc<dyn IdentityProvider>,
        attestations: Arc<dyn AttestationPublisher>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self { store, artifacts, crypto, identity, attestations, clock, config }
    }

    fn now(&self) -> MillisTimestamp {
        self.clock.now_millis()
    }

    /// Exposes the engine's static configuration so callers at the RPC edge
    /// can fall back to a configured default (a tolerance, a penalty, a
    /// chunk size) when a request leaves it unspecified.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn require_coordinator(claim: &AuthClaim) -> CoordinatorResult<()> {
        if !claim.is_coordinator {
            return Err(CoordinatorError::PermissionDenied("coordinator role required".into()));
        }
        Ok(())
    }

    async fn load_ceremony(&self, ceremony_id: &CeremonyId) -> CoordinatorResult<Ceremony> {
        self.store
            .get_ceremony(ceremony_id)
            .await?
            .ok_or_else(|| CoordinatorError::NotFound(format!("ceremony {ceremony_id} not found")))
    }

    async fn sorted_circuits(&self, ceremony_id: &CeremonyId) -> CoordinatorResult<Vec<Circuit>> {
        let mut circuits = self.store.list_circuits(ceremony_id).await?;
        circuits.sort_by_key(|c| c.sequence_position);
        Ok(circuits)
    }

    async fn load_circuit(&self, ceremony_id: &CeremonyId, circuit_id: &CircuitId) -> CoordinatorResult<Circuit> {
        self.store
            .get_circuit(ceremony_id, circuit_id)
            .await?
            .ok_or_else(|| CoordinatorError::NotFound(format!("circuit {circuit_id} not found")))
    }

    async fn load_participant(&self, ceremony_id: &CeremonyId, participant_id: &ParticipantId) -> CoordinatorResult<Participant> {
        self.store
            .get_participant(ceremony_id, participant_id)
            .await?
            .ok_or_else(|| CoordinatorError::NotFound(format!("participant {participant_id} not found")))
    }

    fn bucket_of(ceremony: &Ceremony) -> String {
        paths::bucket_name(&ceremony.prefix)
    }

    // -- setup & provisioning -------------------------------------------

    pub async fn setup_ceremony(&self, bearer_token: &str, request: SetupCeremonyInput) -> CoordinatorResult<CeremonyId> {
        let claim = self.identity.resolve(bearer_token)?;
        Self::require_coordinator(&claim)?;

        let circuits = request
            .circuits
            .into_iter()
            .map(|c| CircuitSetup {
                id: CircuitId::new(new_id()),
                prefix: c.prefix,
                sequence_position: c.sequence_position,
                metadata: c.metadata,
                files: c.files,
                timeout_window: c.timeout_window,
            })
            .collect();

        let setup = CeremonySetup {
            id: CeremonyId::new(new_id()),
            prefix: request.prefix,
            title: request.title,
            description: request.description,
            start_date: request.start_date,
            end_date: request.end_date,
            ceremony_type: request.ceremony_type,
            coordinator_id: claim.user_id,
            timeout_mechanism_type: request.timeout_mechanism_type,
            penalty_minutes: request.penalty_minutes,
            circuits,
        };

        let (ceremony, circuits) = setup::build_ceremony_and_circuits(setup)?;
        let ceremony_id = ceremony.id.clone();

        let mut batch = Batch::new().put_ceremony(ceremony);
        for circuit in circuits {
            batch = batch.put_circuit(ceremony_id.clone(), circuit);
        }
        self.store.commit(batch).await?;

        Ok(ceremony_id)
    }

    pub async fn create_bucket(&self, bearer_token: &str, ceremony_id: &CeremonyId) -> CoordinatorResult<String> {
        let claim = self.identity.resolve(bearer_token)?;
        Self::require_coordinator(&claim)?;

        let ceremony = self.load_ceremony(ceremony_id).await?;
        let bucket = Self::bucket_of(&ceremony);
        self.artifacts.create_bucket(&bucket).await?;
        Ok(bucket)
    }

    // -- participant join / progress --------------------------------------

    pub async fn check_participant_for_ceremony(&self, bearer_token: &str, ceremony_id: &CeremonyId) -> CoordinatorResult<bool> {
        let claim = self.identity.resolve(bearer_token)?;
        let user_id: ParticipantId = claim.user_id.clone().into();

        let ceremony = self.load_ceremony(ceremony_id).await?;
        let existing = self.store.get_participant(ceremony_id, &user_id).await?;
        let now = self.now();
        let active_timeout = self.store.active_timeout(ceremony_id, &user_id, now).await?;

        let outcome = participant_fsm::check_participant_for_ceremony(&ceremony, existing, active_timeout.as_ref(), &user_id)?;
        let mut participant = outcome.participant;
        let eligible = outcome.eligible;

        let mut batch = Batch::new();
        if eligible && matches!(participant.status, ParticipantStatus::Created | ParticipantStatus::Ready) {
            participant_fsm::progress_to_next_circuit_for_contribution(&mut participant)?;
            let circuits = self.sorted_circuits(ceremony_id).await?;
            if let Some(circuit) = circuits.get(participant.contribution_progress as usize).cloned() {
                let mut circuit = circuit;
                queue::enqueue(&mut circuit, &mut participant, now);
                batch = batch.put_circuit(ceremony_id.clone(), circuit);
            }
        }
        batch = batch.put_participant(ceremony_id.clone(), participant);
        self.store.commit(batch).await?;

        Ok(eligible)
    }

    pub async fn progress_to_next_contribution_step(&self, bearer_token: &str, ceremony_id: &CeremonyId) -> CoordinatorResult<()> {
        let claim = self.identity.resolve(bearer_token)?;
        let user_id: ParticipantId = claim.user_id.into();
        let mut participant = self.load_participant(ceremony_id, &user_id).await?;
        let circuits = self.sorted_circuits(ceremony_id).await?;

        let mut batch = Batch::new();
        match participant.status {
            ParticipantStatus::Ready => {
                participant_fsm::progress_to_next_circuit_for_contribution(&mut participant)?;
                if let Some(mut circuit) = circuits.get(participant.contribution_progress as usize).cloned() {
                    queue::enqueue(&mut circuit, &mut participant, self.now());
                    batch = batch.put_circuit(ceremony_id.clone(), circuit);
                }
            }
            ParticipantStatus::Contributing | ParticipantStatus::Contributed => {
                participant_fsm::advance_contribution_step(&mut participant, circuits.len() as u32)?;
            }
            other => {
                return Err(CoordinatorError::FailedPrecondition(format!("participant cannot progress from status {other:?}")));
            }
        }
        batch = batch.put_participant(ceremony_id.clone(), participant);
        self.store.commit(batch).await?;
        Ok(())
    }

    pub async fn resume_contribution_after_timeout_expiration(&self, bearer_token: &str, ceremony_id: &CeremonyId) -> CoordinatorResult<()> {
        let claim = self.identity.resolve(bearer_token)?;
        let user_id: ParticipantId = claim.user_id.into();
        let mut participant = self.load_participant(ceremony_id, &user_id).await?;

        participant_fsm::resume_after_timeout_expiration(&mut participant)?;
        participant_fsm::progress_to_next_circuit_for_contribution(&mut participant)?;

        let circuits = self.sorted_circuits(ceremony_id).await?;
        let mut batch = Batch::new();
        if let Some(mut circuit) = circuits.get(participant.contribution_progress as usize).cloned() {
            queue::enqueue(&mut circuit, &mut participant, self.now());
            batch = batch.put_circuit(ceremony_id.clone(), circuit);
        }
        batch = batch.put_participant(ceremony_id.clone(), participant);
        self.store.commit(batch).await?;
        Ok(())
    }

    // -- resumable multi-part upload ---------------------------------------

    async fn current_circuit_for(&self, ceremony_id: &CeremonyId, participant: &Participant) -> CoordinatorResult<Circuit> {
        let circuits = self.sorted_circuits(ceremony_id).await?;
        circuits
            .into_iter()
            .nth(participant.contribution_progress as usize)
            .ok_or_else(|| CoordinatorError::FailedPrecondition("participant has no circuit currently in progress".into()))
    }

    /// A polled stand-in for the snapshot-listener loop Design Note 1
    /// describes: everything the reference CLI client needs to resolve
    /// object-store paths and decide its next move, read in one round trip
    /// instead of subscribing to document change notifications.
    pub async fn get_contribution_snapshot(&self, bearer_token: &str, ceremony_id: &CeremonyId) -> CoordinatorResult<ContributionSnapshot> {
        let claim = self.identity.resolve(bearer_token)?;
        let user_id: ParticipantId = claim.user_id.into();
        let ceremony = self.load_ceremony(ceremony_id).await?;
        let participant = self.load_participant(ceremony_id, &user_id).await?;
        let circuit = self.current_circuit_for(ceremony_id, &participant).await?;

        Ok(ContributionSnapshot {
            ceremony_prefix: ceremony.prefix,
            ceremony_state: ceremony.state,
            circuit_id: circuit.id,
            circuit_prefix: circuit.prefix,
            pot_storage_path: circuit.files.pot_storage_path,
            initial_zkey_storage_path: circuit.files.initial_zkey_storage_path,
            zkey_index_width: self.config.first_zkey_index_width,
            chunk_size_mb: self.config.chunk_size_mb,
            completed_contributions: circuit.waiting_queue.completed_contributions,
            participant_status: participant.status,
            contribution_step: participant.contribution_step,
            upload_id: participant.temp_contribution_data.upload_id,
            chunks: participant.temp_contribution_data.chunks,
        })
    }

    pub async fn start_multi_part_upload(&self, bearer_token: &str, ceremony_id: &CeremonyId, object_key: &str) -> CoordinatorResult<String> {
        let claim = self.identity.resolve(bearer_token)?;
        let user_id: ParticipantId = claim.user_id.into();
        let ceremony = self.load_ceremony(ceremony_id).await?;
        let mut participant = self.load_participant(ceremony_id, &user_id).await?;
        let circuit = self.current_circuit_for(ceremony_id, &participant).await?;

        let zkey_index = multipart::current_zkey_index(&circuit, self.config.first_zkey_index_width);
        multipart::authorize_upload(&ceremony, &circuit, &participant, &zkey_index, object_key)?;

        let bucket = Self::bucket_of(&ceremony);
        let upload_id = self.artifacts.start_multipart_upload(&bucket, object_key).await?;

        participant_fsm::store_upload_id(&mut participant, upload_id.clone())?;
        self.store.commit(Batch::new().put_participant(ceremony_id.clone(), participant)).await?;
        Ok(upload_id)
    }

    pub async fn generate_pre_signed_urls_parts(
        &self,
        bearer_token: &str,
        ceremony_id: &CeremonyId,
        object_key: &str,
        upload_id: &str,
        number_of_parts: u32,
    ) -> CoordinatorResult<Vec<PresignedUrl>> {
        let claim = self.identity.resolve(bearer_token)?;
        let user_id: ParticipantId = claim.user_id.into();
        let ceremony = self.load_ceremony(ceremony_id).await?;
        let participant = self.load_participant(ceremony_id, &user_id).await?;
        let circuit = self.current_circuit_for(ceremony_id, &participant).await?;

        let zkey_index = multipart::current_zkey_index(&circuit, self.config.first_zkey_index_width);
        multipart::authorize_upload(&ceremony, &circuit, &participant, &zkey_index, object_key)?;
        if participant.temp_contribution_data.upload_id.as_deref() != Some(upload_id) {
            return Err(CoordinatorError::PermissionDenied("upload id does not match the caller's in-flight upload".into()));
        }

        let bucket = Self::bucket_of(&ceremony);
        let now = self.now();
        let expiration = Duration::from_secs(self.config.url_expiration_secs);
        Ok(self.artifacts.generate_presigned_urls_parts(&bucket, object_key, upload_id, number_of_parts, expiration, now).await?)
    }

    pub async fn temporary_store_upload_id(&self, bearer_token: &str, ceremony_id: &CeremonyId, upload_id: String) -> CoordinatorResult<()> {
        let claim = self.identity.resolve(bearer_token)?;
        let user_id: ParticipantId = claim.user_id.into();
        let mut participant = self.load_participant(ceremony_id, &user_id).await?;
        participant_fsm::store_upload_id(&mut participant, upload_id)?;
        self.store.commit(Batch::new().put_participant(ceremony_id.clone(), participant)).await?;
        Ok(())
    }

    pub async fn temporary_store_chunk_data(
        &self,
        bearer_token: &str,
        ceremony_id: &CeremonyId,
        e_tag: String,
        part_number: u32,
    ) -> CoordinatorResult<()> {
        let claim = self.identity.resolve(bearer_token)?;
        let user_id: ParticipantId = claim.user_id.into();
        let mut participant = self.load_participant(ceremony_id, &user_id).await?;
        participant_fsm::store_chunk_data(&mut participant, e_tag, part_number)?;
        self.store.commit(Batch::new().put_participant(ceremony_id.clone(), participant)).await?;
        Ok(())
    }

    pub async fn complete_multi_part_upload(
        &self,
        bearer_token: &str,
        ceremony_id: &CeremonyId,
        object_key: &str,
        upload_id: &str,
        parts: Vec<ceremony_primitives::UploadedChunk>,
    ) -> CoordinatorResult<String> {
        let claim = self.identity.resolve(bearer_token)?;
        let user_id: ParticipantId = claim.user_id.into();
        let ceremony = self.load_ceremony(ceremony_id).await?;
        let participant = self.load_participant(ceremony_id, &user_id).await?;
        let circuit = self.current_circuit_for(ceremony_id, &participant).await?;

        let zkey_index = multipart::current_zkey_index(&circuit, self.config.first_zkey_index_width);
        multipart::authorize_upload(&ceremony, &circuit, &participant, &zkey_index, object_key)?;

        let bucket = Self::bucket_of(&ceremony);
        Ok(self.artifacts.complete_multipart_upload(&bucket, object_key, upload_id, parts).await?)
    }

    pub async fn generate_get_object_pre_signed_url(
        &self,
        bearer_token: &str,
        ceremony_id: &CeremonyId,
        object_key: &str,
    ) -> CoordinatorResult<PresignedUrl> {
        let claim = self.identity.resolve(bearer_token)?;
        let ceremony = self.load_ceremony(ceremony_id).await?;

        if !claim.is_coordinator {
            let user_id: ParticipantId = claim.user_id.into();
            let participant = self.load_participant(ceremony_id, &user_id).await?;
            let circuit = self.current_circuit_for(ceremony_id, &participant).await?;
            multipart::authorize_download(false, &ceremony, &circuit, object_key)?;
        }

        let bucket = Self::bucket_of(&ceremony);
        let now = self.now();
        let expiration = Duration::from_secs(self.config.url_expiration_secs);
        Ok(self.artifacts.generate_get_object_presigned_url(&bucket, object_key, expiration, now).await?)
    }

    pub async fn permanently_store_current_contribution_time_and_hash(
        &self,
        bearer_token: &str,
        ceremony_id: &CeremonyId,
        computation_time_millis: i64,
        claimed_hash: String,
    ) -> CoordinatorResult<()> {
        let claim = self.identity.resolve(bearer_token)?;
        let user_id: ParticipantId = claim.user_id.into();
        let mut participant = self.load_participant(ceremony_id, &user_id).await?;
        participant_fsm::store_contribution_time_and_hash(&mut participant, computation_time_millis, claimed_hash)?;
        self.store.commit(Batch::new().put_participant(ceremony_id.clone(), participant)).await?;
        Ok(())
    }

    // -- verification --------------------------------------------------------

    pub async fn verify_contribution(
        &self,
        bearer_token: &str,
        ceremony_id: &CeremonyId,
        request: VerifyContributionInput,
    ) -> CoordinatorResult<VerifyContributionOutcome> {
        let claim = self.identity.resolve(bearer_token)?;
        let user_id: ParticipantId = claim.user_id.into();

        let ceremony = self.load_ceremony(ceremony_id).await?;
        let mut circuit = self.load_circuit(ceremony_id, &request.circuit_id).await?;
        let mut participant = self.load_participant(ceremony_id, &user_id).await?;
        verification::require_verifying_contributor(&circuit, &participant)?;

        let width = self.config.first_zkey_index_width;
        let completed = circuit.waiting_queue.completed_contributions;
        let zkey_index = ceremony_primitives::format_zkey_index(completed + 1, width);
        let bucket = Self::bucket_of(&ceremony);

        let previous_key = if completed == 0 {
            circuit.files.initial_zkey_storage_path.clone()
        } else {
            paths::contribution_zkey_path(&ceremony.prefix, &circuit.prefix, &ceremony_primitives::format_zkey_index(completed, width))
        };
        let candidate_key = paths::contribution_zkey_path(&ceremony.prefix, &circuit.prefix, &zkey_index);
        let pot_key = paths::pot_path(&ceremony.prefix, &circuit.files.pot_storage_path);

        let previous_bytes = self.artifacts.get_object(&bucket, &previous_key).await?;
        let candidate_bytes = self.artifacts.get_object(&bucket, &candidate_key).await?;
        let pot_bytes = self.artifacts.get_object(&bucket, &pot_key).await?;

        let verification_start = self.now();
        let valid = self.crypto.verify(&previous_bytes, &candidate_bytes, &pot_bytes)?;
        let verification_computation_time = (self.now() - verification_start).max(0);

        let hash = self.crypto.hash(&candidate_bytes);
        let transcript_text = format!(
            "contribution by {} on circuit {} at zkeyIndex {} (gh: {})\n",
            participant.id, circuit.id, zkey_index, request.gh_username
        );
        let transcript_bytes = transcript_text.into_bytes();
        let transcript_key = paths::transcript_path(&ceremony.prefix, &circuit.prefix, &zkey_index, &request.gh_username);
        self.artifacts.put_object(&bucket, &transcript_key, transcript_bytes.clone()).await?;

        if valid {
            verification::update_avg_timings(&mut circuit.avg_timings, request.contribution_computation_time_millis, verification_computation_time);
        }
        verification::update_queue_counters(&mut circuit, valid);

        let contribution = verification::build_contribution(
            ContributionId::new(new_id()),
            &circuit,
            participant.id.clone(),
            zkey_index.clone(),
            request.contribution_computation_time_millis,
            verification_computation_time,
            format!("{}_{}.zkey", circuit.prefix, zkey_index),
            candidate_key,
            hash.clone(),
            format!("{}_{}_{}_verification_transcript.log", circuit.prefix, zkey_index, request.gh_username),
            transcript_key,
            self.crypto.hash(&transcript_bytes),
            valid,
        );

        let mut batch = Batch::new();
        let now = self.now();
        let next = queue::dequeue(&mut circuit, &participant.id, DequeueReason::Completed)?;

        // The post-write hook runs on every Contribution, valid or not: the
        // slot is burned either way, so the participant always advances.
        participant_fsm::refresh_after_verification(
            &mut participant,
            contribution.id.clone(),
            request.contribution_computation_time_millis,
            hash,
            self.sorted_circuits(ceremony_id).await?.len() as u32,
        );

        if let Some(next_id) = next {
            let mut next_participant = self.load_participant(ceremony_id, &next_id).await?;
            queue::promote(&mut next_participant, now);
            batch = batch.put_participant(ceremony_id.clone(), next_participant);
        }

        batch = batch
            .put_circuit(ceremony_id.clone(), circuit)
            .put_participant(ceremony_id.clone(), participant)
            .create_contribution(ceremony_id.clone(), request.circuit_id, contribution);
        self.store.commit(batch).await?;

        Ok(VerifyContributionOutcome { valid, verification_computation_time_millis: verification_computation_time })
    }

    // -- finalization ---------------------------------------------------------

    pub async fn finalize_circuit(&self, bearer_token: &str, ceremony_id: &CeremonyId, request: FinalizeCircuitInput) -> CoordinatorResult<()> {
        let claim = self.identity.resolve(bearer_token)?;
        Self::require_coordinator(&claim)?;

        let ceremony = self.load_ceremony(ceremony_id).await?;
        finalize::require_closed(&ceremony)?;
        let circuit = self.load_circuit(ceremony_id, &request.circuit_id).await?;

        let width = self.config.first_zkey_index_width;
        let bucket = Self::bucket_of(&ceremony);
        let completed = circuit.waiting_queue.completed_contributions;
        let previous_key = if completed == 0 {
            circuit.files.initial_zkey_storage_path.clone()
        } else {
            paths::contribution_zkey_path(&ceremony.prefix, &circuit.prefix, &ceremony_primitives::format_zkey_index(completed, width))
        };
        let previous_bytes = self.artifacts.get_object(&bucket, &previous_key).await?;

        let output = self.crypto.beacon_contribute(&previous_bytes, &request.beacon);
        let hash = self.crypto.hash(&output.zkey);
        let verification_key = self.crypto.export_verification_key(&output.zkey)?;
        let verifier_contract = self.crypto.export_verifier_contract(&output.zkey)?;

        let zkey_key = paths::contribution_zkey_path(&ceremony.prefix, &circuit.prefix, ceremony_primitives::FINAL_ZKEY_INDEX);
        let transcript_key = paths::transcript_path(&ceremony.prefix, &circuit.prefix, ceremony_primitives::FINAL_ZKEY_INDEX, "coordinator");
        let vk_key = paths::verification_key_path(&ceremony.prefix, &circuit.prefix);
        let verifier_key = paths::verifier_contract_path(&ceremony.prefix, &circuit.prefix);

        self.artifacts.put_object(&bucket, &zkey_key, output.zkey).await?;
        self.artifacts.put_object(&bucket, &transcript_key, output.transcript.clone()).await?;
        self.artifacts.put_object(&bucket, &vk_key, verification_key).await?;
        self.artifacts.put_object(&bucket, &verifier_key, verifier_contract).await?;

        let contribution = finalize::build_final_contribution(
            ContributionId::new(new_id()),
            &circuit,
            claim.user_id.clone(),
            hex::encode(&request.beacon),
            format!("{}_final.zkey", circuit.prefix),
            zkey_key,
            hash.clone(),
            format!("{}_final_coordinator_verification_transcript.log", circuit.prefix),
            transcript_key,
            self.crypto.hash(&output.transcript),
            verifier_key,
            vk_key,
        );

        self.store
            .commit(Batch::new().create_contribution(ceremony_id.clone(), request.circuit_id.clone(), contribution))
            .await?;

        let contributors_ordered = self
            .store
            .list_contributions(ceremony_id, &request.circuit_id)
            .await?
            .into_iter()
            .filter(|c| c.valid && !c.is_final())
            .map(|c| (ceremony_primitives::parse_zkey_index(&c.zkey_index).unwrap_or(u64::MAX), c.participant_id))
            .collect::<std::collections::BTreeMap<_, _>>()
            .into_values()
            .collect();

        let record = AttestationRecord {
            ceremony_id: ceremony_id.clone(),
            circuit_id: request.circuit_id,
            last_zkey_blake2b_hash: hash,
            contributors_ordered,
            published_at: self.now(),
        };
        if let Err(err) = self.attestations.publish(&record).await {
            tracing::warn!(error = %err, circuit = %record.circuit_id, "attestation publish failed");
        }

        Ok(())
    }

    pub async fn finalize_ceremony(&self, bearer_token: &str, ceremony_id: &CeremonyId) -> CoordinatorResult<()> {
        let claim = self.identity.resolve(bearer_token)?;
        Self::require_coordinator(&claim)?;

        let mut ceremony = self.load_ceremony(ceremony_id).await?;
        finalize::require_closed(&ceremony)?;

        let circuits = self.sorted_circuits(ceremony_id).await?;
        let mut contributions_by_circuit = Vec::with_capacity(circuits.len());
        for circuit in &circuits {
            contributions_by_circuit.push(self.store.list_contributions(ceremony_id, &circuit.id).await?);
        }

        if !finalize::all_circuits_finalized(&circuits, &contributions_by_circuit) {
            return Err(CoordinatorError::FailedPrecondition("not every circuit has a valid final contribution".into()));
        }

        ceremony.state = CeremonyState::Finalized;
        let mut batch = Batch::new().put_ceremony(ceremony);

        for mut participant in self.store.list_participants(ceremony_id).await? {
            if participant.status == ParticipantStatus::Done {
                participant.status = ParticipantStatus::Finalized;
                batch = batch.put_participant(ceremony_id.clone(), participant);
            }
        }
        self.store.commit(batch).await?;
        Ok(())
    }

    // -- scheduler ----------------------------------------------------------

    /// `start_ceremony_job`: flips every `SCHEDULED` ceremony whose
    /// `start_date` has arrived to `OPENED`.
    pub async fn start_ceremony_job(&self) -> CoordinatorResult<u32> {
        let now = self.now();
        let mut flipped = 0;
        for mut ceremony in self.store.list_ceremonies().await? {
            if ceremony.state == CeremonyState::Scheduled && ceremony.start_date <= now {
                ceremony.state = CeremonyState::Opened;
                self.store.commit(Batch::new().put_ceremony(ceremony)).await?;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    /// `stop_ceremony_job`: closes every `OPENED` ceremony whose `end_date`
    /// has passed.
    pub async fn stop_ceremony_job(&self) -> CoordinatorResult<u32> {
        let now = self.now();
        let mut flipped = 0;
        for mut ceremony in self.store.list_ceremonies().await? {
            if ceremony.state == CeremonyState::Opened && ceremony.end_date <= now {
                ceremony.state = CeremonyState::Closed;
                self.store.commit(Batch::new().put_ceremony(ceremony)).await?;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    /// `check_and_remove_blocking_contributor_job`: evicts any current
    /// contributor who has blown through their circuit's contribution
    /// budget, promotes their successor, and opens a penalty [`Timeout`].
    pub async fn check_and_remove_blocking_contributor_job(&self) -> CoordinatorResult<u32> {
        let now = self.now();
        let mut evicted = 0;

        for ceremony in self.store.list_ceremonies().await? {
            if ceremony.state != CeremonyState::Opened {
                continue;
            }
            for mut circuit in self.store.list_circuits(&ceremony.id).await? {
                let Some(current_id) = circuit.waiting_queue.current_contributor.clone() else { continue };
                let mut current = match self.store.get_participant(&ceremony.id, &current_id).await? {
                    Some(p) => p,
                    None => continue,
                };
                let Some(started_at) = current.contribution_started_at else { continue };
                if !timeout_controller::is_expired(&circuit, started_at, now) {
                    continue;
                }

                let next = queue::dequeue(&mut circuit, &current_id, DequeueReason::Evicted)?;
                participant_fsm::evict_for_timeout(&mut current);

                let timeout = Timeout {
                    id: TimeoutId::new(new_id()),
                    start_date: now,
                    end_date: now + ceremony.penalty * 60_000,
                    timeout_type: TimeoutType::BlockingContribution,
                };

                let mut batch = Batch::new()
                    .put_circuit(ceremony.id.clone(), circuit)
                    .put_participant(ceremony.id.clone(), current.clone())
                    .create_timeout(ceremony.id.clone(), current.id.clone(), timeout);

                if let Some(next_id) = next {
                    let mut next_participant = self.load_participant(&ceremony.id, &next_id).await?;
                    queue::promote(&mut next_participant, now);
                    batch = batch.put_participant(ceremony.id.clone(), next_participant);
                }

                self.store.commit(batch).await?;
                evicted += 1;
            }
        }
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ceremony_crypto::MockZkeyCryptoCore;
    use ceremony_db::InMemoryRecordStore;
    use ceremony_storage::LocalArtifactStore;

    use super::*;
    use crate::attestation::NoopAttestationPublisher;
    use crate::identity::AllowlistIdentityProvider;

    const COORDINATOR_TOKEN: &str = "coordinator-token";
    const ALICE_TOKEN: &str = "alice-token";

    fn build_engine(base_dir: &std::path::Path, clock: Arc<ManualClock>) -> CoordinatorEngine {
        let identity = AllowlistIdentityProvider::new()
            .with_coordinator(COORDINATOR_TOKEN, "coord", "Coordinator")
            .with_participant(ALICE_TOKEN, "alice", "Alice");

        CoordinatorEngine::new(
            Arc::new(InMemoryRecordStore::default()),
            Arc::new(LocalArtifactStore::new(base_dir)),
            Arc::new(MockZkeyCryptoCore::default()),
            Arc::new(identity),
            Arc::new(NoopAttestationPublisher),
            clock,
            EngineConfig::default(),
        )
    }

    fn circuit_input(prefix: &str) -> CircuitSetupInput {
        CircuitSetupInput {
            prefix: prefix.into(),
            sequence_position: 1,
            metadata: CircuitMetadata { curve: "bn128".into(), wires: 10, constraints: 20, pot: 12 },
            files: CircuitFiles {
                initial_zkey_storage_path: format!("setup1/circuits/{prefix}/contributions/{prefix}_00000.zkey"),
                pot_storage_path: "pot.ptau".into(),
                ..Default::default()
            },
            timeout_window: TimeoutWindow::Fixed { window_millis: 60_000 },
        }
    }

    async fn setup_one_circuit_ceremony(engine: &CoordinatorEngine) -> CeremonyId {
        let ceremony_id = engine
            .setup_ceremony(
                COORDINATOR_TOKEN,
                SetupCeremonyInput {
                    prefix: "setup1".into(),
                    title: "Test Ceremony".into(),
                    description: "desc".into(),
                    start_date: 0,
                    end_date: 1_000_000,
                    ceremony_type: CeremonyType::Phase2,
                    timeout_mechanism_type: TimeoutMechanismType::Fixed,
                    penalty_minutes: 60,
                    circuits: vec![circuit_input("circuitA")],
                },
            )
            .await
            .unwrap();

        // setup_ceremony leaves the ceremony SCHEDULED; open it directly for
        // tests that don't exercise the scheduler.
        let mut ceremony = engine.load_ceremony(&ceremony_id).await.unwrap();
        ceremony.state = CeremonyState::Opened;
        engine.store.commit(Batch::new().put_ceremony(ceremony)).await.unwrap();

        let bucket = engine.create_bucket(COORDINATOR_TOKEN, &ceremony_id).await.unwrap();
        let circuit = engine.sorted_circuits(&ceremony_id).await.unwrap().remove(0);
        engine.artifacts.put_object(&bucket, &circuit.files.initial_zkey_storage_path, vec![0u8; 128]).await.unwrap();
        engine.artifacts.put_object(&bucket, "setup1/ptau/pot.ptau", vec![1u8; 16]).await.unwrap();

        ceremony_id
    }

    #[tokio::test]
    async fn solo_contributor_joins_and_becomes_the_current_contributor() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let engine = build_engine(dir.path(), clock);
        let ceremony_id = setup_one_circuit_ceremony(&engine).await;

        let eligible = engine.check_participant_for_ceremony(ALICE_TOKEN, &ceremony_id).await.unwrap();
        assert!(eligible);

        let alice = engine.load_participant(&ceremony_id, &"alice".into()).await.unwrap();
        assert_eq!(alice.status, ParticipantStatus::Contributing);

        let circuit = engine.sorted_circuits(&ceremony_id).await.unwrap().remove(0);
        assert_eq!(circuit.waiting_queue.current_contributor, Some("alice".into()));
    }

    #[tokio::test]
    async fn contribution_snapshot_resolves_the_assigned_circuit() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let engine = build_engine(dir.path(), clock);
        let ceremony_id = setup_one_circuit_ceremony(&engine).await;
        engine.check_participant_for_ceremony(ALICE_TOKEN, &ceremony_id).await.unwrap();

        let snapshot = engine.get_contribution_snapshot(ALICE_TOKEN, &ceremony_id).await.unwrap();
        assert_eq!(snapshot.ceremony_prefix, "setup1");
        assert_eq!(snapshot.circuit_prefix, "circuitA");
        assert_eq!(snapshot.pot_storage_path, "pot.ptau");
        assert_eq!(snapshot.zkey_index_width, 5);
        assert_eq!(snapshot.completed_contributions, 0);
        assert_eq!(snapshot.participant_status, ParticipantStatus::Contributing);
        assert!(snapshot.upload_id.is_none());
    }

    #[tokio::test]
    async fn solo_contributor_completes_the_full_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let engine = build_engine(dir.path(), clock);
        let ceremony_id = setup_one_circuit_ceremony(&engine).await;

        engine.check_participant_for_ceremony(ALICE_TOKEN, &ceremony_id).await.unwrap();
        for _ in 0..4 {
            engine.progress_to_next_contribution_step(ALICE_TOKEN, &ceremony_id).await.unwrap();
        }
        let alice = engine.load_participant(&ceremony_id, &"alice".into()).await.unwrap();
        assert_eq!(alice.contribution_step, Some(ceremony_primitives::ContributionStep::Verifying));

        let circuit = engine.sorted_circuits(&ceremony_id).await.unwrap().remove(0);
        let bucket = bucket_for(&engine, &ceremony_id).await;
        let candidate = paths::contribution_zkey_path("setup1", "circuitA", "00001");
        let crypto = MockZkeyCryptoCore::default();
        let previous = engine.artifacts.get_object(&bucket, &circuit.files.initial_zkey_storage_path).await.unwrap();
        let output = crypto.contribute(&previous, b"alice-entropy");
        engine.artifacts.put_object(&bucket, &candidate, output.zkey).await.unwrap();

        let outcome = engine
            .verify_contribution(
                ALICE_TOKEN,
                &ceremony_id,
                VerifyContributionInput { circuit_id: circuit.id.clone(), contribution_computation_time_millis: 1_000, gh_username: "alice".into() },
            )
            .await
            .unwrap();
        assert!(outcome.valid);

        engine.progress_to_next_contribution_step(ALICE_TOKEN, &ceremony_id).await.unwrap();
        let alice = engine.load_participant(&ceremony_id, &"alice".into()).await.unwrap();
        assert_eq!(alice.status, ParticipantStatus::Done);
        assert!(alice.is_done(1));
    }

    async fn bucket_for(engine: &CoordinatorEngine, ceremony_id: &CeremonyId) -> String {
        let ceremony = engine.load_ceremony(ceremony_id).await.unwrap();
        CoordinatorEngine::bucket_of(&ceremony)
    }

    #[tokio::test]
    async fn second_contributor_waits_until_the_first_is_dequeued() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let engine = build_engine(dir.path(), clock);
        let ceremony_id = setup_one_circuit_ceremony(&engine).await;

        engine.check_participant_for_ceremony(ALICE_TOKEN, &ceremony_id).await.unwrap();
        let mut circuit = engine.sorted_circuits(&ceremony_id).await.unwrap().remove(0);
        let mut bob = Participant::created("bob".into());
        queue::enqueue(&mut circuit, &mut bob, 0);
        assert_eq!(bob.status, ParticipantStatus::Waiting);
        assert_eq!(circuit.waiting_queue.contributors, vec!["alice".into(), "bob".into()]);
    }

    #[tokio::test]
    async fn expired_contributor_is_evicted_and_successor_promoted() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let engine = build_engine(dir.path(), clock.clone());
        let ceremony_id = setup_one_circuit_ceremony(&engine).await;

        engine.check_participant_for_ceremony(ALICE_TOKEN, &ceremony_id).await.unwrap();

        let mut circuit = engine.sorted_circuits(&ceremony_id).await.unwrap().remove(0);
        let mut bob = Participant::created("bob".into());
        queue::enqueue(&mut circuit, &mut bob, 0);
        engine.store.commit(Batch::new().put_circuit(ceremony_id.clone(), circuit).put_participant(ceremony_id.clone(), bob)).await.unwrap();

        clock.advance(60_001);
        let evicted = engine.check_and_remove_blocking_contributor_job().await.unwrap();
        assert_eq!(evicted, 1);

        let alice = engine.load_participant(&ceremony_id, &"alice".into()).await.unwrap();
        assert_eq!(alice.status, ParticipantStatus::TimedOut);
        let bob = engine.load_participant(&ceremony_id, &"bob".into()).await.unwrap();
        assert_eq!(bob.status, ParticipantStatus::Contributing);

        let circuit = engine.sorted_circuits(&ceremony_id).await.unwrap().remove(0);
        assert_eq!(circuit.waiting_queue.current_contributor, Some("bob".into()));
    }

    #[tokio::test]
    async fn scheduler_opens_and_closes_ceremonies_on_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(500));
        let engine = build_engine(dir.path(), clock.clone());

        let ceremony_id = engine
            .setup_ceremony(
                COORDINATOR_TOKEN,
                SetupCeremonyInput {
                    prefix: "setup2".into(),
                    title: "Scheduled".into(),
                    description: "d".into(),
                    start_date: 1_000,
                    end_date: 2_000,
                    ceremony_type: CeremonyType::Phase2,
                    timeout_mechanism_type: TimeoutMechanismType::Fixed,
                    penalty_minutes: 60,
                    circuits: vec![circuit_input("circuitB")],
                },
            )
            .await
            .unwrap();

        assert_eq!(engine.start_ceremony_job().await.unwrap(), 0);
        clock.set(1_500);
        assert_eq!(engine.start_ceremony_job().await.unwrap(), 1);
        assert_eq!(engine.load_ceremony(&ceremony_id).await.unwrap().state, CeremonyState::Opened);

        clock.set(2_500);
        assert_eq!(engine.stop_ceremony_job().await.unwrap(), 1);
        assert_eq!(engine.load_ceremony(&ceremony_id).await.unwrap().state, CeremonyState::Closed);
    }

    #[tokio::test]
    async fn finalize_circuit_and_ceremony_happy_path() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let engine = build_engine(dir.path(), clock);
        let ceremony_id = setup_one_circuit_ceremony(&engine).await;

        engine.check_participant_for_ceremony(ALICE_TOKEN, &ceremony_id).await.unwrap();
        for _ in 0..4 {
            engine.progress_to_next_contribution_step(ALICE_TOKEN, &ceremony_id).await.unwrap();
        }
        let circuit = engine.sorted_circuits(&ceremony_id).await.unwrap().remove(0);
        let bucket = bucket_for(&engine, &ceremony_id).await;
        let crypto = MockZkeyCryptoCore::default();
        let previous = engine.artifacts.get_object(&bucket, &circuit.files.initial_zkey_storage_path).await.unwrap();
        let output = crypto.contribute(&previous, b"alice-entropy");
        let candidate = paths::contribution_zkey_path("setup1", "circuitA", "00001");
        engine.artifacts.put_object(&bucket, &candidate, output.zkey).await.unwrap();
        engine
            .verify_contribution(
                ALICE_TOKEN,
                &ceremony_id,
                VerifyContributionInput { circuit_id: circuit.id.clone(), contribution_computation_time_millis: 1_000, gh_username: "alice".into() },
            )
            .await
            .unwrap();
        engine.progress_to_next_contribution_step(ALICE_TOKEN, &ceremony_id).await.unwrap();

        let mut ceremony = engine.load_ceremony(&ceremony_id).await.unwrap();
        ceremony.state = CeremonyState::Closed;
        engine.store.commit(Batch::new().put_ceremony(ceremony)).await.unwrap();

        engine
            .finalize_circuit(COORDINATOR_TOKEN, &ceremony_id, FinalizeCircuitInput { circuit_id: circuit.id.clone(), beacon: vec![9u8; 32] })
            .await
            .unwrap();
        engine.finalize_ceremony(COORDINATOR_TOKEN, &ceremony_id).await.unwrap();

        let ceremony = engine.load_ceremony(&ceremony_id).await.unwrap();
        assert_eq!(ceremony.state, CeremonyState::Finalized);
        let alice = engine.load_participant(&ceremony_id, &"alice".into()).await.unwrap();
        assert_eq!(alice.status, ParticipantStatus::Finalized);
    }

    #[tokio::test]
    async fn invalid_contribution_still_burns_the_slot_and_advances() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let engine = build_engine(dir.path(), clock);
        let ceremony_id = setup_one_circuit_ceremony(&engine).await;

        engine.check_participant_for_ceremony(ALICE_TOKEN, &ceremony_id).await.unwrap();
        for _ in 0..4 {
            engine.progress_to_next_contribution_step(ALICE_TOKEN, &ceremony_id).await.unwrap();
        }

        let circuit = engine.sorted_circuits(&ceremony_id).await.unwrap().remove(0);
        let bucket = bucket_for(&engine, &ceremony_id).await;
        let candidate = paths::contribution_zkey_path("setup1", "circuitA", "00001");
        let crypto = MockZkeyCryptoCore::default();
        // Derived from the wrong predecessor, so it is well-formed but fails
        // chain verification against the circuit's actual initial zkey.
        let output = crypto.contribute(b"not-the-real-initial-zkey", b"alice-entropy");
        engine.artifacts.put_object(&bucket, &candidate, output.zkey).await.unwrap();

        let outcome = engine
            .verify_contribution(
                ALICE_TOKEN,
                &ceremony_id,
                VerifyContributionInput { circuit_id: circuit.id.clone(), contribution_computation_time_millis: 1_000, gh_username: "alice".into() },
            )
            .await
            .unwrap();
        assert!(!outcome.valid);

        let alice = engine.load_participant(&ceremony_id, &"alice".into()).await.unwrap();
        assert_eq!(alice.status, ParticipantStatus::Contributed);
        assert_eq!(alice.contribution_progress, 1);
        assert_eq!(alice.contributions.len(), 1);

        engine.progress_to_next_contribution_step(ALICE_TOKEN, &ceremony_id).await.unwrap();
        let alice = engine.load_participant(&ceremony_id, &"alice".into()).await.unwrap();
        assert_eq!(alice.status, ParticipantStatus::Done);
        assert!(alice.is_done(1));

        let circuit = engine.sorted_circuits(&ceremony_id).await.unwrap().remove(0);
        assert_eq!(circuit.waiting_queue.completed_contributions, 0);
        assert_eq!(circuit.waiting_queue.failed_contributions, 1);
        assert_eq!(circuit.waiting_queue.current_contributor, None);
    }

    #[tokio::test]
    async fn setup_ceremony_rejects_duplicate_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let engine = build_engine(dir.path(), clock);
        setup_one_circuit_ceremony(&engine).await;

        let err = engine
            .setup_ceremony(
                COORDINATOR_TOKEN,
                SetupCeremonyInput {
                    prefix: "setup1".into(),
                    title: "Collides With The First".into(),
                    description: "desc".into(),
                    start_date: 0,
                    end_date: 1_000_000,
                    ceremony_type: CeremonyType::Phase2,
                    timeout_mechanism_type: TimeoutMechanismType::Fixed,
                    penalty_minutes: 60,
                    circuits: vec![circuit_input("circuitC")],
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), crate::errors::ErrorKind::Precondition);
    }
}
