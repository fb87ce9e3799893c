//! The callable entry-point surface of the ceremony coordination engine.
//!
//! One method per row of the external-interfaces table: ceremony setup and
//! bucket provisioning (coordinator-only), the participant join/progress
//! calls, the resumable multi-part upload protocol, and coordinator-only
//! finalization. Every method that does not name a `ceremonyId` parameter
//! still operates within the caller's current ceremony/circuit context,
//! which server implementations resolve from the authenticated caller.

use ceremony_primitives::CeremonyId;
use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use crate::types::{
    CheckParticipantForCeremonyResponse, CompleteMultiPartUploadRequest, CompleteMultiPartUploadResponse,
    ContributionSnapshotResponse, CreateBucketResponse, FinalizeCircuitRequest, GenerateGetObjectPreSignedUrlRequest,
    GenerateGetObjectPreSignedUrlResponse, GeneratePreSignedUrlsPartsRequest, GeneratePreSignedUrlsPartsResponse,
    PermanentlyStoreContributionRequest, SetupCeremonyRequest, SetupCeremonyResponse, StartMultiPartUploadRequest,
    StartMultiPartUploadResponse, VerifyContributionRequest, VerifyContributionResponse,
};

#[rpc(server, client, namespace = "ceremony")]
pub trait CeremonyApi {
    /// Coordinator-only. Creates a ceremony in `SCHEDULED` state along with
    /// its circuits.
    #[method(name = "setupCeremony")]
    async fn setup_ceremony(&self, bearer_token: String, request: SetupCeremonyRequest) -> RpcResult<SetupCeremonyResponse>;

    /// Coordinator-only. Provisions the ceremony's backing bucket.
    #[method(name = "createBucket")]
    async fn create_bucket(&self, bearer_token: String, ceremony_id: CeremonyId) -> RpcResult<CreateBucketResponse>;

    /// Joins (or re-joins, after a cleared timeout) the caller into the
    /// ceremony's queue.
    #[method(name = "checkParticipantForCeremony")]
    async fn check_participant_for_ceremony(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
    ) -> RpcResult<CheckParticipantForCeremonyResponse>;

    /// Advances the caller's contribution step (`DOWNLOADING` ->
    /// `COMPUTING` -> `UPLOADING` -> `VERIFYING` -> `COMPLETED`) or, from
    /// `COMPLETED`, moves to the next circuit.
    #[method(name = "progressToNextContributionStep")]
    async fn progress_to_next_contribution_step(&self, bearer_token: String, ceremony_id: CeremonyId) -> RpcResult<()>;

    /// Moves a `TIMEDOUT` participant whose timeout has expired back to
    /// `EXHUMED`/`READY`.
    #[method(name = "resumeContributionAfterTimeoutExpiration")]
    async fn resume_contribution_after_timeout_expiration(&self, bearer_token: String, ceremony_id: CeremonyId) -> RpcResult<()>;

    /// Persists `tempContributionData.uploadId` after the client opens a
    /// multi-part upload.
    #[method(name = "temporaryStoreUploadId")]
    async fn temporary_store_upload_id(&self, bearer_token: String, ceremony_id: CeremonyId, upload_id: String) -> RpcResult<()>;

    /// Persists one `{ETag, PartNumber}` entry after a successful part PUT.
    #[method(name = "temporaryStoreChunkData")]
    async fn temporary_store_chunk_data(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
        e_tag: String,
        part_number: u32,
    ) -> RpcResult<()>;

    /// Persists the computation time and output hash for the caller's
    /// current contribution, ahead of `verifyContribution`.
    #[method(name = "permanentlyStoreCurrentContributionTimeAndHash")]
    async fn permanently_store_current_contribution_time_and_hash(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
        request: PermanentlyStoreContributionRequest,
    ) -> RpcResult<()>;

    /// Runs server-side verification of the caller's uploaded contribution.
    #[method(name = "verifyContribution")]
    async fn verify_contribution(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
        request: VerifyContributionRequest,
    ) -> RpcResult<VerifyContributionResponse>;

    /// Coordinator-only. Runs the beacon contribution for one circuit of a
    /// `CLOSED` ceremony.
    #[method(name = "finalizeCircuit")]
    async fn finalize_circuit(&self, bearer_token: String, ceremony_id: CeremonyId, request: FinalizeCircuitRequest) -> RpcResult<()>;

    /// Coordinator-only. Flips a ceremony to `FINALIZED` once every circuit
    /// has a valid `final` contribution.
    #[method(name = "finalizeCeremony")]
    async fn finalize_ceremony(&self, bearer_token: String, ceremony_id: CeremonyId) -> RpcResult<()>;

    #[method(name = "startMultiPartUpload")]
    async fn start_multi_part_upload(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
        request: StartMultiPartUploadRequest,
    ) -> RpcResult<StartMultiPartUploadResponse>;

    #[method(name = "generatePreSignedUrlsParts")]
    async fn generate_pre_signed_urls_parts(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
        request: GeneratePreSignedUrlsPartsRequest,
    ) -> RpcResult<GeneratePreSignedUrlsPartsResponse>;

    #[method(name = "completeMultiPartUpload")]
    async fn complete_multi_part_upload(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
        request: CompleteMultiPartUploadRequest,
    ) -> RpcResult<CompleteMultiPartUploadResponse>;

    /// Coordinator-only for object keys outside the caller's own active
    /// contribution slot.
    #[method(name = "generateGetObjectPreSignedUrl")]
    async fn generate_get_object_pre_signed_url(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
        request: GenerateGetObjectPreSignedUrlRequest,
    ) -> RpcResult<GenerateGetObjectPreSignedUrlResponse>;

    /// Reads back everything the caller needs to resolve object-store paths
    /// and decide its next move for its currently-assigned circuit.
    #[method(name = "getContributionSnapshot")]
    async fn get_contribution_snapshot(&self, bearer_token: String, ceremony_id: CeremonyId) -> RpcResult<ContributionSnapshotResponse>;
}
