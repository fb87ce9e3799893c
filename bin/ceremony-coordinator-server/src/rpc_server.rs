//! Bootstraps an RPC server for the ceremony coordination engine, exactly as
//! `bin/prover-client/src/rpc_server.rs` bootstraps the prover client's: a
//! `jsonrpsee::server::ServerBuilder` serving one merged `RpcModule`.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use ceremony_core::{
    CircuitSetupInput, CoordinatorEngine, CoordinatorError, ErrorKind, FinalizeCircuitInput, SetupCeremonyInput,
    VerifyContributionInput,
};
use ceremony_primitives::{CeremonyId, CircuitFiles, CircuitMetadata, TimeoutWindow, UploadedChunk};
use ceremony_rpc_api::{
    CeremonyApiServer, CheckParticipantForCeremonyResponse, CircuitSetup, CompleteMultiPartUploadRequest,
    CompleteMultiPartUploadResponse, ContributionSnapshotResponse, CreateBucketResponse, FinalizeCircuitRequest,
    GenerateGetObjectPreSignedUrlRequest, GenerateGetObjectPreSignedUrlResponse, GeneratePreSignedUrlsPartsRequest,
    GeneratePreSignedUrlsPartsResponse, PermanentlyStoreContributionRequest, SetupCeremonyRequest, SetupCeremonyResponse,
    StartMultiPartUploadRequest, StartMultiPartUploadResponse, UploadedPartDto, VerifyContributionRequest,
    VerifyContributionResponse,
};
use jsonrpsee::core::RpcResult;
use jsonrpsee::types::ErrorObjectOwned;
use tokio::sync::oneshot;
use tracing::{info, warn};

fn rpc_error(err: CoordinatorError) -> ErrorObjectOwned {
    let code = match err.kind() {
        ErrorKind::Authentication => -32001,
        ErrorKind::Precondition => -32002,
        ErrorKind::NotFound => -32004,
        ErrorKind::TransientIo => -32005,
        ErrorKind::Configuration => -32006,
    };
    ErrorObjectOwned::owned::<()>(code, err.to_string(), None)
}

fn circuit_setup_input(wire: CircuitSetup, default_tolerance_pct: u8) -> CircuitSetupInput {
    let timeout_window = match (wire.dynamic_tolerance_pct, wire.fixed_window_millis) {
        (Some(tolerance_pct), _) => TimeoutWindow::Dynamic { tolerance_pct },
        (None, Some(window_millis)) => TimeoutWindow::Fixed { window_millis },
        (None, None) => TimeoutWindow::Dynamic { tolerance_pct: default_tolerance_pct },
    };
    CircuitSetupInput {
        prefix: wire.prefix,
        sequence_position: wire.sequence_position,
        metadata: CircuitMetadata { curve: wire.curve, wires: wire.wires, constraints: wire.constraints, pot: wire.pot },
        files: CircuitFiles {
            r1cs_storage_path: wire.r1cs_storage_path,
            wasm_storage_path: wire.wasm_storage_path,
            initial_zkey_storage_path: wire.initial_zkey_storage_path,
            pot_storage_path: wire.pot_storage_path,
            ..Default::default()
        },
        timeout_window,
    }
}

/// Implements [`CeremonyApiServer`] over a single in-process
/// [`CoordinatorEngine`]. Every method does nothing but translate wire DTOs
/// to the engine's plain input structs and translate the result (or error)
/// back.
#[derive(Clone)]
pub struct CeremonyRpcImpl {
    engine: Arc<CoordinatorEngine>,
}

impl CeremonyRpcImpl {
    pub fn new(engine: Arc<CoordinatorEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl CeremonyApiServer for CeremonyRpcImpl {
    async fn setup_ceremony(&self, bearer_token: String, request: SetupCeremonyRequest) -> RpcResult<SetupCeremonyResponse> {
        let config = self.engine.config();
        let default_tolerance_pct = config.timeout_tolerance_pct;
        let circuits =
            request.circuits.into_iter().map(|c| circuit_setup_input(c, default_tolerance_pct)).collect::<Vec<_>>();
        let input = SetupCeremonyInput {
            prefix: request.prefix,
            title: request.title,
            description: request.description,
            start_date: request.start_date,
            end_date: request.end_date,
            ceremony_type: request.ceremony_type,
            timeout_mechanism_type: request.timeout_mechanism_type,
            penalty_minutes: request.penalty_minutes.unwrap_or(config.retry_penalty_minutes),
            circuits,
        };
        let ceremony_id = self.engine.setup_ceremony(&bearer_token, input).await.map_err(rpc_error)?;
        Ok(SetupCeremonyResponse { ceremony_id: ceremony_id.to_string() })
    }

    async fn create_bucket(&self, bearer_token: String, ceremony_id: CeremonyId) -> RpcResult<CreateBucketResponse> {
        let bucket_name = self.engine.create_bucket(&bearer_token, &ceremony_id).await.map_err(rpc_error)?;
        Ok(CreateBucketResponse { bucket_name })
    }

    async fn check_participant_for_ceremony(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
    ) -> RpcResult<CheckParticipantForCeremonyResponse> {
        let eligible = self.engine.check_participant_for_ceremony(&bearer_token, &ceremony_id).await.map_err(rpc_error)?;
        Ok(CheckParticipantForCeremonyResponse { eligible })
    }

    async fn progress_to_next_contribution_step(&self, bearer_token: String, ceremony_id: CeremonyId) -> RpcResult<()> {
        self.engine.progress_to_next_contribution_step(&bearer_token, &ceremony_id).await.map_err(rpc_error)
    }

    async fn resume_contribution_after_timeout_expiration(&self, bearer_token: String, ceremony_id: CeremonyId) -> RpcResult<()> {
        self.engine.resume_contribution_after_timeout_expiration(&bearer_token, &ceremony_id).await.map_err(rpc_error)
    }

    async fn temporary_store_upload_id(&self, bearer_token: String, ceremony_id: CeremonyId, upload_id: String) -> RpcResult<()> {
        self.engine.temporary_store_upload_id(&bearer_token, &ceremony_id, upload_id).await.map_err(rpc_error)
    }

    async fn temporary_store_chunk_data(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
        e_tag: String,
        part_number: u32,
    ) -> RpcResult<()> {
        self.engine.temporary_store_chunk_data(&bearer_token, &ceremony_id, e_tag, part_number).await.map_err(rpc_error)
    }

    async fn permanently_store_current_contribution_time_and_hash(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
        request: PermanentlyStoreContributionRequest,
    ) -> RpcResult<()> {
        self.engine
            .permanently_store_current_contribution_time_and_hash(
                &bearer_token,
                &ceremony_id,
                request.contribution_computation_time_millis,
                request.last_zkey_blake2b_hash,
            )
            .await
            .map_err(rpc_error)
    }

    async fn verify_contribution(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
        request: VerifyContributionRequest,
    ) -> RpcResult<VerifyContributionResponse> {
        let input = VerifyContributionInput {
            circuit_id: request.circuit_id.into(),
            contribution_computation_time_millis: request.contribution_computation_time_millis,
            gh_username: request.gh_username,
        };
        let outcome = self.engine.verify_contribution(&bearer_token, &ceremony_id, input).await.map_err(rpc_error)?;
        Ok(VerifyContributionResponse {
            valid: outcome.valid,
            verification_computation_time_millis: outcome.verification_computation_time_millis,
        })
    }

    async fn finalize_circuit(&self, bearer_token: String, ceremony_id: CeremonyId, request: FinalizeCircuitRequest) -> RpcResult<()> {
        let beacon = hex::decode(&request.beacon)
            .map_err(|e| rpc_error(CoordinatorError::InvalidRequest(format!("beacon must be hex-encoded: {e}"))))?;
        let input = FinalizeCircuitInput { circuit_id: request.circuit_id.into(), beacon };
        self.engine.finalize_circuit(&bearer_token, &ceremony_id, input).await.map_err(rpc_error)
    }

    async fn finalize_ceremony(&self, bearer_token: String, ceremony_id: CeremonyId) -> RpcResult<()> {
        self.engine.finalize_ceremony(&bearer_token, &ceremony_id).await.map_err(rpc_error)
    }

    async fn start_multi_part_upload(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
        request: StartMultiPartUploadRequest,
    ) -> RpcResult<StartMultiPartUploadResponse> {
        let upload_id =
            self.engine.start_multi_part_upload(&bearer_token, &ceremony_id, &request.object_key).await.map_err(rpc_error)?;
        Ok(StartMultiPartUploadResponse { upload_id })
    }

    async fn generate_pre_signed_urls_parts(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
        request: GeneratePreSignedUrlsPartsRequest,
    ) -> RpcResult<GeneratePreSignedUrlsPartsResponse> {
        let urls = self
            .engine
            .generate_pre_signed_urls_parts(&bearer_token, &ceremony_id, &request.object_key, &request.upload_id, request.number_of_parts)
            .await
            .map_err(rpc_error)?;
        Ok(GeneratePreSignedUrlsPartsResponse { urls: urls.into_iter().map(|u| u.url).collect() })
    }

    async fn complete_multi_part_upload(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
        request: CompleteMultiPartUploadRequest,
    ) -> RpcResult<CompleteMultiPartUploadResponse> {
        let parts = request.parts.into_iter().map(|p| UploadedChunk { e_tag: p.e_tag, part_number: p.part_number }).collect();
        let object_location = self
            .engine
            .complete_multi_part_upload(&bearer_token, &ceremony_id, &request.object_key, &request.upload_id, parts)
            .await
            .map_err(rpc_error)?;
        Ok(CompleteMultiPartUploadResponse { object_location })
    }

    async fn generate_get_object_pre_signed_url(
        &self,
        bearer_token: String,
        ceremony_id: CeremonyId,
        request: GenerateGetObjectPreSignedUrlRequest,
    ) -> RpcResult<GenerateGetObjectPreSignedUrlResponse> {
        let presigned = self
            .engine
            .generate_get_object_pre_signed_url(&bearer_token, &ceremony_id, &request.object_key)
            .await
            .map_err(rpc_error)?;
        Ok(GenerateGetObjectPreSignedUrlResponse { url: presigned.url })
    }

    async fn get_contribution_snapshot(&self, bearer_token: String, ceremony_id: CeremonyId) -> RpcResult<ContributionSnapshotResponse> {
        let snapshot = self.engine.get_contribution_snapshot(&bearer_token, &ceremony_id).await.map_err(rpc_error)?;
        Ok(ContributionSnapshotResponse {
            ceremony_prefix: snapshot.ceremony_prefix,
            ceremony_state: snapshot.ceremony_state,
            circuit_id: snapshot.circuit_id.to_string(),
            circuit_prefix: snapshot.circuit_prefix,
            pot_storage_path: snapshot.pot_storage_path,
            initial_zkey_storage_path: snapshot.initial_zkey_storage_path,
            zkey_index_width: snapshot.zkey_index_width,
            chunk_size_mb: snapshot.chunk_size_mb,
            completed_contributions: snapshot.completed_contributions,
            participant_status: snapshot.participant_status,
            contribution_step: snapshot.contribution_step,
            upload_id: snapshot.upload_id,
            chunks: snapshot.chunks.into_iter().map(|c| UploadedPartDto { e_tag: c.e_tag, part_number: c.part_number }).collect(),
        })
    }
}

/// Starts the RPC server and blocks until `stop_rx` fires, mirroring
/// `bin/prover-client/src/rpc_server.rs::start`.
pub async fn start(rpc_impl: CeremonyRpcImpl, rpc_url: String, stop_rx: oneshot::Receiver<()>) -> anyhow::Result<()> {
    let rpc_module = rpc_impl.into_rpc();

    info!("binding ceremony coordination RPC server to {:?}", rpc_url);
    let rpc_server = jsonrpsee::server::ServerBuilder::new().build(&rpc_url).await.context("build ceremony coordinator rpc server")?;

    let rpc_handle = rpc_server.start(rpc_module);
    info!("ceremony coordination RPC server started at: {}", rpc_url);

    let _ = stop_rx.await;
    info!("stopping ceremony coordination RPC server");

    if rpc_handle.stop().is_err() {
        warn!("rpc server already stopped");
    }
    Ok(())
}
