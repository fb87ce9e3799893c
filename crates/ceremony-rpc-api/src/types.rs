//! Wire DTOs for every [`crate::CeremonyApiServer`] entry point.

use ceremony_primitives::{CeremonyState, CeremonyType, ContributionStep, ParticipantStatus, TimeoutMechanismType};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitSetup {
    pub prefix: String,
    pub sequence_position: u32,
    pub curve: String,
    pub wires: u64,
    pub constraints: u64,
    pub pot: u64,
    pub r1cs_storage_path: String,
    pub wasm_storage_path: String,
    pub initial_zkey_storage_path: String,
    pub pot_storage_path: String,
    /// Falls back to the coordinator's configured default tolerance when both
    /// this and `fixed_window_millis` are omitted.
    pub dynamic_tolerance_pct: Option<u8>,
    pub fixed_window_millis: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupCeremonyRequest {
    pub prefix: String,
    pub title: String,
    pub description: String,
    pub start_date: i64,
    pub end_date: i64,
    pub ceremony_type: CeremonyType,
    pub timeout_mechanism_type: TimeoutMechanismType,
    /// Falls back to the coordinator's configured default penalty when omitted.
    #[serde(default)]
    pub penalty_minutes: Option<i64>,
    pub circuits: Vec<CircuitSetup>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupCeremonyResponse {
    pub ceremony_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBucketResponse {
    pub bucket_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckParticipantForCeremonyResponse {
    pub eligible: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermanentlyStoreContributionRequest {
    pub contribution_computation_time_millis: i64,
    pub last_zkey_blake2b_hash: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyContributionRequest {
    pub circuit_id: String,
    pub contribution_computation_time_millis: i64,
    pub gh_username: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyContributionResponse {
    pub valid: bool,
    pub verification_computation_time_millis: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeCircuitRequest {
    pub circuit_id: String,
    /// Hex-encoded public beacon value.
    pub beacon: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMultiPartUploadRequest {
    pub object_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMultiPartUploadResponse {
    pub upload_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePreSignedUrlsPartsRequest {
    pub object_key: String,
    pub upload_id: String,
    pub number_of_parts: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePreSignedUrlsPartsResponse {
    pub urls: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedPartDto {
    pub e_tag: String,
    pub part_number: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMultiPartUploadRequest {
    pub object_key: String,
    pub upload_id: String,
    pub parts: Vec<UploadedPartDto>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMultiPartUploadResponse {
    pub object_location: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateGetObjectPreSignedUrlRequest {
    pub object_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateGetObjectPreSignedUrlResponse {
    pub url: String,
}

/// Everything a contributor client needs to resolve object-store paths and
/// decide its next move for its currently-assigned circuit, without
/// subscribing to document change notifications.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionSnapshotResponse {
    pub ceremony_prefix: String,
    pub ceremony_state: CeremonyState,
    pub circuit_id: String,
    pub circuit_prefix: String,
    pub pot_storage_path: String,
    pub initial_zkey_storage_path: String,
    pub zkey_index_width: usize,
    pub chunk_size_mb: u64,
    pub completed_contributions: u64,
    pub participant_status: ParticipantStatus,
    pub contribution_step: Option<ContributionStep>,
    pub upload_id: Option<String>,
    pub chunks: Vec<UploadedPartDto>,
}
