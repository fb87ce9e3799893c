use serde::{Deserialize, Serialize};

use crate::{
    ceremony::MillisTimestamp,
    ids::{ContributionId, ParticipantId},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParticipantStatus {
    Created,
    Waiting,
    Ready,
    Contributing,
    Contributed,
    Done,
    Finalizing,
    Finalized,
    TimedOut,
    Exhumed,
}

/// The five-step sub-machine driven inside a single circuit's contribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContributionStep {
    Downloading,
    Computing,
    Uploading,
    Verifying,
    Completed,
}

/// One entry of `PartNumber`/`ETag` persisted after every successful part
/// PUT, so a crashed client can resume from the highest part present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedChunk {
    pub e_tag: String,
    pub part_number: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TempContributionData {
    pub contribution_computation_time: Option<i64>,
    pub upload_id: Option<String>,
    pub chunks: Vec<UploadedChunk>,
}

impl TempContributionData {
    pub fn highest_part_number(&self) -> u32 {
        self.chunks.iter().map(|c| c.part_number).max().unwrap_or(0)
    }
}

/// Summary entry of one completed contribution, as kept on the participant
/// for quick traversal without dereferencing into the circuit's contribution
/// list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParticipantContributionRef {
    pub contribution_id: ContributionId,
    pub computation_time: i64,
    pub hash: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub status: ParticipantStatus,
    /// Index of the *next* circuit to attempt, 0..=N.
    pub contribution_progress: u32,
    pub contribution_step: Option<ContributionStep>,
    pub contributions: Vec<ParticipantContributionRef>,
    pub contribution_started_at: Option<MillisTimestamp>,
    pub verification_started_at: Option<MillisTimestamp>,
    pub temp_contribution_data: TempContributionData,
}

impl Participant {
    pub fn created(id: ParticipantId) -> Self {
        Self {
            id,
            status: ParticipantStatus::Created,
            contribution_progress: 0,
            contribution_step: None,
            contributions: Vec::new(),
            contribution_started_at: None,
            verification_started_at: None,
            temp_contribution_data: TempContributionData::default(),
        }
    }

    pub fn is_done(&self, num_circuits: u32) -> bool {
        self.contribution_progress == num_circuits + 1
            && self.contribution_step == Some(ContributionStep::Completed)
    }

    pub fn has_active_timeout(&self, timeout_end: Option<MillisTimestamp>, now: MillisTimestamp) -> bool {
        matches!(timeout_end, Some(end) if end > now)
    }
}
