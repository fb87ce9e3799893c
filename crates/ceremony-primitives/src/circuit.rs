use serde::{Deserialize, Serialize};

use crate::ids::{CircuitId, ParticipantId};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CircuitMetadata {
    pub curve: String,
    pub wires: u64,
    pub constraints: u64,
    /// Number of powers-of-tau entries the circuit was compiled against.
    pub pot: u64,
}

/// Object-store paths and BLAKE2b hashes of the artifacts a circuit is
/// seeded with. Hashes are hex-encoded BLAKE2b-512 digests.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CircuitFiles {
    pub r1cs_storage_path: String,
    pub r1cs_blake2b_hash: String,
    pub wasm_storage_path: String,
    pub wasm_blake2b_hash: String,
    pub initial_zkey_storage_path: String,
    pub initial_zkey_blake2b_hash: String,
    pub pot_storage_path: String,
    pub pot_blake2b_hash: String,
}

/// Running averages, in milliseconds. Updated after every verified
/// contribution via `new = (old + sample) / 2` (or `sample` if `old == 0`).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct AvgTimings {
    pub full_contribution: i64,
    pub verify_cloud_function: i64,
    pub contribution_computation: i64,
}

impl AvgTimings {
    pub fn update(current: i64, sample: i64) -> i64 {
        if current > 0 {
            (current + sample) / 2
        } else {
            sample
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WaitingQueue {
    /// FIFO admission order; `contributors[0]` is always the current
    /// contributor when non-empty.
    pub contributors: Vec<ParticipantId>,
    pub current_contributor: Option<ParticipantId>,
    pub completed_contributions: u64,
    pub failed_contributions: u64,
}

impl WaitingQueue {
    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty() && self.current_contributor.is_none()
    }

    pub fn total_attempts(&self) -> u64 {
        self.completed_contributions + self.failed_contributions
    }
}

/// Either a dynamically computed budget (`avgTimings`-derived) or a fixed
/// time window, selected by the owning ceremony's `timeoutMechanismType`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum TimeoutWindow {
    Dynamic { tolerance_pct: u8 },
    Fixed { window_millis: i64 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Circuit {
    pub id: CircuitId,
    pub prefix: String,
    /// 1..N, contiguous and unique within the owning ceremony.
    pub sequence_position: u32,
    pub metadata: CircuitMetadata,
    pub files: CircuitFiles,
    pub avg_timings: AvgTimings,
    pub waiting_queue: WaitingQueue,
    pub timeout_window: TimeoutWindow,
}

impl Circuit {
    /// Invariant 1 & 2 of the testable properties: the queue's head is the
    /// current contributor, and it isn't present twice.
    pub fn queue_is_consistent(&self) -> bool {
        let head_matches = match (&self.waiting_queue.current_contributor, self.waiting_queue.contributors.first()) {
            (Some(cur), Some(head)) => cur == head,
            (None, None) => true,
            _ => false,
        };
        let mut seen = std::collections::HashSet::new();
        let no_dupes = self.waiting_queue.contributors.iter().all(|p| seen.insert(p));
        head_matches && no_dupes
    }
}
