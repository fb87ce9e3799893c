use serde::{Deserialize, Serialize};

use crate::ids::CeremonyId;

/// Millisecond unix timestamp. Kept as a plain integer (rather than
/// `chrono::DateTime`) because every comparison in the engine is `now >=
/// startDate`-style and the wire format this was distilled from is epoch
/// millis throughout.
pub type MillisTimestamp = i64;

/// `SCHEDULED -> OPENED -> CLOSED -> FINALIZED`. The older `RUNNING` token
/// seen in some source snapshots is intentionally not represented; `OPENED`
/// is the only name this port uses for that state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CeremonyState {
    Scheduled,
    Opened,
    Closed,
    Finalized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CeremonyType {
    Phase1,
    Phase2,
}

/// Whether a circuit's contribution budget is computed from running averages
/// (`Dynamic`) or fixed ahead of time (`Fixed`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeoutMechanismType {
    Dynamic,
    Fixed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ceremony {
    pub id: CeremonyId,
    /// URL-safe, unique across all ceremonies.
    pub prefix: String,
    pub title: String,
    pub description: String,
    pub start_date: MillisTimestamp,
    pub end_date: MillisTimestamp,
    pub state: CeremonyState,
    pub ceremony_type: CeremonyType,
    pub coordinator_id: String,
    pub timeout_mechanism_type: TimeoutMechanismType,
    /// Eviction penalty, in minutes.
    pub penalty: i64,
}

impl Ceremony {
    pub fn is_open(&self) -> bool {
        self.state == CeremonyState::Opened
    }
}
