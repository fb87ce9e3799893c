use serde::{Deserialize, Serialize};

use crate::{ceremony::MillisTimestamp, ids::TimeoutId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeoutType {
    BlockingContribution,
    BlockingCloudFunction,
}

/// A penalty interval during which an evicted participant cannot rejoin.
/// Invariant: at most one [`Timeout`] with `end_date > now` exists per
/// participant at a time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Timeout {
    pub id: TimeoutId,
    pub start_date: MillisTimestamp,
    pub end_date: MillisTimestamp,
    pub timeout_type: TimeoutType,
}

impl Timeout {
    pub fn is_active(&self, now: MillisTimestamp) -> bool {
        self.end_date > now
    }
}
