//! Data model shared by every component of the ceremony coordination engine.
//!
//! Nothing in this crate talks to a database, an object store, or the
//! network: it is the set of plain records and enums the rest of the engine
//! passes around and persists.

pub mod attestation;
pub mod ceremony;
pub mod circuit;
pub mod config;
pub mod contribution;
pub mod identity;
pub mod ids;
pub mod participant;
pub mod timeout;

pub use attestation::AttestationRecord;
pub use ceremony::{Ceremony, CeremonyState, CeremonyType, MillisTimestamp, TimeoutMechanismType};
pub use circuit::{AvgTimings, Circuit, CircuitFiles, CircuitMetadata, TimeoutWindow, WaitingQueue};
pub use config::EngineConfig;
pub use contribution::{format_zkey_index, parse_zkey_index, Contribution, ContributionFiles, FINAL_ZKEY_INDEX};
pub use identity::AuthClaim;
pub use ids::{CeremonyId, CircuitId, ContributionId, ParticipantId, TimeoutId};
pub use participant::{
    ContributionStep, Participant, ParticipantContributionRef, ParticipantStatus, TempContributionData,
    UploadedChunk,
};
pub use timeout::{Timeout, TimeoutType};
