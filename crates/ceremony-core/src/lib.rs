//! The ceremony coordination engine.
//!
//! Everything here is wired together in [`engine::CoordinatorEngine`]: the
//! Circuit Queue Manager ([`queue`]), the participant state machine
//! ([`participant`]), the Verification Worker ([`verification`]), the
//! Timeout Controller ([`timeout_controller`]), the resumable multi-part
//! upload protocol ([`multipart`]), ceremony setup ([`setup`]) and
//! finalization ([`finalize`]). A server binary does nothing but resolve
//! transport concerns and call through to [`engine::CoordinatorEngine`].

pub mod attestation;
pub mod engine;
pub mod errors;
pub mod finalize;
pub mod identity;
pub mod multipart;
pub mod participant;
pub mod paths;
pub mod queue;
pub mod setup;
pub mod timeout_controller;
pub mod verification;

pub use attestation::{AttestationPublisher, LocalFileAttestationPublisher, NoopAttestationPublisher};
pub use engine::{
    CircuitSetupInput, Clock, ContributionSnapshot, CoordinatorEngine, FinalizeCircuitInput, ManualClock, SetupCeremonyInput,
    SystemClock, VerifyContributionInput, VerifyContributionOutcome,
};
pub use errors::{CoordinatorError, CoordinatorResult, ErrorKind};
pub use identity::{AllowlistIdentityProvider, IdentityProvider};
