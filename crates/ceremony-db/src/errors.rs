use ceremony_primitives::{CeremonyId, CircuitId, ParticipantId};
use thiserror::Error;

/// Errors surfaced by the Record Store Adapter.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("ceremony {0} not found")]
    CeremonyNotFound(CeremonyId),

    #[error("ceremony with prefix {0:?} already exists")]
    DuplicatePrefix(String),

    #[error("circuit {1} not found in ceremony {0}")]
    CircuitNotFound(CeremonyId, CircuitId),

    #[error("participant {1} not found in ceremony {0}")]
    ParticipantNotFound(CeremonyId, ParticipantId),

    #[error("batch commit aborted: {0}")]
    BatchAborted(String),

    #[error("{0}")]
    Other(String),
}

pub type DbResult<T> = Result<T, DbError>;
