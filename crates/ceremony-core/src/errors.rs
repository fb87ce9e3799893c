use ceremony_crypto::CryptoError;
use ceremony_db::DbError;
use ceremony_storage::StorageError;
use thiserror::Error;

/// Taxonomy a server callable's error falls into, independent of the exact
/// variant — this is what the RPC layer maps onto JSON-RPC error codes
/// without string-matching messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Precondition,
    NotFound,
    TransientIo,
    Configuration,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("ceremony is not open")]
    CeremonyNotOpened,

    #[error("ceremony is not closed")]
    CeremonyNotClosed,

    #[error("precondition failed: {0}")]
    FailedPrecondition(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("record store error: {0}")]
    Db(#[from] DbError),

    #[error("artifact store error: {0}")]
    Storage(#[from] StorageError),

    #[error("cryptographic core error: {0}")]
    Crypto(#[from] CryptoError),
}

impl CoordinatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinatorError::Unauthenticated | CoordinatorError::PermissionDenied(_) => ErrorKind::Authentication,
            CoordinatorError::CeremonyNotOpened
            | CoordinatorError::CeremonyNotClosed
            | CoordinatorError::FailedPrecondition(_)
            | CoordinatorError::InvalidRequest(_) => ErrorKind::Precondition,
            CoordinatorError::NotFound(_) => ErrorKind::NotFound,
            CoordinatorError::Db(_) => match self {
                CoordinatorError::Db(DbError::CeremonyNotFound(_))
                | CoordinatorError::Db(DbError::CircuitNotFound(_, _))
                | CoordinatorError::Db(DbError::ParticipantNotFound(_, _)) => ErrorKind::NotFound,
                CoordinatorError::Db(DbError::DuplicatePrefix(_)) => ErrorKind::Precondition,
                _ => ErrorKind::TransientIo,
            },
            CoordinatorError::Storage(_) => ErrorKind::TransientIo,
            CoordinatorError::Crypto(_) => ErrorKind::Configuration,
            CoordinatorError::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
