use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("candidate zkey does not chain from the supplied previous zkey")]
    VerificationFailed,

    #[error("zkey blob is malformed: {0}")]
    InvalidZkeyFormat(String),

    #[error("{0}")]
    Other(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
