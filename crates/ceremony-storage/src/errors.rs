use thiserror::Error;

/// Errors surfaced by the Artifact Store Adapter.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket {0:?} already exists")]
    BucketAlreadyExists(String),

    #[error("bucket {0:?} not found")]
    BucketNotFound(String),

    #[error("object {0:?} not found")]
    ObjectNotFound(String),

    #[error("upload {0:?} not found")]
    UploadNotFound(String),

    #[error("part {part_number} missing for upload {upload_id:?}")]
    MissingPart { upload_id: String, part_number: u32 },

    #[error("pre-signed URL for {0:?} has expired")]
    UrlExpired(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
