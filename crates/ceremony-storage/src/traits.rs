//! Trait definition for the Artifact Store Adapter.
//!
//! A small set of async methods a real S3-compatible client would implement
//! against actual pre-signed URLs, backed here by
//! [`crate::fs::LocalArtifactStore`] for local/dev runs and tests.

use std::time::Duration;

use async_trait::async_trait;
use ceremony_primitives::{MillisTimestamp, UploadedChunk};

use crate::errors::StorageResult;

/// A time-limited URL returned to a client for a single HTTP verb/object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: MillisTimestamp,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Creates the ceremony's backing bucket. Idempotent creation is not
    /// supported — calling twice for the same bucket is `ALREADY_EXISTS`.
    async fn create_bucket(&self, bucket: &str) -> StorageResult<()>;

    async fn object_exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// Writes `data` to `key` directly. Used for small artifacts the
    /// coordinator produces server-side (beacon zkeys, verification keys,
    /// verifier contracts) rather than through the multi-part protocol.
    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> StorageResult<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Opens a multi-part upload session, returning an opaque `uploadId`.
    async fn start_multipart_upload(&self, bucket: &str, key: &str) -> StorageResult<String>;

    /// Issues one pre-signed PUT URL per part, each valid for
    /// `expiration` from now.
    async fn generate_presigned_urls_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        number_of_parts: u32,
        expiration: Duration,
        now: MillisTimestamp,
    ) -> StorageResult<Vec<PresignedUrl>>;

    /// Performs the PUT a client would issue against a pre-signed part URL,
    /// returning the part's ETag. In a real deployment this is an HTTP PUT
    /// the client makes directly to the object store; the reference store
    /// exposes it here so the reference CLI client can drive the same
    /// protocol without a real network hop.
    async fn upload_part(&self, presigned: &PresignedUrl, data: Vec<u8>, now: MillisTimestamp) -> StorageResult<String>;

    /// Assembles the uploaded parts into the final object, in `PartNumber`
    /// order, and closes the upload session.
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedChunk>,
    ) -> StorageResult<String>;

    /// Issues a pre-signed GET URL for `key`.
    async fn generate_get_object_presigned_url(
        &self,
        bucket: &str,
        key: &str,
        expiration: Duration,
        now: MillisTimestamp,
    ) -> StorageResult<PresignedUrl>;

    /// Performs the GET a client would issue against a pre-signed URL.
    async fn download(&self, presigned: &PresignedUrl, now: MillisTimestamp) -> StorageResult<Vec<u8>>;
}
