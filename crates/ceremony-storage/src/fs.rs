//! Local-filesystem reference implementation of the Artifact Store Adapter.
//!
//! Simulates pre-signed URLs with opaque, single-use tokens resolved against
//! an in-memory table rather than real HTTP signatures — good enough to
//! exercise the resumable multi-part protocol end to end in tests and local
//! runs without standing up an object store.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use blake2::{Blake2b512, Digest};
use ceremony_primitives::{MillisTimestamp, UploadedChunk};
use parking_lot::RwLock;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::{StorageError, StorageResult};
use crate::traits::{ArtifactStore, PresignedUrl};

#[derive(Clone)]
enum PresignedKind {
    PutPart { upload_id: String, part_number: u32 },
    Get,
}

struct PresignedEntry {
    bucket: String,
    key: String,
    kind: PresignedKind,
    expires_at: MillisTimestamp,
}

#[derive(Default)]
struct UploadSession {
    bucket: String,
    key: String,
}

pub struct LocalArtifactStore {
    root: PathBuf,
    buckets: RwLock<HashSet<String>>,
    uploads: RwLock<HashMap<String, UploadSession>>,
    presigned: RwLock<HashMap<String, PresignedEntry>>,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            buckets: RwLock::new(HashSet::new()),
            uploads: RwLock::new(HashMap::new()),
            presigned: RwLock::new(HashMap::new()),
        }
    }

    fn require_bucket(&self, bucket: &str) -> StorageResult<()> {
        if self.buckets.read().contains(bucket) {
            Ok(())
        } else {
            Err(StorageError::BucketNotFound(bucket.to_string()))
        }
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }

    fn parts_dir(&self, upload_id: &str) -> PathBuf {
        self.root.join(".multipart").join(upload_id)
    }

    fn digest_hex(data: &[u8]) -> String {
        let mut hasher = Blake2b512::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        let mut buckets = self.buckets.write();
        if !buckets.insert(bucket.to_string()) {
            return Err(StorageError::BucketAlreadyExists(bucket.to_string()));
        }
        drop(buckets);
        fs::create_dir_all(self.root.join(bucket)).await?;
        Ok(())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        self.require_bucket(bucket)?;
        Ok(fs::try_exists(self.object_path(bucket, key)).await?)
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> StorageResult<()> {
        self.require_bucket(bucket)?;
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        self.require_bucket(bucket)?;
        let path = self.object_path(bucket, key);
        fs::read(&path).await.map_err(|_| StorageError::ObjectNotFound(key.to_string()))
    }

    async fn start_multipart_upload(&self, bucket: &str, key: &str) -> StorageResult<String> {
        self.require_bucket(bucket)?;
        let upload_id = uuid::Uuid::new_v4().to_string();
        self.uploads
            .write()
            .insert(upload_id.clone(), UploadSession { bucket: bucket.to_string(), key: key.to_string() });
        fs::create_dir_all(self.parts_dir(&upload_id)).await?;
        Ok(upload_id)
    }

    async fn generate_presigned_urls_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        number_of_parts: u32,
        expiration: Duration,
        now: MillisTimestamp,
    ) -> StorageResult<Vec<PresignedUrl>> {
        if !self.uploads.read().contains_key(upload_id) {
            return Err(StorageError::UploadNotFound(upload_id.to_string()));
        }
        let expires_at = now + expiration.as_millis() as MillisTimestamp;
        let mut presigned = self.presigned.write();
        let mut urls = Vec::with_capacity(number_of_parts as usize);
        for part_number in 1..=number_of_parts {
            let token = uuid::Uuid::new_v4().to_string();
            let url = format!("presigned://{bucket}/{key}?upload={upload_id}&part={part_number}&token={token}");
            presigned.insert(
                url.clone(),
                PresignedEntry {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    kind: PresignedKind::PutPart { upload_id: upload_id.to_string(), part_number },
                    expires_at,
                },
            );
            urls.push(PresignedUrl { url, expires_at });
        }
        Ok(urls)
    }

    async fn upload_part(&self, presigned: &PresignedUrl, data: Vec<u8>, now: MillisTimestamp) -> StorageResult<String> {
        let (upload_id, part_number) = {
            let table = self.presigned.read();
            let entry = table
                .get(&presigned.url)
                .ok_or_else(|| StorageError::Other(format!("unknown pre-signed url {}", presigned.url)))?;
            if entry.expires_at <= now {
                return Err(StorageError::UrlExpired(presigned.url.clone()));
            }
            match &entry.kind {
                PresignedKind::PutPart { upload_id, part_number } => (upload_id.clone(), *part_number),
                PresignedKind::Get => return Err(StorageError::Other("GET url used for PUT".into())),
            }
        };

        if !self.uploads.read().contains_key(&upload_id) {
            return Err(StorageError::UploadNotFound(upload_id.clone()));
        }

        let e_tag = Self::digest_hex(&data);
        let part_path = self.parts_dir(&upload_id).join(part_number.to_string());
        let mut file = fs::File::create(&part_path).await?;
        file.write_all(&data).await?;
        Ok(e_tag)
    }

    /// Reads each declared part straight off disk rather than trusting an
    /// in-memory map: a real pre-signed-URL PUT lands out of process, so the
    /// only source of truth for what was actually uploaded is the part file
    /// itself.
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedChunk>,
    ) -> StorageResult<String> {
        let session = {
            let mut uploads = self.uploads.write();
            uploads.remove(upload_id).ok_or_else(|| StorageError::UploadNotFound(upload_id.to_string()))?
        };
        if session.bucket != bucket || session.key != key {
            return Err(StorageError::Other("multipart session bucket/key mismatch".into()));
        }

        let mut ordered = parts;
        ordered.sort_by_key(|p| p.part_number);

        let mut assembled = Vec::new();
        for chunk in &ordered {
            let part_path = self.parts_dir(upload_id).join(chunk.part_number.to_string());
            let data = fs::read(&part_path)
                .await
                .map_err(|_| StorageError::MissingPart { upload_id: upload_id.to_string(), part_number: chunk.part_number })?;
            let actual_etag = Self::digest_hex(&data);
            if actual_etag != chunk.e_tag {
                return Err(StorageError::Other(format!(
                    "ETag mismatch for part {}: expected {}, got {}",
                    chunk.part_number, actual_etag, chunk.e_tag
                )));
            }
            assembled.extend_from_slice(&data);
        }

        self.put_object(bucket, key, assembled).await?;
        let _ = fs::remove_dir_all(self.parts_dir(upload_id)).await;
        Ok(format!("{bucket}/{key}"))
    }

    async fn generate_get_object_presigned_url(
        &self,
        bucket: &str,
        key: &str,
        expiration: Duration,
        now: MillisTimestamp,
    ) -> StorageResult<PresignedUrl> {
        self.require_bucket(bucket)?;
        let expires_at = now + expiration.as_millis() as MillisTimestamp;
        let token = uuid::Uuid::new_v4().to_string();
        let url = format!("presigned://{bucket}/{key}?get=1&token={token}");
        self.presigned.write().insert(
            url.clone(),
            PresignedEntry { bucket: bucket.to_string(), key: key.to_string(), kind: PresignedKind::Get, expires_at },
        );
        Ok(PresignedUrl { url, expires_at })
    }

    async fn download(&self, presigned: &PresignedUrl, now: MillisTimestamp) -> StorageResult<Vec<u8>> {
        let (bucket, key) = {
            let table = self.presigned.read();
            let entry = table
                .get(&presigned.url)
                .ok_or_else(|| StorageError::Other(format!("unknown pre-signed url {}", presigned.url)))?;
            if entry.expires_at <= now {
                return Err(StorageError::UrlExpired(presigned.url.clone()));
            }
            if !matches!(entry.kind, PresignedKind::Get) {
                return Err(StorageError::Other("PUT url used for GET".into()));
            }
            (entry.bucket.clone(), entry.key.clone())
        };
        self.get_object(&bucket, &key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn multipart_round_trip_reassembles_bit_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        store.create_bucket("ceremony-1").await.unwrap();

        let key = "circuits/foo/contributions/foo_00001.zkey";
        let upload_id = store.start_multipart_upload("ceremony-1", key).await.unwrap();
        let urls = store
            .generate_presigned_urls_parts("ceremony-1", key, &upload_id, 2, Duration::from_secs(7200), 0)
            .await
            .unwrap();

        let part_a = vec![1u8; 1024];
        let part_b = vec![2u8; 512];
        let etag_a = store.upload_part(&urls[0], part_a.clone(), 10).await.unwrap();
        let etag_b = store.upload_part(&urls[1], part_b.clone(), 10).await.unwrap();

        let location = store
            .complete_multipart_upload(
                "ceremony-1",
                key,
                &upload_id,
                vec![
                    UploadedChunk { e_tag: etag_a, part_number: 1 },
                    UploadedChunk { e_tag: etag_b, part_number: 2 },
                ],
            )
            .await
            .unwrap();
        assert_eq!(location, "ceremony-1/circuits/foo/contributions/foo_00001.zkey");

        let mut expected = part_a;
        expected.extend_from_slice(&part_b);
        let stored = store.get_object("ceremony-1", key).await.unwrap();
        assert_eq!(stored, expected);
    }

    #[tokio::test]
    async fn presigned_get_url_expires() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        store.create_bucket("ceremony-1").await.unwrap();
        store.put_object("ceremony-1", "a.txt", b"hello".to_vec()).await.unwrap();

        let url = store
            .generate_get_object_presigned_url("ceremony-1", "a.txt", Duration::from_secs(1), 0)
            .await
            .unwrap();

        assert_eq!(store.download(&url, 500).await.unwrap(), b"hello");
        assert!(matches!(store.download(&url, 2000).await, Err(StorageError::UrlExpired(_))));
    }
}
