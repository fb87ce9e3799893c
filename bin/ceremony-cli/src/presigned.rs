//! Resolves the reference Artifact Store's `presigned://` URLs against the
//! shared artifact directory.
//!
//! A production client would treat a pre-signed URL as an opaque signed HTTP
//! endpoint. The reference store encodes bucket, key, upload id and part
//! number directly into the URL string instead of signing anything (see
//! `ceremony_storage::fs::LocalArtifactStore`), so a co-located reference
//! client can recover the write location without a second RPC round trip.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use blake2::{Blake2b512, Digest};

fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split('?').nth(1)?;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

fn bucket_and_key(url: &str) -> Result<(String, String)> {
    let rest = url.strip_prefix("presigned://").ok_or_else(|| anyhow!("not a presigned:// url: {url}"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    let (bucket, key) = path.split_once('/').ok_or_else(|| anyhow!("malformed presigned url: {url}"))?;
    Ok((bucket.to_string(), key.to_string()))
}

pub fn blake2b512_hex(data: &[u8]) -> String {
    let mut hasher = Blake2b512::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Writes `data` to the part slot a `generatePreSignedUrlsParts` URL names,
/// returning the ETag the coordinator's store will expect back in
/// `completeMultiPartUpload`.
pub async fn put_part(artifact_dir: &str, presigned_url: &str, data: &[u8]) -> Result<String> {
    let upload_id = query_param(presigned_url, "upload").ok_or_else(|| anyhow!("presigned url missing upload id: {presigned_url}"))?;
    let part_number = query_param(presigned_url, "part").ok_or_else(|| anyhow!("presigned url missing part number: {presigned_url}"))?;

    let parts_dir: PathBuf = Path::new(artifact_dir).join(".multipart").join(&upload_id);
    tokio::fs::create_dir_all(&parts_dir).await.context("create multipart part directory")?;
    tokio::fs::write(parts_dir.join(&part_number), data).await.context("write multipart part")?;

    Ok(blake2b512_hex(data))
}

/// Reads the object a `generateGetObjectPreSignedUrl` URL names directly off
/// the shared artifact directory.
pub async fn get_object(artifact_dir: &str, presigned_url: &str) -> Result<Vec<u8>> {
    let (bucket, key) = bucket_and_key(presigned_url)?;
    let path = Path::new(artifact_dir).join(&bucket).join(&key);
    tokio::fs::read(&path).await.with_context(|| format!("read object at {}", path.display()))
}
