//! The attestation publisher collaborator.
//!
//! The real system hands a completed ceremony's summary to a public gist;
//! that publish step is explicitly out of scope (§1's "optional attestation
//! publisher (public gist)"). [`AttestationPublisher`] is the seam: a
//! publish failure is logged and surfaced separately, never rolled back
//! into ceremony state (§4.6).

use async_trait::async_trait;
use ceremony_primitives::AttestationRecord;

#[async_trait]
pub trait AttestationPublisher: Send + Sync {
    async fn publish(&self, record: &AttestationRecord) -> Result<(), String>;
}

/// Discards every record. Used when no publisher is configured.
#[derive(Default)]
pub struct NoopAttestationPublisher;

#[async_trait]
impl AttestationPublisher for NoopAttestationPublisher {
    async fn publish(&self, _record: &AttestationRecord) -> Result<(), String> {
        Ok(())
    }
}

/// Appends each record as a JSON line to a local file, standing in for the
/// public gist the real system would push to.
pub struct LocalFileAttestationPublisher {
    path: std::path::PathBuf,
}

impl LocalFileAttestationPublisher {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AttestationPublisher for LocalFileAttestationPublisher {
    async fn publish(&self, record: &AttestationRecord) -> Result<(), String> {
        let line = serde_json::to_string(record).map_err(|e| e.to_string())?;
        let mut contents = tokio::fs::read_to_string(&self.path).await.unwrap_or_default();
        contents.push_str(&line);
        contents.push('\n');
        tokio::fs::write(&self.path, contents).await.map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_file_publisher_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attestations.jsonl");
        let publisher = LocalFileAttestationPublisher::new(&path);

        let record = AttestationRecord {
            ceremony_id: "c1".into(),
            circuit_id: "circuit1".into(),
            last_zkey_blake2b_hash: "deadbeef".into(),
            contributors_ordered: vec!["alice".into(), "bob".into()],
            published_at: 1_000,
        };
        publisher.publish(&record).await.unwrap();
        publisher.publish(&record).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
