//! Artifact Store Adapter.
//!
//! Interface over a chunked blob store: bucket creation, object existence,
//! the resumable multi-part upload protocol, and pre-signed GET/PUT. See
//! [`fs::LocalArtifactStore`] for the local-filesystem reference
//! implementation used outside of a real object-store deployment.

pub mod errors;
pub mod fs;
pub mod traits;

pub use errors::{StorageError, StorageResult};
pub use fs::LocalArtifactStore;
pub use traits::{ArtifactStore, PresignedUrl};
