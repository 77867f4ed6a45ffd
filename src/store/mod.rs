#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, instrument};

/// The persisted registry: package name -> canonical repository URL.
/// Fully loaded, mutated in memory, and fully rewritten — never patched.
pub type Mapping = BTreeMap<String, String>;

/// Opaque identifier for one version of the remote blob (the git blob sha
/// for the GitHub backend). A write must present the token observed at the
/// most recent read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionToken(pub String);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mapping store unavailable: {0}")]
    Unavailable(String),

    #[error("stored mapping is not a JSON object of strings: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("mapping changed upstream since the last read")]
    ConcurrentModification,
}

/// A remotely persisted text blob with optimistic concurrency.
/// Implementations must be Send + Sync; the GitHub contents-API backend
/// lives in github::contents, and tests use an in-memory double.
#[async_trait]
pub trait RemoteBlob: Send + Sync {
    /// Fetch the current content together with its version token.
    async fn fetch(&self) -> Result<(String, VersionToken), StoreError>;

    /// Overwrite the content. Fails with ConcurrentModification if the
    /// blob no longer matches `token`.
    async fn store(&self, content: &str, token: &VersionToken) -> Result<(), StoreError>;
}

/// Thin typed layer over the raw blob: JSON decode on read, JSON encode on
/// write, version token threaded through unchanged.
pub struct MappingStore<B: RemoteBlob> {
    blob: B,
}

impl<B: RemoteBlob> MappingStore<B> {
    pub fn new(blob: B) -> Self {
        MappingStore { blob }
    }

    /// Read the whole mapping and the version it was read at.
    #[instrument(skip(self))]
    pub async fn read_all(&self) -> Result<(Mapping, VersionToken), StoreError> {
        let (text, token) = self.blob.fetch().await?;
        let mapping: Mapping = serde_json::from_str(&text)?;
        debug!(entries = mapping.len(), "read mapping");
        Ok((mapping, token))
    }

    /// Serialize the whole mapping and overwrite the remote blob in one
    /// operation, conditional on `token` still being current.
    #[instrument(skip(self, mapping), fields(entries = mapping.len()))]
    pub async fn write_all(&self, mapping: &Mapping, token: &VersionToken) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(mapping)?;
        self.blob.store(&text, token).await?;
        debug!("wrote mapping");
        Ok(())
    }

    /// Convenience composition of read_all, in-memory set, write_all.
    /// Not atomic across the two remote calls; callers that already hold a
    /// fresh read should mutate that mapping and call write_all with its
    /// token instead.
    pub async fn set_key(&self, name: &str, url: &str) -> Result<(), StoreError> {
        let (mut mapping, token) = self.read_all().await?;
        mapping.insert(name.to_string(), url.to_string());
        self.write_all(&mapping, &token).await
    }
}

#[cfg(test)]
impl MappingStore<memory::MemoryBlob> {
    /// Raw stored text, for asserting on persisted state in tests.
    pub fn blob_content(&self) -> String {
        self.blob.content()
    }

    /// Simulate a competing writer landing between a read and a write.
    pub fn overwrite_behind(&self, content: &str) {
        self.blob.overwrite(content);
    }
}
