//! Blob port (driven/secondary port)
//!
//! Typed wrapper over an S3-compatible object store. Implementations live
//! in the `backup-storage` adapter crate (`S3Blob`, `AzureBlobDest`); the
//! core is blind to which concrete destination it holds.

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

/// A body reader accepted by [`Blob::put`].
pub type BodyStream = Pin<Box<dyn AsyncRead + Send>>;

/// Result of a [`Blob::head`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadResult {
    /// No object exists at this key.
    Absent,
    /// An object exists, with its size and user metadata.
    Present {
        /// Size in bytes.
        size: u64,
        /// User-supplied metadata (e.g. `source-modified-time`).
        metadata: HashMap<String, String>,
    },
}

impl HeadResult {
    /// The value of a metadata key, if the object is present and the key
    /// was set.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        match self {
            HeadResult::Present { metadata, .. } => metadata.get(key).map(String::as_str),
            HeadResult::Absent => None,
        }
    }
}

/// Typed wrapper over the destination object store.
#[async_trait]
pub trait Blob: Send + Sync {
    /// Head an object: used for skip-detection and for loading small
    /// checkpoint JSONs via their size/metadata (the content itself is
    /// read with [`Blob::get_json`]).
    async fn head(&self, key: &str) -> anyhow::Result<HeadResult>;

    /// Streaming upload. `metadata` carries the required
    /// `source-modified-time`, `original-path-encoded`, `source`, and
    /// `encoding` keys.
    async fn put(
        &self,
        key: &str,
        body: BodyStream,
        size: u64,
        content_type: &str,
        metadata: HashMap<String, String>,
        storage_class: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Convenience for writing a checkpoint document.
    async fn put_json(&self, key: &str, value: &serde_json::Value) -> anyhow::Result<()>;

    /// Convenience for reading a checkpoint document. `Ok(None)` means the
    /// object does not exist.
    async fn get_json(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_result_metadata_value_present() {
        let mut metadata = HashMap::new();
        metadata.insert("source-modified-time".to_string(), "2024-01-01T00:00:00Z".to_string());
        let head = HeadResult::Present { size: 5, metadata };
        assert_eq!(
            head.metadata_value("source-modified-time"),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_head_result_metadata_value_absent() {
        assert_eq!(HeadResult::Absent.metadata_value("anything"), None);
    }
}
