//! Blob storage capability and public-URL construction.
//!
//! The store is an opaque key/value blob service (S3 or MinIO in
//! production, in-memory in tests). Keys never start with `/`.

use std::time::Duration;

use async_trait::async_trait;

use crate::naming::normalize_key;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default lifetime of presigned GET URLs.
pub const DEFAULT_PRESIGN_TTL: Duration = Duration::from_secs(3600);

/// Content type used when the store does not report one.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// A fetched object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub length: u64,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StorageError>;

    /// Server-side copy within the same bucket. The source is untouched.
    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), StorageError>;

    /// Read an object in full.
    async fn get(&self, key: &str) -> Result<StoredObject, StorageError>;

    /// Time-limited GET URL for a private object.
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;

    /// Stable public access descriptor stored alongside the key.
    fn public_url(&self, key: &str) -> String;
}

// ---------------------------------------------------------------------------
// Public URL construction
// ---------------------------------------------------------------------------

/// Build the public URL for `key`.
///
/// - `{bucket}` / `{key}` placeholders in `base` are substituted.
/// - Path-style (MinIO default): `{base}/{bucket}/{key}`.
/// - Virtual-host style: the bucket is already part of `base`, so `{base}/{key}`.
pub fn build_public_url(base: &str, bucket: &str, key: &str, path_style: bool) -> String {
    let base = base.trim_end_matches('/');
    let key = normalize_key(key);

    if base.contains("{bucket}") || base.contains("{key}") {
        return base.replace("{bucket}", bucket).replace("{key}", key);
    }

    if path_style {
        format!("{base}/{bucket}/{key}")
    } else {
        format!("{base}/{key}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_style_url() {
        assert_eq!(
            build_public_url(
                "http://localhost:9000/",
                "images",
                "/account-1/predictions/a.png",
                true
            ),
            "http://localhost:9000/images/account-1/predictions/a.png"
        );
    }

    #[test]
    fn virtual_host_url() {
        assert_eq!(
            build_public_url("https://images.s3.amazonaws.com", "images", "k.png", false),
            "https://images.s3.amazonaws.com/k.png"
        );
    }

    #[test]
    fn templated_url() {
        assert_eq!(
            build_public_url("https://cdn.example.com/{bucket}/x/{key}", "b", "k.png", true),
            "https://cdn.example.com/b/x/k.png"
        );
    }

    #[test]
    fn storage_error_display() {
        assert_eq!(
            StorageError::NotFound("a/b.png".into()).to_string(),
            "Object not found: a/b.png"
        );
    }
}
