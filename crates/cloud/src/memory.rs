//! In-process blob store backed by a `HashMap`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use pictor_core::naming::normalize_key;
use pictor_core::storage::{build_public_url, BlobStore, StorageError, StoredObject};
use tokio::sync::RwLock;

/// Base used for public descriptors of in-memory objects.
const MEMORY_BASE_URL: &str = "memory://local";

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    content_type: String,
}

/// Keeps objects in memory. Cloning the handle is not supported; share it
/// behind an `Arc` like any other store.
#[derive(Debug)]
pub struct MemoryBlobStore {
    bucket: String,
    objects: RwLock<HashMap<String, Entry>>,
}

impl MemoryBlobStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(normalize_key(key))
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Sorted list of stored keys.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new("images")
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.objects.write().await.insert(
            normalize_key(key).to_string(),
            Entry {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), StorageError> {
        let mut objects = self.objects.write().await;
        let entry = objects
            .get(normalize_key(src_key))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(src_key.to_string()))?;
        objects.insert(normalize_key(dst_key).to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
        let objects = self.objects.read().await;
        let entry = objects
            .get(normalize_key(key))
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(StoredObject {
            length: entry.bytes.len() as u64,
            bytes: entry.bytes.clone(),
            content_type: entry.content_type.clone(),
        })
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        if !self.contains(key).await {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(format!("{}?expires_in={}", self.public_url(key), ttl.as_secs()))
    }

    fn public_url(&self, key: &str) -> String {
        build_public_url(MEMORY_BASE_URL, &self.bucket, key, true)
    }
}
