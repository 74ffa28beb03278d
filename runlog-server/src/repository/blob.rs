//! Blob store abstraction
//!
//! The durable substrate is a plain key/value blob service: get, put, list
//! and delete of named byte blobs. Writes to one key are visible to every
//! subsequent read of that key; nothing else is assumed.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const JSONL_CONTENT_TYPE: &str = "application/x-ndjson";

/// Errors from blob store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Blob not found: {0}")]
    NotFound(String),
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Listing entry for a stored blob
#[derive(Debug, Clone, PartialEq)]
pub struct BlobMeta {
    pub path: String,
    pub size: u64,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    pub url: String,
}

/// Key/value blob storage shared by every server instance
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reads a blob; fails with `StoreError::NotFound` if the key was never written
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Creates or replaces a blob
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError>;

    /// Lists blobs whose key starts with `prefix`, ordered by key
    async fn list(&self, prefix: &str) -> Result<Vec<BlobMeta>, StoreError>;

    /// Removes a blob; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Reads and decodes a JSON blob, mapping a missing key to `None`
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn BlobStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Encodes and writes a JSON blob
pub async fn put_json<T: Serialize>(
    store: &dyn BlobStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    store.put(key, bytes, JSON_CONTENT_TYPE).await
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    #[allow(dead_code)]
    content_type: String,
    uploaded_at: chrono::DateTime<chrono::Utc>,
}

/// Process-local blob store
///
/// Only durable for the lifetime of the process; used for single-instance
/// development and tests.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> MutexGuard<'_, BTreeMap<String, StoredBlob>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overrides the upload time of a blob
    #[cfg(test)]
    pub fn set_uploaded_at(&self, key: &str, at: chrono::DateTime<chrono::Utc>) {
        if let Some(blob) = self.blobs().get_mut(key) {
            blob.uploaded_at = at;
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.blobs()
            .get(key)
            .map(|b| b.bytes.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        self.blobs().insert(
            key.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
                uploaded_at: chrono::Utc::now(),
            },
        );
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobMeta>, StoreError> {
        Ok(self
            .blobs()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, blob)| BlobMeta {
                path: key.clone(),
                size: blob.bytes.len() as u64,
                uploaded_at: blob.uploaded_at,
                url: format!("memory://{}", key),
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.blobs().remove(key);
        Ok(())
    }
}

// =============================================================================
// Test doubles
// =============================================================================

#[cfg(test)]
pub mod testing {
    //! Wrappers around `MemoryBlobStore` for counting writes and injecting failures

    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct InstrumentedBlobStore {
        pub inner: MemoryBlobStore,
        puts: AtomicUsize,
        fail_puts: AtomicBool,
        fail_gets: AtomicBool,
    }

    impl InstrumentedBlobStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn put_count(&self) -> usize {
            self.puts.load(Ordering::SeqCst)
        }

        pub fn fail_puts(&self, fail: bool) {
            self.fail_puts.store(fail, Ordering::SeqCst);
        }

        pub fn fail_gets(&self, fail: bool) {
            self.fail_gets.store(fail, Ordering::SeqCst);
        }

        fn unavailable() -> StoreError {
            StoreError::Io(std::io::Error::other("store unavailable"))
        }
    }

    #[async_trait]
    impl BlobStore for InstrumentedBlobStore {
        async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
            if self.fail_gets.load(Ordering::SeqCst) {
                return Err(Self::unavailable());
            }
            self.inner.get(key).await
        }

        async fn put(
            &self,
            key: &str,
            bytes: Vec<u8>,
            content_type: &str,
        ) -> Result<(), StoreError> {
            if self.fail_puts.load(Ordering::SeqCst) {
                return Err(Self::unavailable());
            }
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put(key, bytes, content_type).await
        }

        async fn list(&self, prefix: &str) -> Result<Vec<BlobMeta>, StoreError> {
            self.inner.list(prefix).await
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete(key).await
        }
    }
}
