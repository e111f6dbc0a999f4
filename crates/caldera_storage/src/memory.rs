//! In-memory blob store for tests.

use crate::{sha256_file, BlobStore};
use caldera_error::{CalderaResult, StorageError, StorageErrorKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;

/// Blob store backed by a process-local map. Test use only.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty in-memory blob store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a blob directly, bypassing the upload path.
    pub fn insert(&self, hash: impl Into<String>, data: Vec<u8>) {
        self.blobs.write().insert(hash.into(), data);
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Whether the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn exists(&self, hash: &str) -> CalderaResult<bool> {
        Ok(self.blobs.read().contains_key(hash))
    }

    async fn download_to(&self, hash: &str, dest: &Path) -> CalderaResult<()> {
        let data = self
            .blobs
            .read()
            .get(hash)
            .cloned()
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(hash.to_string())))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        tokio::fs::write(dest, data).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                dest.display(),
                e
            )))
        })?;

        Ok(())
    }

    async fn upload_from(&self, src: &Path, hash: &str) -> CalderaResult<()> {
        let actual = sha256_file(src).await?;
        if actual != hash {
            return Err(StorageError::new(StorageErrorKind::HashMismatch(format!(
                "expected {}, got {}",
                hash, actual
            ))))?;
        }

        let data = tokio::fs::read(src).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                src.display(),
                e
            )))
        })?;

        self.blobs.write().insert(hash.to_string(), data);
        Ok(())
    }

    async fn delete(&self, hash: &str) -> CalderaResult<()> {
        self.blobs
            .write()
            .remove(hash)
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(hash.to_string())))?;
        Ok(())
    }
}
