//! Filesystem blob store.
//!
//! A content-addressed local backend with the same interface shape as a
//! remote object store. Useful for single-node deployments and as the durable
//! tier in tests.

use crate::{sha256_file, BlobStore};
use caldera_error::{CalderaResult, StorageError, StorageErrorKind};
use std::path::{Path, PathBuf};

/// Content-addressed filesystem blob store.
///
/// Blobs live at `{base_path}/{hash[0:2]}/{hash[2:4]}/{hash}`. Two levels of
/// subdirectories keep directory fan-out bounded. Writes go through a temp
/// file plus rename so a crash never leaves a partial blob at the canonical
/// path.
pub struct FsBlobStore {
    base_path: PathBuf,
}

impl FsBlobStore {
    /// Create a new filesystem blob store, creating the base directory if
    /// it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or accessed.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> CalderaResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::info!(path = %base_path.display(), "Created filesystem blob store");
        Ok(Self { base_path })
    }

    /// Canonical path for a content hash.
    ///
    /// Short or non-ASCII keys skip sharding so slicing never lands inside a
    /// multibyte character.
    fn blob_path(&self, hash: &str) -> PathBuf {
        if hash.len() < 4 || !hash.is_ascii() {
            return self.base_path.join(hash);
        }
        self.base_path
            .join(&hash[0..2])
            .join(&hash[2..4])
            .join(hash)
    }
}

#[async_trait::async_trait]
impl BlobStore for FsBlobStore {
    async fn exists(&self, hash: &str) -> CalderaResult<bool> {
        let path = self.blob_path(hash);
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }

    #[tracing::instrument(skip(self, dest), fields(hash, dest = %dest.display()))]
    async fn download_to(&self, hash: &str, dest: &Path) -> CalderaResult<()> {
        let path = self.blob_path(hash);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let temp_dest = dest.with_extension("part");
        tokio::fs::copy(&path, &temp_dest).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(hash.to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;

        tokio::fs::rename(&temp_dest, dest).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_dest.display(),
                dest.display(),
                e
            )))
        })?;

        tracing::debug!(hash, "Downloaded blob");
        Ok(())
    }

    #[tracing::instrument(skip(self, src), fields(hash, src = %src.display()))]
    async fn upload_from(&self, src: &Path, hash: &str) -> CalderaResult<()> {
        let actual = sha256_file(src).await?;
        if actual != hash {
            return Err(StorageError::new(StorageErrorKind::HashMismatch(format!(
                "expected {}, got {}",
                hash, actual
            ))))?;
        }

        let path = self.blob_path(hash);

        // Content is immutable: an existing blob is already byte-identical.
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(hash, "Blob already stored, skipping upload");
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let temp_path = path.with_extension("tmp");
        tokio::fs::copy(src, &temp_path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::info!(hash, path = %path.display(), "Stored blob");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(hash))]
    async fn delete(&self, hash: &str) -> CalderaResult<()> {
        let path = self.blob_path(hash);

        tokio::fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(hash.to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileWrite(format!(
                    "delete {}: {}",
                    path.display(),
                    e
                )))
            }
        })?;

        tracing::info!(hash, "Deleted blob");
        Ok(())
    }
}
