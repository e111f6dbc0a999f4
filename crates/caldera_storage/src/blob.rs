//! Blob store trait.

use caldera_error::CalderaResult;
use std::path::Path;

/// Durable storage of original bytes, keyed by content hash.
///
/// Implementations move whole blobs between the store and local files; the
/// cache core never streams partial objects from the store. Content is
/// immutable, so uploads for an existing hash are free to no-op.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Check whether a blob exists for the given content hash.
    async fn exists(&self, hash: &str) -> CalderaResult<bool>;

    /// Download the blob for `hash` into `dest`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the hash is unknown or the transfer fails.
    async fn download_to(&self, hash: &str, dest: &Path) -> CalderaResult<()>;

    /// Upload the file at `src` as the blob for `hash`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if `src` cannot be read, its bytes do not
    /// hash to `hash`, or the transfer fails.
    async fn upload_from(&self, src: &Path, hash: &str) -> CalderaResult<()>;

    /// Delete the blob for `hash`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the hash is unknown or deletion fails.
    async fn delete(&self, hash: &str) -> CalderaResult<()>;
}
