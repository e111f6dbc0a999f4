//! Scoped reference-count leases.

use crate::entry::EntryMeta;
use crate::service::CacheService;
use caldera_error::{CacheError, CacheErrorKind, CalderaResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How a completed request consumed the entry, for eviction scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum HitKind {
    /// Headers only
    #[display("head")]
    Head,
    /// Full body stream
    #[display("get")]
    Get,
}

/// A held reference on a cache entry.
///
/// While a lease exists, the entry's blob cannot be evicted. Call
/// [`EntryLease::complete`] after the byte stream finishes to bump the
/// entry's hit counters; dropping the lease on any other path (client
/// disconnect, write error) still releases the reference, just without a
/// counter bump, so aborted requests never leak a ref.
#[derive(Debug)]
pub struct EntryLease {
    service: Arc<CacheService>,
    hash: String,
    meta: EntryMeta,
    file_path: PathBuf,
    completed: bool,
}

impl EntryLease {
    pub(crate) fn new(
        service: Arc<CacheService>,
        hash: String,
        meta: EntryMeta,
        file_path: PathBuf,
    ) -> Self {
        Self {
            service,
            hash,
            meta,
            file_path,
            completed: false,
        }
    }

    /// Content hash of the leased entry.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Sidecar metadata snapshot taken at acquisition.
    pub fn meta(&self) -> &EntryMeta {
        &self.meta
    }

    /// On-disk location of the blob.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// HTTP-style response headers for this entry.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        self.meta.headers()
    }

    /// Open the blob for streaming.
    pub async fn open(&self) -> CalderaResult<tokio::fs::File> {
        tokio::fs::File::open(&self.file_path).await.map_err(|e| {
            CacheError::new(CacheErrorKind::Io(format!(
                "{}: {}",
                self.file_path.display(),
                e
            )))
            .into()
        })
    }

    /// Finish the request: release the reference and record the hit.
    ///
    /// Get completions also run the eviction threshold check, since they are
    /// the hot path that grows the cache.
    pub fn complete(mut self, kind: HitKind) {
        self.completed = true;
        self.service.release(&self.hash, Some(kind));
    }
}

impl Drop for EntryLease {
    fn drop(&mut self) {
        if !self.completed {
            self.service.release(&self.hash, None);
        }
    }
}
