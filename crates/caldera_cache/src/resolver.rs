//! Request resolution: the full lookup / fill / thumbnail pipeline.

use crate::deriver::{ThumbTarget, ThumbnailDeriver};
use crate::ingest::{ingest_file, IngestAttrs, ThumbParent};
use crate::lease::EntryLease;
use crate::service::CacheService;
use caldera_core::{
    snap_thumb_width, ContentRequest, MediaType, ThumbSpec, FULLHD_EDGE, FULLHD_NAME,
};
use caldera_error::{CacheError, CacheErrorKind, CalderaResult};
use caldera_storage::{BlobStore, MetadataStore};
use std::sync::Arc;

/// Orchestrates one content request end to end.
///
/// Resolves the original (filling from the blob store on miss), applies the
/// type filter, and handles thumbnail requests: serving a registered child,
/// or deriving, ingesting, and registering a new one. Every successful
/// resolve returns exactly one live [`EntryLease`]; the caller must finish
/// it with [`EntryLease::complete`] once the byte stream is done (dropping
/// it on abort paths releases the reference without a hit).
pub struct OutputResolver {
    cache: Arc<CacheService>,
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    deriver: Arc<dyn ThumbnailDeriver>,
}

impl OutputResolver {
    /// Wire up a resolver over its collaborators.
    pub fn new(
        cache: Arc<CacheService>,
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        deriver: Arc<dyn ThumbnailDeriver>,
    ) -> Self {
        Self {
            cache,
            metadata,
            blobs,
            deriver,
        }
    }

    /// The cache service behind this resolver.
    pub fn cache(&self) -> &Arc<CacheService> {
        &self.cache
    }

    /// Resolve a parsed request to a leased cache entry.
    #[tracing::instrument(skip(self, request), fields(hash = %request.hash()))]
    pub async fn resolve(&self, request: &ContentRequest) -> CalderaResult<EntryLease> {
        let lease = self.get_or_fill(request.hash()).await?;

        if let Some(filter) = request.type_filter()
            && *filter != lease.meta().media_type
        {
            return Err(CacheError::new(CacheErrorKind::NotFound(format!(
                "{} is not {}",
                request.hash(),
                filter
            ))))?;
        }

        let Some(spec) = request.thumb() else {
            return Ok(lease);
        };

        if !lease.meta().media_type.is_thumbable() {
            return Err(CacheError::new(CacheErrorKind::NotAcceptable(format!(
                "thumbnail requested for {} object",
                lease.meta().media_type
            ))))?;
        }

        // An entry without a thumb registry is itself a derived thumbnail;
        // serve it as-is rather than derive from a derivative.
        let Some(thumbs) = lease.meta().thumbs.clone() else {
            return Ok(lease);
        };

        let target = match spec {
            ThumbSpec::Width(raw) => {
                let requested = ThumbSpec::parse_width(raw)?;
                let original_width = lease.meta().width.unwrap_or(requested);
                ThumbTarget::Width(snap_thumb_width(
                    requested,
                    original_width,
                    *self.cache.config().min_thumb_log(),
                ))
            }
            ThumbSpec::Name(name) if name == FULLHD_NAME => {
                let width = lease.meta().width.unwrap_or(0);
                let height = lease.meta().height.unwrap_or(0);
                if width <= FULLHD_EDGE && height <= FULLHD_EDGE {
                    // Already fits a full-HD frame; nothing to derive.
                    return Ok(lease);
                }
                ThumbTarget::FullHd
            }
            ThumbSpec::Name(other) => {
                return Err(CacheError::new(CacheErrorKind::NotFound(format!(
                    "unknown thumbnail variant: {}",
                    other
                ))))?;
            }
        };
        let name = target.name();

        if let Some(child_hash) = thumbs.get(&name) {
            if let Some(child) = self.try_get_or_fill(child_hash).await {
                drop(lease);
                return Ok(child);
            }
            tracing::warn!(
                parent = %request.hash(),
                child = %child_hash,
                "Registered thumbnail unavailable, re-deriving"
            );
        }

        self.derive_and_register(lease, target).await
    }

    /// Resolve an original or fail `NotFound`.
    async fn get_or_fill(&self, hash: &str) -> CalderaResult<EntryLease> {
        if let Some(lease) = self.cache.get_by_hash(hash).await {
            return Ok(lease);
        }

        let Some(record) = self.metadata.get_by_hash(hash).await? else {
            return Err(CacheError::new(CacheErrorKind::NotFound(hash.to_string())))?;
        };

        self.cache.fill_from_blob_store(&record).await
    }

    /// Best-effort resolve of a registered thumbnail child; any failure
    /// falls back to derivation.
    async fn try_get_or_fill(&self, hash: &str) -> Option<EntryLease> {
        match self.get_or_fill(hash).await {
            Ok(lease) => Some(lease),
            Err(e) => {
                tracing::debug!(hash, error = %e, "Thumbnail child fetch failed");
                None
            }
        }
    }

    /// Derive a new thumbnail from the leased original, ingest it, link it
    /// under the original, and return a lease on the new entry.
    ///
    /// The original's lease stays held across the awaited derivation so the
    /// source file cannot be evicted mid-read.
    async fn derive_and_register(
        &self,
        original: EntryLease,
        target: ThumbTarget,
    ) -> CalderaResult<EntryLease> {
        let derived = self
            .deriver
            .derive(original.file_path(), target)
            .await
            .map_err(|e| CacheError::new(CacheErrorKind::Derivation(e.to_string())))?;

        let outcome = ingest_file(
            self.blobs.as_ref(),
            self.metadata.as_ref(),
            &derived.path,
            IngestAttrs {
                media_type: MediaType::Image,
                mime: derived.mime,
                width: Some(derived.width),
                height: Some(derived.height),
                duration_seconds: None,
            },
            Some(ThumbParent {
                parent_hash: original.hash().to_string(),
                name: target.name(),
            }),
        )
        .await?;

        self.cache.update_sidecar(original.hash()).await?;

        let child_hash = outcome.record.hash.clone();
        drop(original);

        tracing::info!(
            child = %child_hash,
            variant = %target.name(),
            "Registered derived thumbnail"
        );
        self.get_or_fill(&child_hash).await
    }
}
