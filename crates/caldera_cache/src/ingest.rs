//! Ingest of new objects into the durable tier.
//!
//! Hashes a local file, deduplicates against the metadata store, uploads the
//! bytes to the blob store, and creates the object record. Used for freshly
//! derived thumbnails and exposed for upload plumbing.

use caldera_core::{MediaType, ObjectRecord};
use caldera_error::{CacheError, CacheErrorKind, CalderaResult, StorageError, StorageErrorKind};
use caldera_storage::{sha256_file, BlobStore, CreateStatus, MetadataStore, NewObjectRecord};
use std::path::Path;

/// Media attributes the caller already knows about the file being ingested.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestAttrs {
    /// Type of media
    pub media_type: MediaType,
    /// MIME type
    pub mime: String,
    /// Width in pixels, if visual
    pub width: Option<u32>,
    /// Height in pixels, if visual
    pub height: Option<u32>,
    /// Duration in seconds, if timed
    pub duration_seconds: Option<f32>,
}

/// Parent linkage when the ingested file is a derived thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbParent {
    /// Content hash of the original
    pub parent_hash: String,
    /// Canonical thumbnail name under which to register the link
    pub name: String,
}

/// Result of an ingest: the object record plus whether it already existed.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    /// The created or pre-existing record
    pub record: ObjectRecord,
    /// Whether this ingest created the record
    pub status: CreateStatus,
}

/// Ingest the file at `src` as a content-addressed object.
///
/// The source file is consumed: it is removed after upload, and also when
/// the hash turns out to be already registered (content addressing makes the
/// bytes redundant either way). When `thumb_of` is given the record is
/// created as a thumbnail and linked under the parent; the link is also
/// ensured on the already-existed path so a re-derived identical thumbnail
/// still lands in the parent's registry.
#[tracing::instrument(skip(blobs, metadata, src, attrs), fields(src = %src.display()))]
pub async fn ingest_file(
    blobs: &dyn BlobStore,
    metadata: &dyn MetadataStore,
    src: &Path,
    attrs: IngestAttrs,
    thumb_of: Option<ThumbParent>,
) -> CalderaResult<IngestOutcome> {
    if thumb_of.is_some() && !attrs.media_type.is_thumbable() {
        return Err(CacheError::new(CacheErrorKind::Derivation(format!(
            "cannot register a {} object as a thumbnail",
            attrs.media_type
        ))))?;
    }

    let hash = sha256_file(src).await?;

    if let Some(existing) = metadata.get_by_hash(&hash).await? {
        tracing::debug!(hash, "Object already registered, skipping upload");
        if let Some(thumb) = &thumb_of {
            metadata
                .register_thumb_link(&thumb.parent_hash, &hash, &thumb.name)
                .await?;
        }
        remove_source(src).await;
        return Ok(IngestOutcome {
            record: existing,
            status: CreateStatus::AlreadyExists,
        });
    }

    let size = tokio::fs::metadata(src)
        .await
        .map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                src.display(),
                e
            )))
        })?
        .len();

    blobs
        .upload_from(src, &hash)
        .await
        .map_err(|e| CacheError::new(CacheErrorKind::Upstream(e.to_string())))?;

    let (record, status) = metadata
        .create_record(NewObjectRecord {
            hash: hash.clone(),
            media_type: attrs.media_type,
            mime: attrs.mime,
            size,
            width: attrs.width,
            height: attrs.height,
            duration_seconds: attrs.duration_seconds,
            is_thumb: thumb_of.is_some(),
        })
        .await?;

    if let Some(thumb) = &thumb_of {
        metadata
            .register_thumb_link(&thumb.parent_hash, &hash, &thumb.name)
            .await?;
    }

    remove_source(src).await;

    tracing::info!(hash, size, status = %status, "Ingested object");
    Ok(IngestOutcome { record, status })
}

async fn remove_source(src: &Path) {
    if let Err(e) = tokio::fs::remove_file(src).await {
        tracing::warn!(src = %src.display(), error = %e, "Failed to remove ingested source file");
    }
}
