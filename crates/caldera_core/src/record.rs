//! Object metadata projection.

use crate::MediaType;
use chrono::{DateTime, Utc};

/// One row of the metadata store: everything known about a distinct content
/// hash ever ingested.
///
/// Records are immutable after creation except for thumbnail-link additions,
/// which live in the store's link table rather than on the record itself.
///
/// Note: Does not derive `Eq` or `Hash` due to the `f32` duration field.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    /// SHA-256 hash of the content, the primary key everywhere
    pub hash: String,
    /// Type of media (image, audio, video)
    pub media_type: MediaType,
    /// MIME type (e.g., "image/jpeg", "video/mp4")
    pub mime: String,
    /// Size of the content in bytes
    pub size: u64,
    /// Image/video width in pixels
    pub width: Option<u32>,
    /// Image/video height in pixels
    pub height: Option<u32>,
    /// Audio/video duration in seconds
    pub duration_seconds: Option<f32>,
    /// Whether this object is a derived thumbnail of some original
    pub is_thumb: bool,
    /// Last modification time of the record
    pub updated_at: DateTime<Utc>,
}

impl ObjectRecord {
    /// Whether this record can carry a thumbnail registry.
    ///
    /// Only non-thumbnail images get a `thumbs` map in their sidecar.
    pub fn has_thumb_registry(&self) -> bool {
        self.media_type.is_thumbable() && !self.is_thumb
    }
}
