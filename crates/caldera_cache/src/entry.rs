//! Cache entry and sidecar metadata.

use caldera_core::{MediaType, ObjectRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Sidecar metadata persisted as JSON next to every cached blob.
///
/// A cached projection of the object's metadata record, plus the resolved
/// thumbnail name → child hash map for original images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Type of media
    #[serde(rename = "type")]
    pub media_type: MediaType,
    /// SHA-256 content hash
    pub sha256: String,
    /// MIME type
    pub mime: String,
    /// Size of the blob in bytes
    pub size: u64,
    /// Width in pixels, if visual
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Height in pixels, if visual
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Last modification time of the backing record
    pub mtime: DateTime<Utc>,
    /// Thumbnail name → child content hash, for original images only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbs: Option<HashMap<String, String>>,
}

impl EntryMeta {
    /// HTTP-style response headers for serving this entry.
    ///
    /// Content is immutable and addressed by hash, so the entry is safe to
    /// cache forever and the hash doubles as a strong ETag.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Cache-Control", "public, immutable".to_string()),
            ("Content-Type", self.mime.clone()),
            ("Content-Length", self.size.to_string()),
            (
                "Last-Modified",
                self.mtime.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            ),
            ("ETag", self.sha256.clone()),
        ]
    }
}

/// One cached object as tracked by the index.
///
/// Counters and the reference count are only ever touched under the index
/// critical section.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// On-disk location of the blob
    pub file_path: PathBuf,
    /// On-disk location of the sidecar JSON
    pub meta_path: PathBuf,
    /// Sidecar metadata
    pub meta: EntryMeta,
    /// Number of callers currently depending on the blob existing on disk
    pub ref_count: u32,
    /// HEAD request completions since the last decay tick
    pub head_hits: u64,
    /// GET request completions since the last decay tick
    pub get_hits: u64,
}

impl CacheEntry {
    /// Create a fresh entry with zeroed counters.
    pub fn new(file_path: PathBuf, meta_path: PathBuf, meta: EntryMeta) -> Self {
        Self {
            file_path,
            meta_path,
            meta,
            ref_count: 0,
            head_hits: 0,
            get_hits: 0,
        }
    }

    /// Eviction cost score: request frequency times size.
    ///
    /// Large, rarely requested blobs score lowest and go first.
    pub fn eviction_score(&self) -> u128 {
        (self.head_hits + self.get_hits) as u128 * self.meta.size as u128
    }
}

/// Build sidecar metadata from an object record and resolved thumbnail links.
///
/// `thumbs` is only attached for non-thumbnail images, matching what the
/// metadata store will ever link.
pub fn meta_from_record(
    record: &ObjectRecord,
    thumbs: Option<HashMap<String, String>>,
) -> EntryMeta {
    EntryMeta {
        media_type: record.media_type,
        sha256: record.hash.clone(),
        mime: record.mime.clone(),
        size: record.size,
        width: record.width,
        height: record.height,
        mtime: record.updated_at,
        thumbs: if record.has_thumb_registry() {
            Some(thumbs.unwrap_or_default())
        } else {
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> EntryMeta {
        EntryMeta {
            media_type: MediaType::Image,
            sha256: "abcd".to_string(),
            mime: "image/jpeg".to_string(),
            size: 1024,
            width: Some(800),
            height: Some(600),
            mtime: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            thumbs: None,
        }
    }

    #[test]
    fn headers_carry_immutable_contract() {
        let headers = meta().headers();
        let get = |name: &str| {
            headers
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(get("Cache-Control"), "public, immutable");
        assert_eq!(get("Content-Type"), "image/jpeg");
        assert_eq!(get("Content-Length"), "1024");
        assert_eq!(get("ETag"), "abcd");
        assert!(get("Last-Modified").ends_with("GMT"));
    }

    #[test]
    fn score_is_hits_times_size() {
        let mut entry = CacheEntry::new(PathBuf::from("f"), PathBuf::from("f.json"), meta());
        entry.head_hits = 3;
        entry.get_hits = 2;
        assert_eq!(entry.eviction_score(), 5 * 1024);
    }

    #[test]
    fn sidecar_round_trips_through_json() {
        let mut m = meta();
        m.thumbs = Some(HashMap::from([("128".to_string(), "ef01".to_string())]));

        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains(r#""type":"image""#));
        let back: EntryMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn video_records_get_no_thumb_map() {
        let record = ObjectRecord {
            hash: "abcd".to_string(),
            media_type: MediaType::Video,
            mime: "video/mp4".to_string(),
            size: 10,
            width: Some(1280),
            height: Some(720),
            duration_seconds: Some(12.5),
            is_thumb: false,
            updated_at: Utc::now(),
        };
        assert!(meta_from_record(&record, None).thumbs.is_none());
    }
}
