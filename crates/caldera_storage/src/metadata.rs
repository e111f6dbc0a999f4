//! Metadata store trait and in-memory implementation.

use caldera_core::{MediaType, ObjectRecord};
use caldera_error::CalderaResult;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A named thumbnail link from an original to a derived child object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbLink {
    /// Canonical thumbnail name (e.g., "256", "fullhd")
    pub name: String,
    /// Content hash of the derived child object
    pub child_hash: String,
}

/// Outcome of a `create_record` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum CreateStatus {
    /// A new record was created for the hash
    #[display("created")]
    Created,
    /// The hash was already registered; the existing record is returned
    #[display("already existed")]
    AlreadyExists,
}

/// Attributes for a new object record; the store assigns the timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObjectRecord {
    /// SHA-256 hash of the content
    pub hash: String,
    /// Type of media
    pub media_type: MediaType,
    /// MIME type
    pub mime: String,
    /// Size in bytes
    pub size: u64,
    /// Width in pixels, if visual
    pub width: Option<u32>,
    /// Height in pixels, if visual
    pub height: Option<u32>,
    /// Duration in seconds, if timed
    pub duration_seconds: Option<f32>,
    /// Whether the object is a derived thumbnail
    pub is_thumb: bool,
}

/// Maps content hashes to object records and thumbnail links.
///
/// Backed by the application database in production; the cache core only
/// ever sees this narrow interface.
#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch the record for a content hash, if one exists.
    async fn get_by_hash(&self, hash: &str) -> CalderaResult<Option<ObjectRecord>>;

    /// All thumbnail links registered under an original's hash.
    async fn thumb_links(&self, hash: &str) -> CalderaResult<Vec<ThumbLink>>;

    /// Register a named thumbnail link from `parent_hash` to `child_hash`.
    async fn register_thumb_link(
        &self,
        parent_hash: &str,
        child_hash: &str,
        name: &str,
    ) -> CalderaResult<()>;

    /// Create a record for a hash. First write wins: a duplicate hash
    /// returns the existing record with [`CreateStatus::AlreadyExists`].
    async fn create_record(
        &self,
        record: NewObjectRecord,
    ) -> CalderaResult<(ObjectRecord, CreateStatus)>;
}

/// Metadata store backed by process-local maps. Test use only.
#[derive(Default)]
pub struct MemoryMetadataStore {
    records: RwLock<HashMap<String, ObjectRecord>>,
    links: RwLock<Vec<(String, ThumbLink)>>,
}

impl MemoryMetadataStore {
    /// Create an empty in-memory metadata store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get_by_hash(&self, hash: &str) -> CalderaResult<Option<ObjectRecord>> {
        Ok(self.records.read().get(hash).cloned())
    }

    async fn thumb_links(&self, hash: &str) -> CalderaResult<Vec<ThumbLink>> {
        Ok(self
            .links
            .read()
            .iter()
            .filter(|(parent, _)| parent == hash)
            .map(|(_, link)| link.clone())
            .collect())
    }

    async fn register_thumb_link(
        &self,
        parent_hash: &str,
        child_hash: &str,
        name: &str,
    ) -> CalderaResult<()> {
        self.links.write().push((
            parent_hash.to_string(),
            ThumbLink {
                name: name.to_string(),
                child_hash: child_hash.to_string(),
            },
        ));
        Ok(())
    }

    async fn create_record(
        &self,
        record: NewObjectRecord,
    ) -> CalderaResult<(ObjectRecord, CreateStatus)> {
        let mut records = self.records.write();

        if let Some(existing) = records.get(&record.hash) {
            return Ok((existing.clone(), CreateStatus::AlreadyExists));
        }

        let stored = ObjectRecord {
            hash: record.hash.clone(),
            media_type: record.media_type,
            mime: record.mime,
            size: record.size,
            width: record.width,
            height: record.height,
            duration_seconds: record.duration_seconds,
            is_thumb: record.is_thumb,
            updated_at: Utc::now(),
        };
        records.insert(record.hash, stored.clone());

        Ok((stored, CreateStatus::Created))
    }
}
