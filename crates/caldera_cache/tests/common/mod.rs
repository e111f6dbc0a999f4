//! Shared fixtures for cache integration tests.

#![allow(dead_code)]

use caldera_cache::{CacheService, DerivedThumb, ThumbTarget, ThumbnailDeriver};
use caldera_core::{CacheConfig, MediaType, ObjectRecord};
use caldera_error::CalderaResult;
use caldera_storage::{
    sha256_hex, MemoryBlobStore, MemoryMetadataStore, MetadataStore, NewObjectRecord,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// A cache service wired over in-memory collaborators and a temp cache root.
pub struct TestWorld {
    pub blobs: Arc<MemoryBlobStore>,
    pub metadata: Arc<MemoryMetadataStore>,
    pub cache: Arc<CacheService>,
    pub root: TempDir,
}

impl TestWorld {
    pub async fn new() -> Self {
        Self::with_limits(1000, 2048 * 1024 * 1024).await
    }

    pub async fn with_limits(max_items: usize, max_bytes: u64) -> Self {
        let root = TempDir::new().unwrap();
        let config = CacheConfig::default()
            .with_cache_dir(root.path().to_path_buf())
            .with_max_items(max_items)
            .with_max_bytes(max_bytes);

        let blobs = Arc::new(MemoryBlobStore::new());
        let metadata = Arc::new(MemoryMetadataStore::new());
        let cache = Arc::new(CacheService::new(config, blobs.clone(), metadata.clone()));
        cache.init().await.unwrap();

        Self {
            blobs,
            metadata,
            cache,
            root,
        }
    }

    /// Register an original image in both collaborator stores, returning its
    /// hash and record.
    pub async fn seed_image(&self, data: &[u8], width: u32, height: u32) -> ObjectRecord {
        self.seed(data, MediaType::Image, "image/jpeg", Some(width), Some(height))
            .await
    }

    pub async fn seed_video(&self, data: &[u8]) -> ObjectRecord {
        self.seed(data, MediaType::Video, "video/mp4", Some(1280), Some(720))
            .await
    }

    pub async fn seed(
        &self,
        data: &[u8],
        media_type: MediaType,
        mime: &str,
        width: Option<u32>,
        height: Option<u32>,
    ) -> ObjectRecord {
        let hash = sha256_hex(data);
        self.blobs.insert(hash.clone(), data.to_vec());
        let (record, _) = self
            .metadata
            .create_record(NewObjectRecord {
                hash,
                media_type,
                mime: mime.to_string(),
                size: data.len() as u64,
                width,
                height,
                duration_seconds: None,
                is_thumb: false,
            })
            .await
            .unwrap();
        record
    }
}

/// Deriver that fabricates deterministic bytes per (source, variant) pair.
pub struct FakeDeriver {
    out_dir: TempDir,
    counter: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeDeriver {
    pub fn new() -> Self {
        Self {
            out_dir: TempDir::new().unwrap(),
            counter: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ThumbnailDeriver for FakeDeriver {
    async fn derive(&self, src: &Path, target: ThumbTarget) -> CalderaResult<DerivedThumb> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let source = tokio::fs::read(src).await.unwrap();
        let data = [&source[..], target.name().as_bytes()].concat();

        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = self.out_dir.path().join(format!("thumb-{}.jpg", seq));
        tokio::fs::write(&path, &data).await.unwrap();

        let width = match target {
            ThumbTarget::Width(w) => w,
            ThumbTarget::FullHd => 1920,
        };
        Ok(DerivedThumb {
            path,
            width,
            height: width * 3 / 4,
            mime: "image/jpeg".to_string(),
        })
    }
}
