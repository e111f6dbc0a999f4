//! Caldera - Content-Addressed Hot-Object Media Cache
//!
//! Caldera is the hot-path cache subsystem of a media hosting backend. It
//! serves immutable image/video/audio blobs by SHA-256 content hash from a
//! local disk cache, fills from a durable blob store on miss, lazily derives
//! thumbnails bounded to power-of-two widths, and evicts under count/size
//! pressure using a request-frequency × size cost model.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use caldera::{
//!     CacheConfig, CacheService, ContentRequest, HitKind, OutputResolver,
//! };
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> caldera::CalderaResult<()> {
//!     let config = CacheConfig::from_env();
//!     let cache = Arc::new(CacheService::new(config, blobs.clone(), metadata.clone()));
//!     cache.init().await?;
//!     cache.spawn_decay_task(std::time::Duration::from_secs(3600));
//!
//!     let resolver = OutputResolver::new(cache, metadata, blobs, deriver);
//!     let request = ContentRequest::parse_hash_param("abcd1234:256", &HashMap::new());
//!     let lease = resolver.resolve(&request).await?;
//!     // stream lease.open() to the client, then:
//!     lease.complete(HitKind::Get);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Caldera is organized as a workspace with focused crates:
//!
//! - `caldera_error` - Error types
//! - `caldera_core` - Shared types, request parsing, configuration
//! - `caldera_storage` - Blob store and metadata store interfaces
//! - `caldera_cache` - The cache index, leases, eviction, and resolver
//!
//! This crate (`caldera`) re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use caldera_cache::{
    ingest_file, meta_from_record, CacheEntry, CacheService, CacheStats, DerivedThumb,
    EntryLease, EntryMeta, EntryStats, HitKind, IngestAttrs, IngestOutcome, OutputResolver,
    ThumbParent, ThumbTarget, ThumbnailDeriver,
};
pub use caldera_core::{
    snap_thumb_width, CacheConfig, CacheConfigBuilder, ContentRequest, MediaType, ObjectRecord,
    ThumbSpec, FULLHD_EDGE, FULLHD_NAME,
};
pub use caldera_error::{
    CacheError, CacheErrorKind, CalderaError, CalderaErrorKind, CalderaResult, RequestError,
    RequestErrorKind, StorageError, StorageErrorKind,
};
pub use caldera_storage::{
    sha256_file, sha256_hex, BlobStore, CreateStatus, FsBlobStore, MemoryBlobStore,
    MemoryMetadataStore, MetadataStore, NewObjectRecord, ThumbLink,
};
