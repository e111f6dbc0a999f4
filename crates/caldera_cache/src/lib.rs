//! Content-addressed hot-object cache for the Caldera media backend.
//!
//! Serves immutable media blobs by SHA-256 from a local disk cache, filling
//! from a durable blob store on miss, lazily deriving thumbnails, and
//! evicting under count/size pressure with a request-frequency × size cost
//! model. In-use entries are protected by scoped reference-count leases.
//!
//! # Architecture
//!
//! - [`CacheService`] — the index of on-disk entries plus their sidecar
//!   metadata files: scan/self-heal at startup, lookup/fill, reference
//!   counts, hit counters, and the eviction pass.
//! - [`EntryLease`] — a held reference on an entry; the entry cannot be
//!   evicted while any lease on it is alive.
//! - [`OutputResolver`] — orchestrates one request: original lookup, type
//!   filter, thumbnail resolution and derivation.
//! - [`ThumbnailDeriver`] — the seam behind which image decoding lives.
//!
//! # Example
//!
//! ```no_run
//! use caldera_cache::{CacheService, HitKind, OutputResolver};
//! use caldera_core::{CacheConfig, ContentRequest};
//! use caldera_storage::{MemoryBlobStore, MemoryMetadataStore};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # async fn example(deriver: Arc<dyn caldera_cache::ThumbnailDeriver>) -> caldera_error::CalderaResult<()> {
//! let blobs = Arc::new(MemoryBlobStore::new());
//! let metadata = Arc::new(MemoryMetadataStore::new());
//! let cache = Arc::new(CacheService::new(
//!     CacheConfig::default(),
//!     blobs.clone(),
//!     metadata.clone(),
//! ));
//! cache.init().await?;
//!
//! let resolver = OutputResolver::new(cache, metadata, blobs, deriver);
//! let request = ContentRequest::parse_hash_param("abcd1234:200", &HashMap::new());
//! let lease = resolver.resolve(&request).await?;
//! // ... stream lease.open() to the client ...
//! lease.complete(HitKind::Get);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod deriver;
mod entry;
mod ingest;
mod lease;
mod resolver;
mod service;

pub use deriver::{DerivedThumb, ThumbTarget, ThumbnailDeriver};
pub use entry::{meta_from_record, CacheEntry, EntryMeta};
pub use ingest::{ingest_file, IngestAttrs, IngestOutcome, ThumbParent};
pub use lease::{EntryLease, HitKind};
pub use resolver::OutputResolver;
pub use service::{CacheService, CacheStats, EntryStats};
