//! Blob and metadata store interfaces for the Caldera media cache.
//!
//! The cache core consumes two narrow collaborator interfaces: a [`BlobStore`]
//! holding the durable original bytes keyed by content hash, and a
//! [`MetadataStore`] mapping hashes to object records and thumbnail links.
//! This crate defines both traits plus local backends: a content-addressed
//! filesystem blob store (usable as a stand-in for a remote object store) and
//! in-memory implementations of both for tests.
//!
//! # Example
//!
//! ```rust
//! use caldera_storage::{BlobStore, FsBlobStore, sha256_hex};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FsBlobStore::new("/tmp/blobs")?;
//! let data = b"png bytes";
//! let hash = sha256_hex(data);
//!
//! tokio::fs::write("/tmp/upload.png", data).await?;
//! store.upload_from(std::path::Path::new("/tmp/upload.png"), &hash).await?;
//! assert!(store.exists(&hash).await?);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod blob;
mod fs;
mod hash;
mod memory;
mod metadata;

pub use blob::BlobStore;
pub use fs::FsBlobStore;
pub use hash::{sha256_file, sha256_hex};
pub use memory::MemoryBlobStore;
pub use metadata::{CreateStatus, MemoryMetadataStore, MetadataStore, NewObjectRecord, ThumbLink};
