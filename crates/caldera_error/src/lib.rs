//! Error types for the Caldera media cache.
//!
//! This crate provides the foundation error types used throughout the Caldera
//! workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern for clean error
//! handling:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use caldera_error::{CalderaResult, CacheError, CacheErrorKind};
//!
//! fn lookup() -> CalderaResult<String> {
//!     Err(CacheError::new(CacheErrorKind::NotFound("abcd".to_string())))?
//! }
//!
//! match lookup() {
//!     Ok(path) => println!("Got: {}", path),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod error;
mod request;
mod storage;

pub use cache::{CacheError, CacheErrorKind};
pub use error::{CalderaError, CalderaErrorKind, CalderaResult};
pub use request::{RequestError, RequestErrorKind};
pub use storage::{StorageError, StorageErrorKind};
