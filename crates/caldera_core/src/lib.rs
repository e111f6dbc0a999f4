//! Shared types for the Caldera media cache.
//!
//! This crate holds the pieces every other Caldera crate agrees on: the media
//! type enumeration, the object metadata projection, the content-key request
//! grammar, thumbnail width snapping, and the cache configuration.
//!
//! # Example
//!
//! ```
//! use caldera_core::ContentRequest;
//! use std::collections::HashMap;
//!
//! let request = ContentRequest::parse_hash_param("abcd1234.jpg", &HashMap::new());
//! assert_eq!(request.hash(), "abcd1234");
//! assert_eq!(request.format().as_deref(), Some("jpg"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod media_type;
mod record;
mod request;
mod thumb;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use media_type::MediaType;
pub use record::ObjectRecord;
pub use request::ContentRequest;
pub use thumb::{snap_thumb_width, ThumbSpec, FULLHD_EDGE, FULLHD_NAME};
