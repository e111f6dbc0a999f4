//! Thumbnail derivation seam.
//!
//! Actual image decoding lives behind [`ThumbnailDeriver`]; production wires
//! in an implementation backed by an image library or an ffmpeg subprocess,
//! offloaded with `tokio::task::spawn_blocking` so the event loop never
//! carries the resize. Tests use a fake.

use caldera_error::CalderaResult;
use std::path::{Path, PathBuf};

/// Canonical thumbnail variant to derive, after width snapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbTarget {
    /// Resize to this width, preserving aspect ratio
    Width(u32),
    /// Resize the longer edge to 1920
    FullHd,
}

impl ThumbTarget {
    /// Canonical name under which the variant is registered and cached.
    pub fn name(&self) -> String {
        match self {
            ThumbTarget::Width(width) => width.to_string(),
            ThumbTarget::FullHd => caldera_core::FULLHD_NAME.to_string(),
        }
    }
}

/// A freshly derived thumbnail, written to a temporary file.
///
/// The caller ingests and then removes the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedThumb {
    /// Temporary file holding the derived bytes
    pub path: PathBuf,
    /// Width of the derived image in pixels
    pub width: u32,
    /// Height of the derived image in pixels
    pub height: u32,
    /// MIME type of the derived image
    pub mime: String,
}

/// Produces resized variants of original images.
#[async_trait::async_trait]
pub trait ThumbnailDeriver: Send + Sync {
    /// Derive `target` from the original at `src`, writing a new temp file.
    ///
    /// # Errors
    ///
    /// Returns a derivation error for unreadable or unsupported sources.
    async fn derive(&self, src: &Path, target: ThumbTarget) -> CalderaResult<DerivedThumb>;
}
