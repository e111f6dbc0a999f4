//! Cache error types.

/// Kinds of cache errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum CacheErrorKind {
    /// Content hash unknown to both the cache and the metadata store,
    /// or the requested type filter did not match the object
    #[display("Not found: {}", _0)]
    NotFound(String),
    /// Thumbnail requested for an object that cannot be thumbnailed
    #[display("Not acceptable: {}", _0)]
    NotAcceptable(String),
    /// Blob store upload or download failed
    #[display("Upstream failure: {}", _0)]
    Upstream(String),
    /// Thumbnail derivation failed
    #[display("Derivation failure: {}", _0)]
    Derivation(String),
    /// Failed to write a sidecar metadata file
    #[display("Sidecar write failure: {}", _0)]
    Sidecar(String),
    /// Local file I/O failure
    #[display("Cache I/O failure: {}", _0)]
    Io(String),
}

impl CacheErrorKind {
    /// HTTP status code this error surfaces as at the serving layer.
    pub fn http_status(&self) -> u16 {
        match self {
            CacheErrorKind::NotFound(_) => 404,
            CacheErrorKind::NotAcceptable(_) => 406,
            CacheErrorKind::Upstream(_)
            | CacheErrorKind::Derivation(_)
            | CacheErrorKind::Sidecar(_)
            | CacheErrorKind::Io(_) => 500,
        }
    }
}

/// Cache error with location tracking.
///
/// # Examples
///
/// ```
/// use caldera_error::{CacheError, CacheErrorKind};
///
/// let err = CacheError::new(CacheErrorKind::NotAcceptable("video".to_string()));
/// assert_eq!(err.kind.http_status(), 406);
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Cache Error: {} at line {} in {}", kind, line, file)]
pub struct CacheError {
    /// The kind of error that occurred
    pub kind: CacheErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CacheError {
    /// Create a new cache error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CacheErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
