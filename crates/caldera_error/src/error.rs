//! Top-level error wrapper types.

use crate::{CacheError, RequestError, StorageError};

/// Union of every error family in the Caldera workspace.
///
/// # Examples
///
/// ```
/// use caldera_error::{CalderaError, StorageError, StorageErrorKind};
///
/// let storage_err = StorageError::new(StorageErrorKind::Unavailable("s3".to_string()));
/// let err: CalderaError = storage_err.into();
/// assert!(format!("{}", err).contains("Storage Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum CalderaErrorKind {
    /// Cache lookup, fill, or eviction error
    #[from(CacheError)]
    Cache(CacheError),
    /// Blob or metadata storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Request validation error
    #[from(RequestError)]
    Request(RequestError),
}

impl CalderaErrorKind {
    /// HTTP status code this error surfaces as at the serving layer.
    pub fn http_status(&self) -> u16 {
        match self {
            CalderaErrorKind::Cache(e) => e.kind.http_status(),
            CalderaErrorKind::Storage(_) => 500,
            CalderaErrorKind::Request(_) => 400,
        }
    }
}

/// Caldera error with kind discrimination.
///
/// # Examples
///
/// ```
/// use caldera_error::{CalderaResult, CacheError, CacheErrorKind};
///
/// fn might_fail() -> CalderaResult<()> {
///     Err(CacheError::new(CacheErrorKind::NotFound("abcd".to_string())))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Caldera Error: {}", _0)]
pub struct CalderaError(Box<CalderaErrorKind>);

impl CalderaError {
    /// Create a new error from a kind.
    pub fn new(kind: CalderaErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CalderaErrorKind {
        &self.0
    }

    /// HTTP status code this error surfaces as at the serving layer.
    pub fn http_status(&self) -> u16 {
        self.0.http_status()
    }
}

// Generic From implementation for any type that converts to CalderaErrorKind
impl<T> From<T> for CalderaError
where
    T: Into<CalderaErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Caldera operations.
///
/// # Examples
///
/// ```
/// use caldera_error::{CalderaResult, StorageError, StorageErrorKind};
///
/// fn fetch_blob() -> CalderaResult<Vec<u8>> {
///     Err(StorageError::new(StorageErrorKind::NotFound("abcd".to_string())))?
/// }
/// ```
pub type CalderaResult<T> = std::result::Result<T, CalderaError>;
