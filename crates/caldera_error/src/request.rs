//! Request validation error types.

/// Kinds of request validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum RequestErrorKind {
    /// Thumbnail width parameter was zero, negative, or not a number
    #[display("Invalid thumbnail width: {}", _0)]
    InvalidThumbWidth(String),
}

/// Request validation error with location tracking.
///
/// Surfaces as a 400-class response at the serving layer.
///
/// # Examples
///
/// ```
/// use caldera_error::{RequestError, RequestErrorKind};
///
/// let err = RequestError::new(RequestErrorKind::InvalidThumbWidth("0".to_string()));
/// assert!(format!("{}", err).contains("Invalid thumbnail width"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Request Error: {} at line {} in {}", kind, line, file)]
pub struct RequestError {
    /// The kind of error that occurred
    pub kind: RequestErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl RequestError {
    /// Create a new request error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RequestErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
