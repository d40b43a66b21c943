//! Error types for postgres-refcursor.

use std::fmt;

use thiserror::Error;
use tokio_postgres::error::DbError;

/// Result type for refcursor operations.
pub type Result<T> = core::result::Result<T, Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

const DEFAULT_MESSAGE: &str = "no refcursor left";

/// Error type for postgres-refcursor.
#[derive(Debug, Error)]
pub enum Error {
    /// The function call, a `FETCH` or a `CLOSE` failed in the driver.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// A cursor was requested but every cursor name has already been taken.
    #[error(transparent)]
    NoRefcursorLeft(#[from] NoRefcursorLeft),

    /// The function returned something that cannot name a cursor (e.g. NULL).
    #[error("Invalid cursor name: {0}")]
    InvalidCursorName(String),
}

impl Error {
    /// Returns true if a cursor was requested after the name sequence ran out.
    pub fn is_no_refcursor_left(&self) -> bool {
        matches!(self, Error::NoRefcursorLeft(_))
    }

    /// Get the server error, if the driver reported one.
    pub fn as_db_error(&self) -> Option<&DbError> {
        match self {
            Error::Postgres(e) => e.as_db_error(),
            _ => None,
        }
    }
}

/// Raised when the next refcursor is requested but none remain.
///
/// Normal end of a row stream is not an error; this is only returned by the
/// calls that ask for a definite cursor, such as
/// [`Refcursors::next_cursor`](crate::blocking::Refcursors::next_cursor).
#[derive(Debug, Default)]
pub struct NoRefcursorLeft {
    message: Option<String>,
    source: Option<BoxError>,
}

impl NoRefcursorLeft {
    /// Create the error with the default message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the error with a message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            source: None,
        }
    }

    /// Create the error with a message and the error that caused it.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: Some(message.into()),
            source: Some(source.into()),
        }
    }

    /// The message, if one was given.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for NoRefcursorLeft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message.as_deref().unwrap_or(DEFAULT_MESSAGE))
    }
}

impl std::error::Error for NoRefcursorLeft {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_default_message() {
        let err = NoRefcursorLeft::new();
        assert_eq!(err.to_string(), "no refcursor left");
        assert!(err.message().is_none());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_custom_message() {
        let err = NoRefcursorLeft::with_message("report has only two cursors");
        assert_eq!(err.to_string(), "report has only two cursors");
    }

    #[test]
    fn test_wrapped_source() {
        let cause = std::io::Error::other("underlying");
        let err = NoRefcursorLeft::with_source("lookup failed", cause);
        assert_eq!(err.to_string(), "lookup failed");
        assert_eq!(
            err.source().map(|e| e.to_string()).as_deref(),
            Some("underlying")
        );
    }

    #[test]
    fn test_crate_error_wraps_misuse() {
        let err: Error = NoRefcursorLeft::new().into();
        assert!(err.is_no_refcursor_left());
        assert!(err.as_db_error().is_none());
        assert_eq!(err.to_string(), "no refcursor left");

        let err = Error::InvalidCursorName("NULL in row 0".into());
        assert!(!err.is_no_refcursor_left());
    }
}
