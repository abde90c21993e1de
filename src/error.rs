//! Centralized error types for mailpreview.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailpreview library.
///
/// Every variant is an I/O-class failure from the point of view of a decode
/// task: see the `From<PreviewError> for std::io::Error` conversion below.
#[derive(Error, Debug)]
pub enum PreviewError {
    /// I/O error opening or reading a resolved resource.
    #[error("I/O error on '{locator}': {source}")]
    Io {
        locator: String,
        source: std::io::Error,
    },

    /// The resolution service failed to answer a lookup.
    #[error("Query for '{lookup}' failed: {reason}")]
    Query { lookup: String, reason: String },

    /// A row was read from a cursor after it was released.
    #[error("Cursor is closed")]
    CursorClosed,

    /// A readable handle was requested but the lookup produced no locator.
    #[error("No resolved locator for '{lookup}'")]
    Unresolved { lookup: String },

    /// The locator cannot be opened by this resolver.
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    /// The attachment manifest exists but cannot be parsed.
    #[error("Invalid attachment manifest '{path}': {reason}")]
    InvalidManifest { path: PathBuf, reason: String },
}

/// Convenience alias for `Result<T, PreviewError>`.
pub type Result<T> = std::result::Result<T, PreviewError>;

impl PreviewError {
    /// Create an `Io` variant from a locator and an `io::Error`.
    pub fn io(locator: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            locator: locator.into(),
            source,
        }
    }

    /// `true` when the failure means "nothing there" rather than a broken service.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Unresolved { .. } => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<PreviewError> for std::io::Error {
    fn from(err: PreviewError) -> Self {
        let kind = match &err {
            PreviewError::Io { source, .. } => source.kind(),
            PreviewError::Unresolved { .. } => std::io::ErrorKind::NotFound,
            PreviewError::InvalidLocator(_) | PreviewError::InvalidManifest { .. } => {
                std::io::ErrorKind::InvalidData
            }
            PreviewError::Query { .. } | PreviewError::CursorClosed => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}
