//! Content resolution seams.
//!
//! A [`ContentResolver`] answers two questions for a request: which record
//! belongs to a lookup identifier ([`ContentResolver::query`]) and how to read
//! the bytes behind a resolved locator ([`ContentResolver::open_readable`]).

pub mod directory;
pub mod memory;

use std::fmt;
use std::io::Read;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::error::{PreviewError, Result};
use crate::model::attachment::AttachmentRecord;

/// How a resolved resource should be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    ReadWrite,
}

impl OpenMode {
    /// Short textual form (`"r"` / `"rw"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::ReadWrite => "rw",
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a lookup query. Holds at most one meaningful row.
///
/// Cursors must be closed once read; wrap them in a [`CursorGuard`] so that
/// happens on every exit path.
pub trait QueryCursor {
    /// Move to the first row. Returns `false` for an empty result.
    fn move_to_first(&mut self) -> bool;

    /// Read the record at the current row.
    fn record(&self) -> Result<AttachmentRecord>;

    /// Release the cursor. Calling this more than once is harmless.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// An open, caller-owned readable resource. Dropping it releases it.
pub trait ReadableHandle: Read + Send {
    /// Length in bytes if the resolver knows it up front.
    fn declared_length(&self) -> Option<u64>;
}

/// The service that maps lookup identifiers to records and locators to bytes.
pub trait ContentResolver: Send + Sync {
    /// Look up the record for `lookup_uri`.
    ///
    /// `Ok(None)` means the service returned no cursor at all; an empty cursor
    /// means it ran the query and found nothing. Both are "not found".
    fn query(&self, lookup_uri: &str) -> Result<Option<Box<dyn QueryCursor>>>;

    /// Open the resource behind a resolved locator.
    fn open_readable(&self, locator: &str, mode: OpenMode) -> Result<Box<dyn ReadableHandle>>;
}

/// Scoped ownership of a [`QueryCursor`]: closes it when dropped.
pub struct CursorGuard {
    cursor: Box<dyn QueryCursor>,
}

impl CursorGuard {
    pub fn new(cursor: Box<dyn QueryCursor>) -> Self {
        Self { cursor }
    }
}

impl Deref for CursorGuard {
    type Target = dyn QueryCursor;

    fn deref(&self) -> &Self::Target {
        self.cursor.as_ref()
    }
}

impl DerefMut for CursorGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.cursor.as_mut()
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        if !self.cursor.is_closed() {
            trace!("Releasing query cursor");
            self.cursor.close();
        }
    }
}

/// Zero- or one-row cursor over an already loaded record.
///
/// Shared by the bundled resolvers; both load the row eagerly during `query`.
pub struct RowCursor {
    lookup: String,
    row: Option<AttachmentRecord>,
    positioned: bool,
    closed: bool,
    closes: Option<Arc<AtomicUsize>>,
}

impl RowCursor {
    pub fn new(lookup: &str, row: Option<AttachmentRecord>) -> Self {
        Self {
            lookup: lookup.to_string(),
            row,
            positioned: false,
            closed: false,
            closes: None,
        }
    }

    /// Bump `counter` once when this cursor is closed.
    pub fn with_close_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.closes = Some(counter);
        self
    }
}

impl QueryCursor for RowCursor {
    fn move_to_first(&mut self) -> bool {
        self.positioned = !self.closed && self.row.is_some();
        self.positioned
    }

    fn record(&self) -> Result<AttachmentRecord> {
        if self.closed {
            return Err(PreviewError::CursorClosed);
        }
        match (&self.row, self.positioned) {
            (Some(row), true) => Ok(row.clone()),
            _ => Err(PreviewError::Query {
                lookup: self.lookup.clone(),
                reason: "cursor is not positioned on a row".to_string(),
            }),
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(counter) = &self.closes {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingCursor {
        closed: bool,
        closes: Arc<AtomicUsize>,
    }

    impl QueryCursor for CountingCursor {
        fn move_to_first(&mut self) -> bool {
            false
        }

        fn record(&self) -> Result<AttachmentRecord> {
            Ok(AttachmentRecord::default())
        }

        fn close(&mut self) {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }

        fn is_closed(&self) -> bool {
            self.closed
        }
    }

    #[test]
    fn test_guard_closes_on_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let mut guard = CursorGuard::new(Box::new(CountingCursor {
                closed: false,
                closes: Arc::clone(&closes),
            }));
            assert!(!guard.move_to_first());
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_skips_already_closed() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let mut guard = CursorGuard::new(Box::new(CountingCursor {
                closed: false,
                closes: Arc::clone(&closes),
            }));
            guard.close();
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_row_cursor_requires_positioning() {
        let mut cursor = RowCursor::new("att/1", Some(AttachmentRecord::default()));
        assert!(cursor.record().is_err());
        assert!(cursor.move_to_first());
        assert!(cursor.record().is_ok());
    }

    #[test]
    fn test_row_cursor_counts_single_close() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut cursor = RowCursor::new("att/1", None).with_close_counter(Arc::clone(&closes));
        cursor.close();
        cursor.close();
        assert!(cursor.is_closed());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_open_mode_str() {
        assert_eq!(OpenMode::Read.to_string(), "r");
        assert_eq!(OpenMode::ReadWrite.as_str(), "rw");
    }
}
