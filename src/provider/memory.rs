//! In-memory content resolver.
//!
//! Useful for embedding (records already held by the caller) and for tests.
//! It keeps counters of queries run and cursors released so callers can check
//! that resolution is not repeated and that cursors never leak.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::{ContentResolver, OpenMode, QueryCursor, ReadableHandle, RowCursor};
use crate::error::{PreviewError, Result};
use crate::model::attachment::AttachmentRecord;

/// Resolver backed by two hash maps: lookup → record and locator → bytes.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    records: HashMap<String, AttachmentRecord>,
    contents: HashMap<String, Vec<u8>>,
    fail_queries: AtomicBool,
    queries: AtomicUsize,
    closes: Arc<AtomicUsize>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the record returned for `lookup_uri`.
    pub fn insert(&mut self, lookup_uri: impl Into<String>, record: AttachmentRecord) {
        self.records.insert(lookup_uri.into(), record);
    }

    /// Register the bytes served for `locator`.
    pub fn insert_content(&mut self, locator: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.contents.insert(locator.into(), bytes.into());
    }

    /// Make every subsequent query fail (or succeed again with `false`).
    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Number of queries run so far, including failed ones.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of cursors released so far.
    pub fn closed_cursor_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl ContentResolver for MemoryResolver {
    fn query(&self, lookup_uri: &str) -> Result<Option<Box<dyn QueryCursor>>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(PreviewError::Query {
                lookup: lookup_uri.to_string(),
                reason: "resolver configured to fail".to_string(),
            });
        }

        let row = self.records.get(lookup_uri).cloned();
        debug!(lookup = lookup_uri, found = row.is_some(), "Memory query");
        Ok(Some(Box::new(
            RowCursor::new(lookup_uri, row).with_close_counter(Arc::clone(&self.closes)),
        )))
    }

    fn open_readable(&self, locator: &str, mode: OpenMode) -> Result<Box<dyn ReadableHandle>> {
        if mode != OpenMode::Read {
            return Err(PreviewError::io(
                locator,
                std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "in-memory content is read-only",
                ),
            ));
        }
        let bytes = self.contents.get(locator).ok_or_else(|| {
            PreviewError::io(locator, std::io::Error::from(std::io::ErrorKind::NotFound))
        })?;
        Ok(Box::new(MemoryHandle {
            inner: Cursor::new(bytes.clone()),
        }))
    }
}

struct MemoryHandle {
    inner: Cursor<Vec<u8>>,
}

impl Read for MemoryHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl ReadableHandle for MemoryHandle {
    fn declared_length(&self) -> Option<u64> {
        Some(self.inner.get_ref().len() as u64)
    }
}
