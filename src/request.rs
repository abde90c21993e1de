//! Image attachment preview requests.
//!
//! An [`ImageAttachmentRequest`] names one rendition of one attachment at a
//! given decode width. It is cheap to build and compare; the lookup against
//! the [`ContentResolver`] only happens when a decoder first asks for data.
//!
//! All requests for a list share the same width so decode buffers can be
//! reused between them.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::sync::Arc;

use tracing::debug;

use crate::error::{PreviewError, Result};
use crate::provider::{ContentResolver, CursorGuard, OpenMode, ReadableHandle};

/// Mime type that may carry an EXIF orientation tag.
const JPEG_MIME_TYPE: &str = "image/jpeg";

/// What a decode task needs from a request, beyond equality and hashing.
pub trait DecodeRequest {
    /// Open the content for reading. The caller owns the handle.
    fn create_fd(&self) -> Result<Box<dyn ReadableHandle>>;

    /// Raw stream alternative to [`DecodeRequest::create_fd`]. `Ok(None)` when
    /// the request only supports handles.
    fn create_input_stream(&self) -> Result<Option<Box<dyn Read + Send>>>;

    /// Whether the decoder should look for an EXIF orientation tag.
    fn has_orientation_exif(&self) -> Result<bool>;
}

/// Lazily populated resolution state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Resolution {
    #[default]
    Unresolved,
    Resolved {
        /// Locator of the requested rendition.
        uri: String,
        /// Lower-cased content type, `None` when the record has none.
        mime_type: Option<String>,
    },
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// A request for one rendition of an image attachment.
///
/// Identity is `(lookup_uri, rendition, dest_width)`; the resolution state
/// never takes part in `==` or hashing. The `RefCell` holding that state makes
/// clippy's `mutable_key_type` lint fire when requests are used as map or set
/// keys, but `Hash` and `Eq` only read the immutable identity fields, so the
/// key never changes while stored.
pub struct ImageAttachmentRequest {
    resolver: Arc<dyn ContentResolver>,
    lookup_uri: String,
    rendition: i32,
    dest_width: u32,
    resolution: RefCell<Resolution>,
}

impl ImageAttachmentRequest {
    /// Create an unresolved request. No lookup happens until a decoder asks
    /// for data or for the orientation hint.
    pub fn new(
        resolver: Arc<dyn ContentResolver>,
        lookup_uri: impl Into<String>,
        rendition: i32,
        dest_width: u32,
    ) -> Self {
        Self {
            resolver,
            lookup_uri: lookup_uri.into(),
            rendition,
            dest_width,
            resolution: RefCell::new(Resolution::Unresolved),
        }
    }

    /// Opaque identifier passed to [`ContentResolver::query`].
    pub fn lookup_uri(&self) -> &str {
        &self.lookup_uri
    }

    /// Requested rendition (see `model::attachment::RENDITION_*`).
    pub fn rendition(&self) -> i32 {
        self.rendition
    }

    /// Target decode width in pixels.
    pub fn dest_width(&self) -> u32 {
        self.dest_width
    }

    /// Snapshot of the resolution state. Does not trigger a lookup.
    pub fn resolution(&self) -> Resolution {
        self.resolution.borrow().clone()
    }

    /// `true` once a lookup has produced a locator.
    pub fn is_resolved(&self) -> bool {
        self.resolution.borrow().is_resolved()
    }

    /// Resolved locator, if a lookup has succeeded.
    pub fn resolved_uri(&self) -> Option<String> {
        match &*self.resolution.borrow() {
            Resolution::Resolved { uri, .. } => Some(uri.clone()),
            Resolution::Unresolved => None,
        }
    }

    /// Resolved lower-cased mime type, if a lookup has succeeded and the
    /// record carried one.
    pub fn resolved_mime_type(&self) -> Option<String> {
        match &*self.resolution.borrow() {
            Resolution::Resolved { mime_type, .. } => mime_type.clone(),
            Resolution::Unresolved => None,
        }
    }

    /// `true` if `other` is the same attachment at the same width, possibly
    /// a different rendition.
    pub fn matches(&self, other: &ImageAttachmentRequest) -> bool {
        self.lookup_uri == other.lookup_uri && self.dest_width == other.dest_width
    }

    /// Run the lookup unless a previous one already succeeded.
    ///
    /// A lookup that finds nothing leaves the request unresolved so the next
    /// call tries again.
    pub fn resolve(&self) -> Result<()> {
        if self.is_resolved() {
            return Ok(());
        }

        let Some(cursor) = self.resolver.query(&self.lookup_uri)? else {
            debug!(request = %self, "Resolver returned no cursor");
            return Ok(());
        };
        let mut cursor = CursorGuard::new(cursor);
        if !cursor.move_to_first() {
            debug!(request = %self, "No attachment record");
            return Ok(());
        }

        let record = cursor.record()?;
        let Some(uri) = record.uri_for_rendition(self.rendition) else {
            debug!(request = %self, "Attachment record has no locator for rendition");
            return Ok(());
        };
        let resolved = Resolution::Resolved {
            uri: uri.to_string(),
            mime_type: record.normalized_content_type(),
        };
        debug!(request = %self, resolution = ?resolved, "Resolved attachment");
        *self.resolution.borrow_mut() = resolved;
        Ok(())
    }
}

impl DecodeRequest for ImageAttachmentRequest {
    fn create_fd(&self) -> Result<Box<dyn ReadableHandle>> {
        self.resolve()?;
        let uri = self
            .resolved_uri()
            .ok_or_else(|| PreviewError::Unresolved {
                lookup: self.lookup_uri.clone(),
            })?;
        self.resolver.open_readable(&uri, OpenMode::Read)
    }

    fn create_input_stream(&self) -> Result<Option<Box<dyn Read + Send>>> {
        Ok(None)
    }

    fn has_orientation_exif(&self) -> Result<bool> {
        self.resolve()?;
        Ok(match self.resolved_mime_type() {
            None => true,
            Some(mime) => mime == JPEG_MIME_TYPE,
        })
    }
}

impl PartialEq for ImageAttachmentRequest {
    fn eq(&self, other: &Self) -> bool {
        self.lookup_uri == other.lookup_uri
            && self.rendition == other.rendition
            && self.dest_width == other.dest_width
    }
}

impl Eq for ImageAttachmentRequest {}

impl Hash for ImageAttachmentRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lookup_uri.hash(state);
        self.rendition.hash(state);
        self.dest_width.hash(state);
    }
}

impl fmt::Display for ImageAttachmentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ImageAttachmentRequest uri={} rendition={} w={}]",
            self.lookup_uri, self.rendition, self.dest_width
        )
    }
}

impl fmt::Debug for ImageAttachmentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAttachmentRequest")
            .field("lookup_uri", &self.lookup_uri)
            .field("rendition", &self.rendition)
            .field("dest_width", &self.dest_width)
            .field("resolution", &*self.resolution.borrow())
            .finish()
    }
}
