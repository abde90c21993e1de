//! Attachment records as returned by a content resolver.
//!
//! A record knows nothing about how its renditions are stored.
//! It only maps a rendition number to a locator string.

use std::collections::BTreeMap;

/// Small rendition, suitable for thumbnails and list previews.
pub const RENDITION_SIMPLE: i32 = 0;

/// Full-size rendition.
pub const RENDITION_BEST: i32 = 1;

/// Metadata for one attachment, keyed by its lookup identifier in a resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AttachmentRecord {
    /// MIME content type as stored (e.g. `"image/jpeg"`). May be missing or
    /// in any case; consumers lower-case it.
    #[serde(default)]
    pub content_type: Option<String>,

    /// Rendition number → resource locator.
    #[serde(default)]
    pub renditions: BTreeMap<i32, String>,
}

impl AttachmentRecord {
    pub fn new(content_type: Option<&str>) -> Self {
        Self {
            content_type: content_type.map(str::to_string),
            renditions: BTreeMap::new(),
        }
    }

    /// Builder-style helper to register a locator for a rendition.
    pub fn with_rendition(mut self, rendition: i32, locator: impl Into<String>) -> Self {
        self.renditions.insert(rendition, locator.into());
        self
    }

    /// Locator for `rendition`, if the record carries one.
    pub fn uri_for_rendition(&self, rendition: i32) -> Option<&str> {
        self.renditions.get(&rendition).map(String::as_str)
    }

    /// Content type lower-cased, or `None` when unknown.
    pub fn normalized_content_type(&self) -> Option<String> {
        self.content_type.as_deref().map(str::to_lowercase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_for_rendition() {
        let rec = AttachmentRecord::new(Some("image/png"))
            .with_rendition(RENDITION_SIMPLE, "thumbs/a.png")
            .with_rendition(RENDITION_BEST, "full/a.png");
        assert_eq!(rec.uri_for_rendition(RENDITION_SIMPLE), Some("thumbs/a.png"));
        assert_eq!(rec.uri_for_rendition(RENDITION_BEST), Some("full/a.png"));
        assert_eq!(rec.uri_for_rendition(7), None);
    }

    #[test]
    fn test_normalized_content_type() {
        assert_eq!(
            AttachmentRecord::new(Some("IMAGE/JPEG")).normalized_content_type(),
            Some("image/jpeg".to_string())
        );
        assert_eq!(AttachmentRecord::new(None).normalized_content_type(), None);
    }

    #[test]
    fn test_deserialize_string_keys() {
        let json = r#"{"content_type":"image/gif","renditions":{"0":"a.gif","1":"b.gif"}}"#;
        let rec: AttachmentRecord = serde_json::from_str(json).expect("parse");
        assert_eq!(rec.uri_for_rendition(1), Some("b.gif"));
    }

    #[test]
    fn test_deserialize_missing_fields() {
        let rec: AttachmentRecord = serde_json::from_str("{}").expect("parse");
        assert_eq!(rec, AttachmentRecord::default());
    }
}
