//! Directory-backed content resolver.
//!
//! ```text
//! <root>/
//! ├── attachments.json        lookup uri → record
//! ├── thumbs/a.jpg            rendition files, referenced by relative locator
//! └── full/a.jpg
//! ```
//!
//! The manifest is re-read on every query so that a store edited on disk is
//! picked up without restarting.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ContentResolver, OpenMode, QueryCursor, ReadableHandle, RowCursor};
use crate::error::{PreviewError, Result};
use crate::model::attachment::AttachmentRecord;

/// File name of the manifest inside the store root.
pub const MANIFEST_FILE: &str = "attachments.json";

/// On-disk manifest layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub attachments: BTreeMap<String, AttachmentRecord>,
}

/// Resolves lookups against `<root>/attachments.json` and opens rendition
/// files relative to `root`.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Read and parse the manifest.
    pub fn load_manifest(&self) -> Result<Manifest> {
        let path = self.manifest_path();
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| PreviewError::io(path.display().to_string(), e))?;
        serde_json::from_str(&contents).map_err(|e| PreviewError::InvalidManifest {
            path,
            reason: e.to_string(),
        })
    }

    /// Write `manifest` to the store root, replacing any existing one.
    pub fn save_manifest(&self, manifest: &Manifest) -> Result<()> {
        let path = self.manifest_path();
        let contents =
            serde_json::to_string_pretty(manifest).map_err(|e| PreviewError::InvalidManifest {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        std::fs::write(&path, contents).map_err(|e| PreviewError::io(path.display().to_string(), e))
    }

    /// All lookup identifiers known to the store, sorted.
    pub fn lookups(&self) -> Result<Vec<String>> {
        Ok(self.load_manifest()?.attachments.into_keys().collect())
    }

    /// Map a locator to a path under `root`, refusing anything that escapes it.
    fn locate(&self, locator: &str) -> Result<PathBuf> {
        let rel = Path::new(locator);
        let mut parts = 0usize;
        for component in rel.components() {
            match component {
                Component::Normal(_) => parts += 1,
                Component::CurDir => {}
                _ => return Err(PreviewError::InvalidLocator(locator.to_string())),
            }
        }
        if parts == 0 {
            return Err(PreviewError::InvalidLocator(locator.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl ContentResolver for DirectoryResolver {
    fn query(&self, lookup_uri: &str) -> Result<Option<Box<dyn QueryCursor>>> {
        let mut manifest = self.load_manifest()?;
        let row = manifest.attachments.remove(lookup_uri);
        debug!(
            root = %self.root.display(),
            lookup = lookup_uri,
            found = row.is_some(),
            "Directory query"
        );
        Ok(Some(Box::new(RowCursor::new(lookup_uri, row))))
    }

    fn open_readable(&self, locator: &str, mode: OpenMode) -> Result<Box<dyn ReadableHandle>> {
        let path = self.locate(locator)?;
        let file = OpenOptions::new()
            .read(true)
            .write(mode == OpenMode::ReadWrite)
            .open(&path)
            .map_err(|e| PreviewError::io(locator, e))?;
        let length = file.metadata().ok().map(|m| m.len());
        debug!(path = %path.display(), mode = %mode, "Opened rendition file");
        Ok(Box::new(FileHandle { file, length }))
    }
}

struct FileHandle {
    file: File,
    length: Option<u64>,
}

impl Read for FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl ReadableHandle for FileHandle {
    fn declared_length(&self) -> Option<u64> {
        self.length
    }
}
