//! Hydrated file records emitted by the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::events::RawEvent;

/// A virtual file object carrying a path, optional filesystem metadata and
/// optional contents, independent of disk IO timing.
///
/// Removal events produce records with neither fresh metadata nor contents;
/// creation and modification events produce records hydrated by the
/// enrichment chain.
#[derive(Debug)]
pub struct FileRecord {
    /// Path of the file or directory.
    pub path: PathBuf,

    /// Filesystem metadata, if attached.
    pub metadata: Option<FileMetadata>,

    /// File contents, if read.
    pub contents: Option<FileContents>,
}

impl FileRecord {
    /// Create a bare record with no metadata or contents.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            metadata: None,
            contents: None,
        }
    }

    /// Build a record for a removal event. No filesystem access happens;
    /// metadata supplied by the watcher on the raw event is carried over.
    pub fn from_removal(event: RawEvent) -> Self {
        Self {
            path: event.path,
            metadata: event.stat,
            contents: None,
        }
    }

    /// Check if this record refers to a directory, where known.
    pub fn is_dir(&self) -> bool {
        self.metadata.map(|m| m.is_dir).unwrap_or(false)
    }

    /// Get buffered contents as bytes, if present.
    pub fn contents_bytes(&self) -> Option<&[u8]> {
        match &self.contents {
            Some(FileContents::Buffer(bytes)) => Some(bytes),
            _ => None,
        }
    }
}

/// Filesystem metadata attached to a record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FileMetadata {
    /// Size in bytes.
    pub size: u64,

    /// Modification time, where the platform reports one.
    pub mtime: Option<DateTime<Utc>>,

    /// Unix permission bits, where available.
    pub mode: Option<u32>,

    /// Whether the path is a directory.
    pub is_dir: bool,
}

impl FileMetadata {
    /// Convert from the standard library's metadata.
    pub fn from_std(meta: &std::fs::Metadata) -> Self {
        let mtime = meta.modified().ok().map(DateTime::<Utc>::from);

        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            Some(meta.permissions().mode())
        };
        #[cfg(not(unix))]
        let mode = None;

        Self {
            size: meta.len(),
            mtime,
            mode,
            is_dir: meta.is_dir(),
        }
    }
}

/// Contents attached to a record by the read step.
#[derive(Debug)]
pub enum FileContents {
    /// Contents read fully into memory (`buffer: true`).
    Buffer(Vec<u8>),

    /// An open handle for streaming consumption (`buffer: false`). The file
    /// is opened but not read; downstream decides when to pull bytes.
    Stream(tokio::fs::File),
}

impl FileContents {
    /// Check whether contents are buffered in memory.
    pub fn is_buffer(&self) -> bool {
        matches!(self, Self::Buffer(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventKind, RawEvent};

    #[test]
    fn removal_record_has_no_contents() {
        let record = FileRecord::from_removal(RawEvent::new(EventKind::Unlink, "/tmp/gone"));
        assert_eq!(record.path, PathBuf::from("/tmp/gone"));
        assert!(record.metadata.is_none());
        assert!(record.contents.is_none());
    }

    #[test]
    fn removal_record_carries_watcher_stat() {
        let stat = FileMetadata {
            size: 42,
            mtime: None,
            mode: None,
            is_dir: false,
        };
        let record =
            FileRecord::from_removal(RawEvent::with_stat(EventKind::Unlink, "/tmp/gone", stat));
        assert_eq!(record.metadata, Some(stat));
    }

    #[test]
    fn contents_bytes_only_for_buffers() {
        let mut record = FileRecord::new("/tmp/x");
        assert!(record.contents_bytes().is_none());
        record.contents = Some(FileContents::Buffer(b"hello".to_vec()));
        assert_eq!(record.contents_bytes(), Some(&b"hello"[..]));
    }
}
