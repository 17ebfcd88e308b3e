//! Raw watcher event types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::record::FileMetadata;

/// A raw filesystem change event as produced by an external watcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawEvent {
    /// Kind of change. Watchers occasionally emit values without an event
    /// tag; those pass the whitelist filter unfiltered (and are later
    /// dropped at the branch split because they match neither branch).
    #[serde(rename = "event", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventKind>,

    /// Path the change applies to.
    pub path: PathBuf,

    /// Metadata supplied by the watcher alongside the event, if any.
    /// The stat-needed branch always re-stats; the delete branch carries
    /// this through onto the emitted record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat: Option<FileMetadata>,
}

impl RawEvent {
    /// Create a new event of the given kind.
    pub fn new(kind: EventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind: Some(kind),
            path: path.into(),
            stat: None,
        }
    }

    /// Create a new event carrying watcher-supplied metadata.
    pub fn with_stat(kind: EventKind, path: impl Into<PathBuf>, stat: FileMetadata) -> Self {
        Self {
            kind: Some(kind),
            path: path.into(),
            stat: Some(stat),
        }
    }

    /// Create an event that lacks an event tag.
    pub fn untagged(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: None,
            path: path.into(),
            stat: None,
        }
    }
}

/// Kinds of filesystem change events.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// A file was created.
    Add,
    /// A file was modified.
    Change,
    /// A file was deleted.
    Unlink,
    /// A directory was created.
    AddDir,
    /// A directory was deleted.
    UnlinkDir,
}

impl EventKind {
    /// All valid event kinds, in canonical order.
    pub const ALL: [EventKind; 5] = [
        Self::Add,
        Self::Change,
        Self::Unlink,
        Self::AddDir,
        Self::UnlinkDir,
    ];

    /// Check if this kind refers to something that exists on disk and can
    /// be stat-ed (the stat-needed branch).
    pub fn affects_content(self) -> bool {
        matches!(self, Self::Add | Self::Change | Self::AddDir)
    }

    /// Check if this kind represents a removal (the stat-less branch).
    pub fn is_removal(self) -> bool {
        matches!(self, Self::Unlink | Self::UnlinkDir)
    }

    /// Get the wire-format token for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Unlink => "unlink",
            Self::AddDir => "addDir",
            Self::UnlinkDir => "unlinkDir",
        }
    }

    /// Parse a wire-format token. Unknown tokens yield `None`; whitelist
    /// normalization drops them silently.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "add" => Some(Self::Add),
            "change" => Some(Self::Change),
            "unlink" => Some(Self::Unlink),
            "addDir" => Some(Self::AddDir),
            "unlinkDir" => Some(Self::UnlinkDir),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_change_add_dir_affect_content() {
        assert!(EventKind::Add.affects_content());
        assert!(EventKind::Change.affects_content());
        assert!(EventKind::AddDir.affects_content());
        assert!(!EventKind::Unlink.affects_content());
    }

    #[test]
    fn unlink_kinds_are_removal() {
        assert!(EventKind::Unlink.is_removal());
        assert!(EventKind::UnlinkDir.is_removal());
        assert!(!EventKind::Change.is_removal());
    }

    #[test]
    fn every_kind_round_trips_through_token() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_token(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::from_token("rename"), None);
    }

    #[test]
    fn event_deserializes_from_watcher_json() {
        let ev: RawEvent = serde_json::from_str(r#"{"event":"addDir","path":"/tmp/x"}"#).unwrap();
        assert_eq!(ev.kind, Some(EventKind::AddDir));
        assert_eq!(ev.path, std::path::PathBuf::from("/tmp/x"));
        assert!(ev.stat.is_none());
    }

    #[test]
    fn event_without_tag_deserializes_as_untagged() {
        let ev: RawEvent = serde_json::from_str(r#"{"path":"/tmp/x"}"#).unwrap();
        assert_eq!(ev.kind, None);
    }
}
