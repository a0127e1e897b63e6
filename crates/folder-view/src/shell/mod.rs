//! Shell namespace boundary.
//!
//! The `ShellNamespace` trait abstracts the host's namespace so the item model can run
//! against different backends:
//! - `LocalNamespace`: the real local file system
//! - `InMemoryNamespace`: an in-memory tree for tests and virtual folders
//!
//! Items are addressed by identity tokens (`ItemIdList`), not by paths. Only namespaces
//! backed by a file system can translate an identity into a path.

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, MAIN_SEPARATOR, MAIN_SEPARATOR_STR, Path, PathBuf};

mod in_memory;
mod local;

pub use in_memory::{EnumerationGate, InMemoryNamespace};
pub use local::LocalNamespace;

// ============================================================================
// Identity tokens
// ============================================================================

/// Fully-qualified identity of an item: the chain of child ids from the namespace root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemIdList(Vec<String>);

impl ItemIdList {
    /// The namespace root (an empty chain).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parses the `"/a/b"` form produced by `Display`.
    pub fn parse(text: &str) -> Self {
        Self::from_segments(text.split('/').filter(|s| !s.is_empty()))
    }

    /// Builds an identity from a file system path, one segment per path component.
    pub fn from_path(path: &Path) -> Self {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                // Keep the separator so the prefix stays absolute when turned back into a path
                Component::Prefix(prefix) => {
                    segments.push(format!("{}{}", prefix.as_os_str().to_string_lossy(), MAIN_SEPARATOR))
                }
                Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
                Component::ParentDir => {
                    segments.pop();
                }
                Component::RootDir | Component::CurDir => {}
            }
        }
        Self(segments)
    }

    /// Converts the identity back into an absolute path.
    pub fn to_path(&self) -> PathBuf {
        let mut path = PathBuf::from(MAIN_SEPARATOR_STR);
        for segment in &self.0 {
            path.push(segment);
        }
        path
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Identity of the containing folder, or `None` for the root.
    pub fn parent(&self) -> Option<ItemIdList> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// The last segment, relative to the parent folder.
    pub fn child_id(&self) -> Option<ChildId> {
        self.0.last().map(|last| ChildId(last.clone()))
    }

    pub fn join(&self, child: &ChildId) -> ItemIdList {
        let mut segments = self.0.clone();
        segments.push(child.0.clone());
        Self(segments)
    }

    /// True if `self` is a direct child of `folder`.
    pub fn is_child_of(&self, folder: &ItemIdList) -> bool {
        self.0.len() == folder.0.len() + 1 && self.0.starts_with(&folder.0)
    }
}

impl fmt::Display for ItemIdList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

/// Identity of an item relative to its parent folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChildId(String);

impl ChildId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Metadata
// ============================================================================

bitflags! {
    /// File attribute flags, as reported by the namespace.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FileAttributes: u32 {
        const DIRECTORY = 1 << 0;
        const HIDDEN = 1 << 1;
        const READ_ONLY = 1 << 2;
        const SYSTEM = 1 << 3;
        const ARCHIVE = 1 << 4;
        const SYMLINK = 1 << 5;
        const COMPRESSED = 1 << 6;
        const ENCRYPTED = 1 << 7;
    }
}

/// Cached file system metadata for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetadata {
    /// Size in bytes (0 for folders).
    pub size: u64,
    pub attributes: FileAttributes,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
    /// Numeric owner id, where the namespace has one.
    pub owner: Option<u32>,
}

impl FileMetadata {
    pub fn is_directory(&self) -> bool {
        self.attributes.contains(FileAttributes::DIRECTORY)
    }
}

/// Drive marker for removable-media items. The root is kept so the item can still be
/// found after the drive is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveInfo {
    pub root: String,
    pub label: String,
}

/// One child entry as reported by the namespace during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChild {
    /// Absolute identity of the child.
    pub id: ItemIdList,
    pub display_name: String,
    pub parsing_name: String,
    /// Attributes known from the enumeration itself, even when metadata isn't.
    pub attributes: FileAttributes,
    /// Metadata from the namespace's property store, when it has one for this item.
    pub metadata: Option<FileMetadata>,
    pub drive: Option<DriveInfo>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error type for namespace operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShellError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// The namespace can't provide metadata for this item.
    #[error("Metadata not available: {0}")]
    NotAvailable(String),
    #[error("Operation not supported")]
    NotSupported,
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ShellError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

// ============================================================================
// Namespace trait
// ============================================================================

/// Capability for reading a shell namespace.
///
/// Calls may block (network shares, slow devices), so callers run them off the
/// synchronizing thread.
pub trait ShellNamespace: Send + Sync {
    /// Lists the children of `folder`. Hidden children are left out unless `show_hidden`
    /// is set, so they never reach the model.
    fn enumerate_children(&self, folder: &ItemIdList, show_hidden: bool) -> Result<Vec<RawChild>, ShellError>;

    /// Direct per-item metadata query. Slower than the property store, and not every
    /// namespace supports it at full fidelity.
    fn get_metadata(&self, item: &ItemIdList) -> Result<FileMetadata, ShellError>;

    /// Resolves a single identity to a full child record (used for change notifications).
    fn describe(&self, item: &ItemIdList) -> Result<RawChild, ShellError>;

    /// Returns true if `folder` is not backed by a file system.
    fn is_virtual_folder(&self, folder: &ItemIdList) -> bool {
        let _ = folder;
        false
    }

    /// Returns the file system path for an item, if the namespace has one.
    fn filesystem_path(&self, item: &ItemIdList) -> Option<PathBuf> {
        let _ = item;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_parent_and_child() {
        let id = ItemIdList::from_segments(["home", "user", "notes.txt"]);
        assert_eq!(id.parent(), Some(ItemIdList::from_segments(["home", "user"])));
        assert_eq!(id.child_id(), Some(ChildId::new("notes.txt")));
        assert!(id.is_child_of(&ItemIdList::from_segments(["home", "user"])));
        assert!(!id.is_child_of(&ItemIdList::from_segments(["home"])));
        assert_eq!(ItemIdList::root().parent(), None);
    }

    #[test]
    fn identity_join_round_trips_with_child_id() {
        let folder = ItemIdList::from_segments(["docs"]);
        let child = ChildId::new("a.txt");
        let joined = folder.join(&child);
        assert_eq!(joined.child_id(), Some(child));
        assert_eq!(joined.parent(), Some(folder));
    }

    #[cfg(unix)]
    #[test]
    fn identity_from_path_and_back() {
        let id = ItemIdList::from_path(Path::new("/tmp/project/../data/file.bin"));
        assert_eq!(id.segments(), ["tmp", "data", "file.bin"]);
        assert_eq!(id.to_path(), PathBuf::from("/tmp/data/file.bin"));
        assert_eq!(id.to_string(), "/tmp/data/file.bin");
    }

    #[test]
    fn io_errors_map_to_specific_variants() {
        let err: ShellError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, ShellError::NotFound(_)));
        let err: ShellError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no").into();
        assert!(matches!(err, ShellError::PermissionDenied(_)));
        let err: ShellError = std::io::Error::other("boom").into();
        assert!(matches!(err, ShellError::Io(_)));
    }
}
