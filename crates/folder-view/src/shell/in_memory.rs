//! In-memory namespace for tests and synthetic (virtual) folders.
//!
//! Also lets a caller hold an enumeration open after it has taken its snapshot, which is
//! how the reconciler's "event arrives mid-enumeration" paths are exercised
//! deterministically.

use super::{DriveInfo, FileAttributes, FileMetadata, ItemIdList, RawChild, ShellError, ShellNamespace};
use crate::ignore_poison::IgnorePoison;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, mpsc};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Node {
    display_name: String,
    metadata: FileMetadata,
    /// Whether enumeration reports metadata directly (the fast path).
    property_store: bool,
    /// Whether a direct metadata query succeeds.
    metadata_available: bool,
    drive: Option<DriveInfo>,
}

struct HeldEnumeration {
    reached: mpsc::Sender<()>,
    release: mpsc::Receiver<()>,
}

/// Handle for an enumeration held open with [`InMemoryNamespace::hold_enumeration`].
///
/// Dropping the gate releases the enumeration.
pub struct EnumerationGate {
    reached: mpsc::Receiver<()>,
    release: mpsc::Sender<()>,
}

impl EnumerationGate {
    /// Blocks until the enumeration has read its snapshot and is waiting on the gate.
    pub fn wait_until_reached(&self, timeout: Duration) -> bool {
        self.reached.recv_timeout(timeout).is_ok()
    }

    /// Lets the held enumeration return its snapshot.
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

/// A namespace whose tree lives entirely in memory.
#[derive(Default)]
pub struct InMemoryNamespace {
    nodes: Mutex<BTreeMap<ItemIdList, Node>>,
    virtual_folders: Mutex<HashSet<ItemIdList>>,
    unreachable: Mutex<HashSet<ItemIdList>>,
    held: Mutex<Option<HeldEnumeration>>,
}

impl InMemoryNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, item: &ItemIdList, attributes: FileAttributes, size: u64) {
        let display_name = item.child_id().map(|c| c.as_str().to_string()).unwrap_or_default();
        let node = Node {
            display_name,
            metadata: FileMetadata {
                size,
                attributes,
                ..FileMetadata::default()
            },
            property_store: true,
            metadata_available: true,
            drive: None,
        };
        self.nodes.lock_ignore_poison().insert(item.clone(), node);
    }

    fn update(&self, item: &ItemIdList, f: impl FnOnce(&mut Node)) {
        if let Some(node) = self.nodes.lock_ignore_poison().get_mut(item) {
            f(node);
        }
    }

    pub fn add_folder(&self, item: &ItemIdList) {
        self.insert(item, FileAttributes::DIRECTORY, 0);
    }

    pub fn add_file(&self, item: &ItemIdList, size: u64) {
        self.insert(item, FileAttributes::ARCHIVE, size);
    }

    pub fn add_hidden_file(&self, item: &ItemIdList, size: u64) {
        self.insert(item, FileAttributes::ARCHIVE | FileAttributes::HIDDEN, size);
    }

    pub fn set_size(&self, item: &ItemIdList, size: u64) {
        self.update(item, |node| node.metadata.size = size);
    }

    pub fn set_modified(&self, item: &ItemIdList, modified: DateTime<Utc>) {
        self.update(item, |node| node.metadata.modified = Some(modified));
    }

    pub fn set_owner(&self, item: &ItemIdList, owner: u32) {
        self.update(item, |node| node.metadata.owner = Some(owner));
    }

    pub fn set_drive(&self, item: &ItemIdList, drive: DriveInfo) {
        self.update(item, |node| node.drive = Some(drive));
    }

    /// Controls whether enumeration reports metadata for this item directly.
    pub fn set_property_store_available(&self, item: &ItemIdList, available: bool) {
        self.update(item, |node| node.property_store = available);
    }

    /// Controls whether a direct metadata query for this item succeeds.
    pub fn set_metadata_available(&self, item: &ItemIdList, available: bool) {
        self.update(item, |node| node.metadata_available = available);
    }

    /// Removes an item and everything below it.
    pub fn remove(&self, item: &ItemIdList) {
        let prefix = item.segments().to_vec();
        self.nodes
            .lock_ignore_poison()
            .retain(|key, _| !key.segments().starts_with(&prefix));
    }

    /// Moves an item (and everything below it) to a new identity.
    pub fn rename(&self, from: &ItemIdList, to: &ItemIdList) {
        let prefix = from.segments().to_vec();
        let mut nodes = self.nodes.lock_ignore_poison();
        let moved: Vec<(ItemIdList, Node)> = nodes
            .iter()
            .filter(|(key, _)| key.segments().starts_with(&prefix))
            .map(|(key, node)| (key.clone(), node.clone()))
            .collect();
        for (key, mut node) in moved {
            nodes.remove(&key);
            let mut segments = to.segments().to_vec();
            segments.extend_from_slice(&key.segments()[prefix.len()..]);
            let new_key = ItemIdList::from_segments(segments);
            if &key == from {
                node.display_name = to.child_id().map(|c| c.as_str().to_string()).unwrap_or_default();
            }
            nodes.insert(new_key, node);
        }
    }

    pub fn mark_virtual(&self, folder: &ItemIdList) {
        self.virtual_folders.lock_ignore_poison().insert(folder.clone());
    }

    /// Makes enumeration of `folder` fail as if the device were disconnected.
    pub fn set_unreachable(&self, folder: &ItemIdList, unreachable: bool) {
        let mut set = self.unreachable.lock_ignore_poison();
        if unreachable {
            set.insert(folder.clone());
        } else {
            set.remove(folder);
        }
    }

    /// Holds the next enumeration open after it has taken its snapshot.
    pub fn hold_enumeration(&self) -> EnumerationGate {
        let (reached_tx, reached_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.held.lock_ignore_poison() = Some(HeldEnumeration {
            reached: reached_tx,
            release: release_rx,
        });
        EnumerationGate {
            reached: reached_rx,
            release: release_tx,
        }
    }

    fn raw_child(item: &ItemIdList, node: &Node) -> RawChild {
        RawChild {
            id: item.clone(),
            display_name: node.display_name.clone(),
            parsing_name: node.display_name.clone(),
            attributes: node.metadata.attributes,
            metadata: node.property_store.then(|| node.metadata.clone()),
            drive: node.drive.clone(),
        }
    }
}

impl ShellNamespace for InMemoryNamespace {
    fn enumerate_children(&self, folder: &ItemIdList, show_hidden: bool) -> Result<Vec<RawChild>, ShellError> {
        if self.unreachable.lock_ignore_poison().contains(folder) {
            return Err(ShellError::Io(format!("Folder unreachable: {}", folder)));
        }

        let children = {
            let nodes = self.nodes.lock_ignore_poison();
            if !folder.is_root() && !nodes.get(folder).is_some_and(|n| n.metadata.is_directory()) {
                return Err(ShellError::NotFound(folder.to_string()));
            }
            nodes
                .iter()
                .filter(|(key, _)| key.is_child_of(folder))
                .filter(|(_, node)| show_hidden || !node.metadata.attributes.contains(FileAttributes::HIDDEN))
                .map(|(key, node)| Self::raw_child(key, node))
                .collect::<Vec<_>>()
        };

        let held = self.held.lock_ignore_poison().take();
        if let Some(held) = held {
            let _ = held.reached.send(());
            // Returns on release or when the gate is dropped
            let _ = held.release.recv();
        }

        Ok(children)
    }

    fn get_metadata(&self, item: &ItemIdList) -> Result<FileMetadata, ShellError> {
        let nodes = self.nodes.lock_ignore_poison();
        let node = nodes.get(item).ok_or_else(|| ShellError::NotFound(item.to_string()))?;
        if !node.metadata_available {
            return Err(ShellError::NotAvailable(item.to_string()));
        }
        Ok(node.metadata.clone())
    }

    fn describe(&self, item: &ItemIdList) -> Result<RawChild, ShellError> {
        let nodes = self.nodes.lock_ignore_poison();
        let node = nodes.get(item).ok_or_else(|| ShellError::NotFound(item.to_string()))?;
        Ok(Self::raw_child(item, node))
    }

    fn is_virtual_folder(&self, folder: &ItemIdList) -> bool {
        self.virtual_folders.lock_ignore_poison().contains(folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(path: &str) -> ItemIdList {
        ItemIdList::parse(path)
    }

    fn sample() -> InMemoryNamespace {
        let ns = InMemoryNamespace::new();
        ns.add_folder(&id("/docs"));
        ns.add_file(&id("/docs/a.txt"), 5);
        ns.add_folder(&id("/docs/sub"));
        ns.add_file(&id("/docs/sub/deep.txt"), 1);
        ns.add_hidden_file(&id("/docs/.hidden"), 3);
        ns
    }

    #[test]
    fn lists_direct_children_only() {
        let ns = sample();
        let children = ns.enumerate_children(&id("/docs"), false).unwrap();
        let names: Vec<_> = children.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(names, ["a.txt", "sub"]);
    }

    #[test]
    fn hidden_children_need_show_hidden() {
        let ns = sample();
        let children = ns.enumerate_children(&id("/docs"), true).unwrap();
        assert_eq!(children.len(), 3);
    }

    #[test]
    fn rename_moves_descendants() {
        let ns = sample();
        ns.rename(&id("/docs/sub"), &id("/docs/renamed"));
        assert!(ns.describe(&id("/docs/sub/deep.txt")).is_err());
        let moved = ns.describe(&id("/docs/renamed/deep.txt")).unwrap();
        assert_eq!(moved.display_name, "deep.txt");
        assert_eq!(ns.describe(&id("/docs/renamed")).unwrap().display_name, "renamed");
    }

    #[test]
    fn metadata_paths_can_be_disabled() {
        let ns = sample();
        ns.set_property_store_available(&id("/docs/a.txt"), false);
        ns.set_metadata_available(&id("/docs/a.txt"), false);
        let child = ns.describe(&id("/docs/a.txt")).unwrap();
        assert!(child.metadata.is_none());
        assert!(matches!(ns.get_metadata(&id("/docs/a.txt")), Err(ShellError::NotAvailable(_))));
    }

    #[test]
    fn unreachable_and_missing_folders_fail() {
        let ns = sample();
        ns.set_unreachable(&id("/docs"), true);
        assert!(ns.enumerate_children(&id("/docs"), false).is_err());
        assert!(matches!(
            ns.enumerate_children(&id("/missing"), false),
            Err(ShellError::NotFound(_))
        ));
    }

    #[test]
    fn held_enumeration_waits_for_release() {
        let ns = std::sync::Arc::new(sample());
        let gate = ns.hold_enumeration();
        let worker_ns = std::sync::Arc::clone(&ns);
        let handle = std::thread::spawn(move || worker_ns.enumerate_children(&id("/docs"), false));

        assert!(gate.wait_until_reached(Duration::from_secs(5)));
        // Changes after the snapshot don't show up in it
        ns.add_file(&id("/docs/late.txt"), 1);
        gate.release();

        let children = handle.join().unwrap().unwrap();
        assert!(children.iter().all(|c| c.display_name != "late.txt"));
    }
}
