//! Item records held by the store.

use crate::grouping::GroupId;
use crate::providers::columns::ColumnType;
use crate::providers::icons::IconRef;
use crate::shell::{ChildId, DriveInfo, FileMetadata, ItemIdList, RawChild};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Internal id of an item, stable for as long as the item lives in the store.
///
/// Unrelated to the item's display position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) u32);

impl ItemId {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shell information for one item, as produced by the enumerator or resolved for a
/// change notification. This is what the store ingests.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellItem {
    pub absolute_id: ItemIdList,
    pub display_name: String,
    pub parsing_name: String,
    pub metadata: FileMetadata,
    /// False when neither metadata path worked and `metadata` holds defaults.
    pub metadata_valid: bool,
    pub drive: Option<DriveInfo>,
}

impl ShellItem {
    pub fn from_raw(raw: RawChild, metadata: FileMetadata, metadata_valid: bool) -> Self {
        Self {
            absolute_id: raw.id,
            display_name: raw.display_name,
            parsing_name: raw.parsing_name,
            metadata,
            metadata_valid,
            drive: raw.drive,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.metadata.is_directory()
    }
}

/// Derived per-item data filled in by the background providers.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    pub column_text: HashMap<ColumnType, String>,
    pub info_tip: Option<String>,
    pub thumbnail: Option<IconRef>,
    pub(crate) queued_columns: HashSet<ColumnType>,
    pub(crate) icon_queued: bool,
    pub(crate) thumbnail_queued: bool,
    pub(crate) info_tip_queued: bool,
}

/// One entry of the current folder.
#[derive(Debug, Clone)]
pub struct ItemInfo {
    pub id: ItemId,
    pub absolute_id: ItemIdList,
    pub child_id: ChildId,
    pub metadata: FileMetadata,
    pub metadata_valid: bool,
    pub display_name: String,
    pub parsing_name: String,
    /// Name being typed during an in-place rename.
    pub editing_name: Option<String>,
    pub icon: Option<IconRef>,
    pub drive: Option<DriveInfo>,
    /// Index the last full resort gave the item.
    pub relative_sort: i32,
    pub(crate) group: Option<GroupId>,
    pub(crate) selected: bool,
    pub(crate) enrichment: Enrichment,
}

impl ItemInfo {
    pub(crate) fn new(id: ItemId, shell: ShellItem) -> Self {
        let child_id = shell
            .absolute_id
            .child_id()
            .unwrap_or_else(|| ChildId::new(shell.parsing_name.clone()));
        Self {
            id,
            absolute_id: shell.absolute_id,
            child_id,
            metadata: shell.metadata,
            metadata_valid: shell.metadata_valid,
            display_name: shell.display_name,
            parsing_name: shell.parsing_name,
            editing_name: None,
            icon: None,
            drive: shell.drive,
            relative_sort: 0,
            group: None,
            selected: false,
            enrichment: Enrichment::default(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.metadata.is_directory()
    }

    /// File size in bytes; folders count as zero.
    pub fn size(&self) -> u64 {
        if self.is_folder() { 0 } else { self.metadata.size }
    }

    /// Lowercase extension without the dot, if the name has one. Folders have none.
    pub fn extension(&self) -> Option<String> {
        if self.is_folder() {
            return None;
        }
        let name = &self.display_name;
        match name.rfind('.') {
            Some(pos) if pos > 0 && pos < name.len() - 1 => Some(name[pos + 1..].to_lowercase()),
            _ => None,
        }
    }

    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn enrichment(&self) -> &Enrichment {
        &self.enrichment
    }

    /// Drops everything derived from the old metadata so it gets recomputed.
    pub(crate) fn invalidate_enrichment(&mut self) {
        self.enrichment = Enrichment::default();
        self.icon = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::FileAttributes;

    fn item(name: &str, folder: bool) -> ItemInfo {
        let metadata = FileMetadata {
            size: 10,
            attributes: if folder { FileAttributes::DIRECTORY } else { FileAttributes::empty() },
            ..FileMetadata::default()
        };
        ItemInfo::new(
            ItemId(1),
            ShellItem {
                absolute_id: ItemIdList::from_segments(["root", name]),
                display_name: name.to_string(),
                parsing_name: name.to_string(),
                metadata,
                metadata_valid: true,
                drive: None,
            },
        )
    }

    #[test]
    fn extension_rules() {
        assert_eq!(item("photo.JPG", false).extension().as_deref(), Some("jpg"));
        assert_eq!(item(".bashrc", false).extension(), None);
        assert_eq!(item("trailing.", false).extension(), None);
        assert_eq!(item("archive.tar.gz", false).extension().as_deref(), Some("gz"));
        assert_eq!(item("folder.d", true).extension(), None);
    }

    #[test]
    fn folders_have_zero_size() {
        assert_eq!(item("dir", true).size(), 0);
        assert_eq!(item("file", false).size(), 10);
    }

    #[test]
    fn child_id_comes_from_identity() {
        assert_eq!(item("notes.txt", false).child_id.as_str(), "notes.txt");
    }
}
