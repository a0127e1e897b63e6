//! Info tip text shown when hovering an item.

use super::BasicItemInfo;
use super::columns::{SizeDisplayFormat, format_date, format_size, type_name};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;

/// What the info tip shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InfoTipKind {
    /// Type, size and modification date.
    #[default]
    Summary,
    /// Just the display name.
    NameOnly,
}

/// Builds the tip text. For folders on disk this counts the direct children, so it runs on
/// the info tip pool.
pub fn compute_info_tip(item: &BasicItemInfo, kind: InfoTipKind, now: DateTime<Local>) -> String {
    if kind == InfoTipKind::NameOnly {
        return item.display_name.clone();
    }

    let mut lines = vec![format!("Type: {}", type_name(item.is_folder, item.extension.as_deref()))];

    if item.is_folder {
        if let Some(path) = &item.filesystem_path
            && let Ok(entries) = fs::read_dir(path)
        {
            let count = entries.filter_map(Result::ok).count();
            lines.push(format!("Contains: {} {}", count, if count == 1 { "item" } else { "items" }));
        }
    } else if item.metadata_valid {
        lines.push(format!("Size: {}", format_size(item.metadata.size, SizeDisplayFormat::Auto)));
    }

    if item.metadata.modified.is_some() {
        lines.push(format!("Date modified: {}", format_date(item.metadata.modified, false, now)));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemId;
    use crate::shell::{FileAttributes, FileMetadata, ItemIdList};

    fn snapshot(name: &str, folder: bool) -> BasicItemInfo {
        BasicItemInfo {
            item_id: ItemId(3),
            absolute_id: ItemIdList::from_segments([name]),
            display_name: name.to_string(),
            is_folder: folder,
            extension: if folder { None } else { Some("txt".to_string()) },
            metadata: FileMetadata {
                size: 2048,
                attributes: if folder { FileAttributes::DIRECTORY } else { FileAttributes::empty() },
                ..FileMetadata::default()
            },
            metadata_valid: true,
            filesystem_path: None,
        }
    }

    #[test]
    fn file_summary() {
        let tip = compute_info_tip(&snapshot("a.txt", false), InfoTipKind::Summary, Local::now());
        assert_eq!(tip, "Type: TXT File\nSize: 2.0 KB");
    }

    #[test]
    fn folder_counts_children() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one"), "").unwrap();
        let mut folder = snapshot("docs", true);
        folder.filesystem_path = Some(dir.path().to_path_buf());

        let tip = compute_info_tip(&folder, InfoTipKind::Summary, Local::now());
        assert_eq!(tip, "Type: File folder\nContains: 1 item");
    }

    #[test]
    fn name_only() {
        let tip = compute_info_tip(&snapshot("a.txt", false), InfoTipKind::NameOnly, Local::now());
        assert_eq!(tip, "a.txt");
    }
}
