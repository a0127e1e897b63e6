//! Enrichment providers: per-item values computed on worker pools.
//!
//! Workers only ever see a `BasicItemInfo`, an owned snapshot taken on the synchronizing
//! thread when the task is queued.

pub mod columns;
pub mod icons;
pub mod info_tips;
pub mod thumbnails;

use crate::model::{ItemId, ItemInfo};
use crate::shell::{FileMetadata, ItemIdList, ShellNamespace};
use std::path::PathBuf;

/// Immutable copy of the item fields a provider needs.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicItemInfo {
    pub item_id: ItemId,
    pub absolute_id: ItemIdList,
    pub display_name: String,
    pub is_folder: bool,
    pub extension: Option<String>,
    pub metadata: FileMetadata,
    pub metadata_valid: bool,
    pub filesystem_path: Option<PathBuf>,
}

impl BasicItemInfo {
    pub fn capture(item: &ItemInfo, namespace: &dyn ShellNamespace) -> Self {
        Self {
            item_id: item.id,
            absolute_id: item.absolute_id.clone(),
            display_name: item.display_name.clone(),
            is_folder: item.is_folder(),
            extension: item.extension(),
            metadata: item.metadata.clone(),
            metadata_valid: item.metadata_valid,
            filesystem_path: namespace.filesystem_path(&item.absolute_id),
        }
    }
}
