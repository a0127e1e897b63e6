//! Folder view settings.
//!
//! Plain records persisted as JSON by the host. Missing fields take their defaults, and a
//! file that can't be parsed at all falls back to defaults with a warning.

use crate::providers::columns::{ColumnFormat, FolderColumns, SizeDisplayFormat};
use crate::providers::icons::ICON_SIZE;
use crate::providers::info_tips::InfoTipKind;
use crate::providers::thumbnails::THUMBNAIL_SIZE;
use crate::sorting::{SortDirection, SortMode};
use crate::watcher::DEFAULT_DEBOUNCE_MS;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const LARGE_ICON_SIZE: u32 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    #[default]
    Details,
    List,
    SmallIcons,
    LargeIcons,
    Thumbnails,
}

impl ViewMode {
    /// Edge length of the images shown in this mode.
    pub fn icon_size(self) -> u32 {
        match self {
            ViewMode::Details | ViewMode::List | ViewMode::SmallIcons => ICON_SIZE,
            ViewMode::LargeIcons => LARGE_ICON_SIZE,
            ViewMode::Thumbnails => THUMBNAIL_SIZE,
        }
    }

    pub fn shows_thumbnails(self) -> bool {
        self == ViewMode::Thumbnails
    }
}

/// Per-folder view state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FolderSettings {
    pub sort_mode: SortMode,
    pub sort_direction: SortDirection,
    pub group_mode: SortMode,
    pub group_sort_direction: SortDirection,
    pub show_in_groups: bool,
    pub show_hidden: bool,
    pub view_mode: ViewMode,
    pub filter_text: String,
    pub filter_applied: bool,
    pub filter_case_sensitive: bool,
    pub folders_first: bool,
    pub auto_arrange: bool,
}

impl Default for FolderSettings {
    fn default() -> Self {
        Self {
            sort_mode: SortMode::Name,
            sort_direction: SortDirection::Ascending,
            group_mode: SortMode::Name,
            group_sort_direction: SortDirection::Ascending,
            show_in_groups: false,
            show_hidden: false,
            view_mode: ViewMode::Details,
            filter_text: String::new(),
            filter_applied: false,
            filter_case_sensitive: false,
            folders_first: true,
            auto_arrange: true,
        }
    }
}

impl FolderSettings {
    /// Parses settings JSON. Returns defaults if it can't be parsed.
    pub fn from_json(contents: &str) -> Self {
        match serde_json::from_str(contents) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Settings: couldn't parse folder settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Loads settings from `path`. Returns defaults if the file doesn't exist or can't be
    /// parsed.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents),
            Err(e) => {
                log::debug!("Settings: no folder settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Settings shared by every folder view in the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalFolderSettings {
    pub show_folder_sizes: bool,
    pub size_display_format: SizeDisplayFormat,
    pub friendly_dates: bool,
    pub info_tip_kind: InfoTipKind,
    pub watcher_debounce_ms: u64,
    pub columns: FolderColumns,
    pub column_threads: usize,
    pub icon_threads: usize,
    pub thumbnail_threads: usize,
    pub info_tip_threads: usize,
}

impl Default for GlobalFolderSettings {
    fn default() -> Self {
        Self {
            show_folder_sizes: false,
            size_display_format: SizeDisplayFormat::Auto,
            friendly_dates: true,
            info_tip_kind: InfoTipKind::Summary,
            watcher_debounce_ms: DEFAULT_DEBOUNCE_MS,
            columns: FolderColumns::default(),
            column_threads: 2,
            icon_threads: 1,
            thumbnail_threads: 2,
            info_tip_threads: 1,
        }
    }
}

impl GlobalFolderSettings {
    pub fn from_json(contents: &str) -> Self {
        serde_json::from_str(contents).unwrap_or_else(|e| {
            log::warn!("Settings: couldn't parse global folder settings, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn watcher_debounce(&self) -> Duration {
        Duration::from_millis(self.watcher_debounce_ms)
    }

    /// Column formatting options as of `now`.
    pub fn column_format(&self, now: DateTime<Local>) -> ColumnFormat {
        ColumnFormat {
            size_format: self.size_display_format,
            friendly_dates: self.friendly_dates,
            show_folder_sizes: self.show_folder_sizes,
            now,
        }
    }
}
