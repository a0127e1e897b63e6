//! Column definitions and column text computation.
//!
//! Text is computed on the column pool from a `BasicItemInfo` snapshot, so nothing in here
//! touches the store.

use super::BasicItemInfo;
use crate::owner::owner_label;
use crate::shell::FileAttributes;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use walkdir::WalkDir;

// ============================================================================
// Column configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    Name,
    Type,
    Size,
    DateModified,
    DateCreated,
    DateAccessed,
    Attributes,
    Owner,
    Extension,
    TotalSize,
}

/// One column of the details view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub column_type: ColumnType,
    /// Whether the column is shown.
    pub checked: bool,
    pub width: u32,
}

impl Column {
    pub const fn new(column_type: ColumnType, checked: bool, width: u32) -> Self {
        Self {
            column_type,
            checked,
            width,
        }
    }
}

/// Column sets, one for file system folders and one for virtual folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FolderColumns {
    pub real_folder: Vec<Column>,
    pub virtual_folder: Vec<Column>,
}

impl Default for FolderColumns {
    fn default() -> Self {
        Self {
            real_folder: vec![
                Column::new(ColumnType::Name, true, 250),
                Column::new(ColumnType::Type, true, 150),
                Column::new(ColumnType::Size, true, 100),
                Column::new(ColumnType::DateModified, true, 150),
                Column::new(ColumnType::Attributes, false, 80),
                Column::new(ColumnType::DateCreated, false, 150),
                Column::new(ColumnType::DateAccessed, false, 150),
                Column::new(ColumnType::Owner, false, 120),
                Column::new(ColumnType::Extension, false, 80),
                Column::new(ColumnType::TotalSize, false, 100),
            ],
            virtual_folder: vec![
                Column::new(ColumnType::Name, true, 250),
                Column::new(ColumnType::Type, true, 150),
            ],
        }
    }
}

impl FolderColumns {
    pub fn for_folder(&self, virtual_folder: bool) -> &[Column] {
        if virtual_folder { &self.virtual_folder } else { &self.real_folder }
    }

    pub fn set_for_folder(&mut self, virtual_folder: bool, columns: Vec<Column>) {
        if virtual_folder {
            self.virtual_folder = columns;
        } else {
            self.real_folder = columns;
        }
    }
}

/// Unit used for size columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SizeDisplayFormat {
    /// Picks the largest unit that keeps the value at or above one.
    #[default]
    Auto,
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
}

/// Formatting options captured when a column task is queued.
#[derive(Debug, Clone, Copy)]
pub struct ColumnFormat {
    pub size_format: SizeDisplayFormat,
    pub friendly_dates: bool,
    /// Compute recursive sizes for folders in the size column.
    pub show_folder_sizes: bool,
    pub now: DateTime<Local>,
}

/// Output of one column task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnResult {
    pub column_type: ColumnType,
    pub text: String,
    /// Recursive size, when one was computed along the way.
    pub folder_size: Option<u64>,
}

// ============================================================================
// Formatting helpers
// ============================================================================

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

pub fn format_size(bytes: u64, format: SizeDisplayFormat) -> String {
    match format {
        SizeDisplayFormat::Bytes => format!("{} bytes", bytes),
        SizeDisplayFormat::Kilobytes => format!("{:.1} KB", bytes as f64 / KB as f64),
        SizeDisplayFormat::Megabytes => format!("{:.1} MB", bytes as f64 / MB as f64),
        SizeDisplayFormat::Gigabytes => format!("{:.1} GB", bytes as f64 / GB as f64),
        SizeDisplayFormat::Auto => {
            if bytes >= GB {
                format!("{:.1} GB", bytes as f64 / GB as f64)
            } else if bytes >= MB {
                format!("{:.1} MB", bytes as f64 / MB as f64)
            } else if bytes >= KB {
                format!("{:.1} KB", bytes as f64 / KB as f64)
            } else {
                format!("{} bytes", bytes)
            }
        }
    }
}

pub fn format_date(date: Option<DateTime<Utc>>, friendly: bool, now: DateTime<Local>) -> String {
    let Some(date) = date else {
        return String::new();
    };
    let local = date.with_timezone(&Local);
    if friendly {
        let days = now.date_naive().signed_duration_since(local.date_naive()).num_days();
        match days {
            0 => return format!("Today, {}", local.format("%H:%M")),
            1 => return format!("Yesterday, {}", local.format("%H:%M")),
            _ => {}
        }
    }
    local.format("%Y-%m-%d %H:%M").to_string()
}

/// Letters for the set attribute flags, in a fixed order.
pub fn attribute_string(attributes: FileAttributes) -> String {
    const LETTERS: [(FileAttributes, char); 8] = [
        (FileAttributes::READ_ONLY, 'R'),
        (FileAttributes::HIDDEN, 'H'),
        (FileAttributes::SYSTEM, 'S'),
        (FileAttributes::DIRECTORY, 'D'),
        (FileAttributes::ARCHIVE, 'A'),
        (FileAttributes::COMPRESSED, 'C'),
        (FileAttributes::ENCRYPTED, 'E'),
        (FileAttributes::SYMLINK, 'L'),
    ];
    LETTERS
        .iter()
        .filter(|(flag, _)| attributes.contains(*flag))
        .map(|(_, letter)| *letter)
        .collect()
}

/// Human-readable type, as shown in the type column and used by type sort and grouping.
pub fn type_name(is_folder: bool, extension: Option<&str>) -> String {
    if is_folder {
        return "File folder".to_string();
    }
    match extension {
        Some(ext) => format!("{} File", ext.to_uppercase()),
        None => "File".to_string(),
    }
}

/// Sum of file sizes below `path`. Unreadable entries are skipped.
pub fn folder_total_size(path: &Path) -> u64 {
    let mut total = 0;
    for entry in WalkDir::new(path).min_depth(1).into_iter().filter_map(Result::ok) {
        if entry.file_type().is_file()
            && let Ok(meta) = entry.metadata()
        {
            total += meta.len();
        }
    }
    total
}

// ============================================================================
// Column text
// ============================================================================

/// Computes the text of one column for one item. May walk a folder tree, so only call it
/// off the synchronizing thread.
pub fn compute_column(item: &BasicItemInfo, column_type: ColumnType, format: &ColumnFormat) -> ColumnResult {
    let mut folder_size = None;
    let text = match column_type {
        ColumnType::Name => item.display_name.clone(),
        ColumnType::Type => type_name(item.is_folder, item.extension.as_deref()),
        ColumnType::Extension => item.extension.clone().unwrap_or_default(),
        ColumnType::Size | ColumnType::TotalSize => {
            if item.is_folder {
                let wants_total = column_type == ColumnType::TotalSize || format.show_folder_sizes;
                match (&item.filesystem_path, wants_total) {
                    (Some(path), true) => {
                        let size = folder_total_size(path);
                        folder_size = Some(size);
                        format_size(size, format.size_format)
                    }
                    _ => String::new(),
                }
            } else if item.metadata_valid {
                format_size(item.metadata.size, format.size_format)
            } else {
                String::new()
            }
        }
        ColumnType::DateModified => format_date(item.metadata.modified, format.friendly_dates, format.now),
        ColumnType::DateCreated => format_date(item.metadata.created, format.friendly_dates, format.now),
        ColumnType::DateAccessed => format_date(item.metadata.accessed, format.friendly_dates, format.now),
        ColumnType::Attributes => attribute_string(item.metadata.attributes),
        ColumnType::Owner => owner_label(item.metadata.owner).unwrap_or_default(),
    };

    ColumnResult {
        column_type,
        text,
        folder_size,
    }
}
