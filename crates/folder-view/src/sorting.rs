//! Sort modes and the item comparator.

use crate::model::{ItemId, ItemInfo};
use crate::owner::owner_label;
use crate::providers::columns::{attribute_string, type_name};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

// ============================================================================
// Sorting configuration
// ============================================================================

/// Primary key to sort items by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SortMode {
    #[default]
    Name,
    Type,
    Size,
    DateModified,
    DateCreated,
    DateAccessed,
    Extension,
    Attributes,
    Owner,
    /// Files by size, folders by their recursive size once it's known.
    TotalSize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

// ============================================================================
// Key helpers
// ============================================================================

/// Extracts file extension for sorting purposes.
/// Returns: (is_dotfile, has_extension, extension_lowercase)
/// Dotfiles sort first, then names without an extension, then by extension.
fn extract_extension_for_sort(name: &str) -> (bool, bool, String) {
    if name.starts_with('.') && !name[1..].contains('.') {
        return (true, false, String::new());
    }

    if let Some(dot_pos) = name.rfind('.')
        && dot_pos > 0
        && dot_pos < name.len() - 1
    {
        return (false, true, name[dot_pos + 1..].to_lowercase());
    }

    (false, false, String::new())
}

/// Natural (alphanumeric) comparison, case-insensitive: "img_2" before "img_10".
pub fn compare_names_natural(a: &str, b: &str) -> Ordering {
    alphanumeric_sort::compare_str(a.to_lowercase(), b.to_lowercase())
}

fn compare_extensions(a: &ItemInfo, b: &ItemInfo) -> Ordering {
    let (a_dotfile, a_has_ext, a_ext) = extract_extension_for_sort(&a.display_name);
    let (b_dotfile, b_has_ext, b_ext) = extract_extension_for_sort(&b.display_name);

    match (a_dotfile, b_dotfile) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => Ordering::Equal,
        (false, false) => match (a_has_ext, b_has_ext) {
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, false) => Ordering::Equal,
            (true, true) => alphanumeric_sort::compare_str(&a_ext, &b_ext),
        },
    }
}

/// Unknown values sort before known ones (ascending).
fn compare_optional<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(&b),
    }
}

// ============================================================================
// Comparator
// ============================================================================

/// Total order over the items of one folder.
///
/// Order of keys: folders first (if enabled, never reversed), the primary key for the sort
/// mode, natural case-insensitive name, exact name, then item id. Direction applies to
/// everything after folders-first, so two distinct items never compare equal.
#[derive(Debug, Clone, Copy)]
pub struct ItemComparator<'a> {
    pub mode: SortMode,
    pub direction: SortDirection,
    pub folders_first: bool,
    /// Recursive folder sizes computed so far, for `SortMode::TotalSize`.
    pub folder_sizes: &'a HashMap<ItemId, u64>,
}

impl<'a> ItemComparator<'a> {
    pub fn new(mode: SortMode, direction: SortDirection, folder_sizes: &'a HashMap<ItemId, u64>) -> Self {
        Self {
            mode,
            direction,
            folders_first: true,
            folder_sizes,
        }
    }

    pub fn with_folders_first(mut self, folders_first: bool) -> Self {
        self.folders_first = folders_first;
        self
    }

    pub fn compare(&self, a: &ItemInfo, b: &ItemInfo) -> Ordering {
        if self.folders_first {
            match (a.is_folder(), b.is_folder()) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
        }

        // Folders with an unknown total size go last in either direction
        if self.mode == SortMode::TotalSize && a.is_folder() && b.is_folder() {
            match (self.folder_sizes.get(&a.id), self.folder_sizes.get(&b.id)) {
                (None, Some(_)) => return Ordering::Greater,
                (Some(_), None) => return Ordering::Less,
                _ => {}
            }
        }

        let ordering = self
            .compare_primary(a, b)
            .then_with(|| compare_names_natural(&a.display_name, &b.display_name))
            .then_with(|| a.display_name.cmp(&b.display_name))
            .then_with(|| a.id.cmp(&b.id));
        self.direction.apply(ordering)
    }

    fn compare_primary(&self, a: &ItemInfo, b: &ItemInfo) -> Ordering {
        match self.mode {
            SortMode::Name => Ordering::Equal,
            SortMode::Type => {
                let a_type = type_name(a.is_folder(), a.extension().as_deref());
                let b_type = type_name(b.is_folder(), b.extension().as_deref());
                compare_names_natural(&a_type, &b_type)
            }
            SortMode::Size => {
                compare_optional(a.metadata_valid.then(|| a.size()), b.metadata_valid.then(|| b.size()))
            }
            SortMode::TotalSize => {
                let total = |item: &ItemInfo| {
                    if item.is_folder() {
                        self.folder_sizes.get(&item.id).copied()
                    } else {
                        item.metadata_valid.then(|| item.size())
                    }
                };
                compare_optional(total(a), total(b))
            }
            SortMode::DateModified => compare_optional(a.metadata.modified, b.metadata.modified),
            SortMode::DateCreated => compare_optional(a.metadata.created, b.metadata.created),
            SortMode::DateAccessed => compare_optional(a.metadata.accessed, b.metadata.accessed),
            SortMode::Extension => compare_extensions(a, b),
            SortMode::Attributes => {
                attribute_string(a.metadata.attributes).cmp(&attribute_string(b.metadata.attributes))
            }
            SortMode::Owner => compare_optional(owner_label(a.metadata.owner), owner_label(b.metadata.owner)),
        }
    }
}

/// Sorts items in place with the given comparator.
pub fn sort_items(items: &mut [&ItemInfo], comparator: &ItemComparator<'_>) {
    items.sort_by(|a, b| comparator.compare(a, b));
}
