//! The item store: an arena of item records for one folder epoch, plus the epoch's
//! directory state (id counter, filter bookkeeping, aggregates).
//!
//! Display order lives elsewhere. Everything here is addressed by `ItemId`.

use super::item::{ItemId, ItemInfo, ShellItem};
use crate::filter::ItemFilter;
use crate::shell::ItemIdList;
use std::collections::{HashMap, HashSet};

/// Bookkeeping for one navigation epoch. Reset wholesale on navigation.
#[derive(Debug, Default)]
pub struct DirectoryState {
    folder: ItemIdList,
    virtual_folder: bool,
    next_id: u32,
    /// Items added but not yet placed in the display.
    awaiting: Vec<ItemId>,
    /// Items hidden by the filter.
    filtered: HashSet<ItemId>,
    num_items: usize,
    num_files_selected: usize,
    num_folders_selected: usize,
    total_size: u64,
    selection_size: u64,
    visible_size: u64,
    folder_sizes: HashMap<ItemId, u64>,
}

/// What changed when an item was updated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
    pub old_identity: ItemIdList,
    pub name_changed: bool,
    pub metadata_changed: bool,
    pub visibility: VisibilityChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityChange {
    Unchanged,
    /// The item no longer passes the filter.
    Hidden,
    /// The item passes the filter again.
    Shown,
}

/// Result of re-evaluating the filter over every item.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterChange {
    pub hidden: Vec<ItemId>,
    pub shown: Vec<ItemId>,
}

#[derive(Debug, Default)]
pub struct ItemStore {
    items: HashMap<ItemId, ItemInfo>,
    by_identity: HashMap<ItemIdList, ItemId>,
    state: DirectoryState,
    filter: ItemFilter,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Epoch
    // ========================================================================

    /// Starts a new epoch for `folder`. The active filter carries over.
    pub fn reset(&mut self, folder: ItemIdList, virtual_folder: bool) {
        self.items.clear();
        self.by_identity.clear();
        self.state = DirectoryState {
            folder,
            virtual_folder,
            ..DirectoryState::default()
        };
    }

    pub fn folder(&self) -> &ItemIdList {
        &self.state.folder
    }

    pub fn is_virtual_folder(&self) -> bool {
        self.state.virtual_folder
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Mints an id for `shell` and inserts it.
    ///
    /// Items passing the filter are queued for display; the rest are marked hidden and kept
    /// out of the visible aggregates.
    pub fn add_item(&mut self, shell: ShellItem) -> ItemId {
        let id = ItemId(self.state.next_id);
        self.state.next_id += 1;

        let info = ItemInfo::new(id, shell);
        if let Some(previous) = self.by_identity.insert(info.absolute_id.clone(), id) {
            log::warn!("ItemStore: identity {} was still mapped to {}", info.absolute_id, previous);
        }

        self.state.num_items += 1;
        self.state.total_size += info.size();
        if self.filter.matches(&info.display_name) {
            self.state.visible_size += info.size();
            self.state.awaiting.push(id);
        } else {
            self.state.filtered.insert(id);
        }

        self.items.insert(id, info);
        id
    }

    /// Removes an item, retiring its id. Returns the record so the caller can clean up its
    /// display row and group membership.
    pub fn remove_item(&mut self, id: ItemId) -> Option<ItemInfo> {
        let info = self.items.remove(&id)?;

        if self.by_identity.get(&info.absolute_id) == Some(&id) {
            self.by_identity.remove(&info.absolute_id);
        }

        self.state.num_items -= 1;
        self.state.total_size -= info.size();
        let was_hidden = self.state.filtered.remove(&id);
        if !was_hidden {
            self.state.visible_size -= info.size();
            if info.selected {
                self.uncount_selection(&info);
            }
        }
        self.state.awaiting.retain(|awaiting| *awaiting != id);
        self.state.folder_sizes.remove(&id);

        Some(info)
    }

    /// Replaces an item's shell information, keeping its id.
    pub fn update_item(&mut self, id: ItemId, shell: ShellItem) -> Option<ItemUpdate> {
        let was_hidden = self.state.filtered.contains(&id);
        let now_visible = self.filter.matches(&shell.display_name);

        let info = self.items.get_mut(&id)?;
        let old_size = info.size();
        let was_folder = info.is_folder();
        let was_selected = info.selected;
        let old_identity = info.absolute_id.clone();
        let name_changed = info.display_name != shell.display_name;
        let metadata_changed = info.metadata != shell.metadata;

        info.absolute_id = shell.absolute_id;
        if let Some(child_id) = info.absolute_id.child_id() {
            info.child_id = child_id;
        }
        info.display_name = shell.display_name;
        info.parsing_name = shell.parsing_name;
        info.metadata = shell.metadata;
        info.metadata_valid = shell.metadata_valid;
        info.drive = shell.drive;
        let new_size = info.size();
        let new_identity = info.absolute_id.clone();

        if old_identity != new_identity {
            if self.by_identity.get(&old_identity) == Some(&id) {
                self.by_identity.remove(&old_identity);
            }
            self.by_identity.insert(new_identity, id);
        }

        self.state.total_size = self.state.total_size - old_size + new_size;

        // A file replaced by a folder (or back) moves its selection to the other counter
        let is_folder = info.is_folder();
        if was_selected && !was_hidden && was_folder != is_folder {
            self.adjust_selected_count_for_kind(was_folder, false);
            self.adjust_selected_count_for_kind(is_folder, true);
        }

        let visibility = match (was_hidden, now_visible) {
            (false, true) => {
                self.state.visible_size = self.state.visible_size - old_size + new_size;
                if was_selected {
                    self.state.selection_size = self.state.selection_size - old_size + new_size;
                }
                VisibilityChange::Unchanged
            }
            (true, false) => VisibilityChange::Unchanged,
            (false, false) => {
                self.state.visible_size -= old_size;
                self.state.filtered.insert(id);
                if was_selected {
                    self.state.selection_size -= old_size;
                    self.adjust_selected_count(id, false);
                }
                VisibilityChange::Hidden
            }
            (true, true) => {
                self.state.visible_size += new_size;
                self.state.filtered.remove(&id);
                if was_selected {
                    self.state.selection_size += new_size;
                    self.adjust_selected_count(id, true);
                }
                VisibilityChange::Shown
            }
        };

        Some(ItemUpdate {
            old_identity,
            name_changed,
            metadata_changed,
            visibility,
        })
    }

    /// Marks an item (de)selected. Returns true if the flag changed.
    ///
    /// The flag survives the item being hidden by the filter, but only visible items count
    /// toward selection aggregates.
    pub fn set_selected(&mut self, id: ItemId, selected: bool) -> bool {
        let hidden = self.state.filtered.contains(&id);
        let Some(info) = self.items.get_mut(&id) else {
            return false;
        };
        if info.selected == selected {
            return false;
        }
        info.selected = selected;
        let size = info.size();

        if !hidden {
            if selected {
                self.state.selection_size += size;
            } else {
                self.state.selection_size -= size;
            }
            self.adjust_selected_count(id, selected);
        }
        true
    }

    /// Installs a new filter and reports which items changed visibility.
    pub fn set_filter(&mut self, filter: ItemFilter) -> FilterChange {
        self.filter = filter;
        let mut change = FilterChange::default();

        let mut ids: Vec<ItemId> = self.items.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let Some(info) = self.items.get(&id) else { continue };
            let visible = self.filter.matches(&info.display_name);
            let hidden = self.state.filtered.contains(&id);
            let (size, selected) = (info.size(), info.selected);

            if hidden && visible {
                self.state.filtered.remove(&id);
                self.state.visible_size += size;
                if selected {
                    self.state.selection_size += size;
                    self.adjust_selected_count(id, true);
                }
                change.shown.push(id);
            } else if !hidden && !visible {
                self.state.filtered.insert(id);
                self.state.visible_size -= size;
                if selected {
                    self.state.selection_size -= size;
                    self.adjust_selected_count(id, false);
                }
                self.state.awaiting.retain(|awaiting| *awaiting != id);
                change.hidden.push(id);
            }
        }

        change
    }

    pub fn filter(&self) -> &ItemFilter {
        &self.filter
    }

    fn uncount_selection(&mut self, info: &ItemInfo) {
        self.state.selection_size -= info.size();
        if info.is_folder() {
            self.state.num_folders_selected -= 1;
        } else {
            self.state.num_files_selected -= 1;
        }
    }

    fn adjust_selected_count(&mut self, id: ItemId, selected: bool) {
        if let Some(is_folder) = self.items.get(&id).map(ItemInfo::is_folder) {
            self.adjust_selected_count_for_kind(is_folder, selected);
        }
    }

    fn adjust_selected_count_for_kind(&mut self, is_folder: bool, selected: bool) {
        let counter = if is_folder {
            &mut self.state.num_folders_selected
        } else {
            &mut self.state.num_files_selected
        };
        if selected {
            *counter += 1;
        } else {
            *counter -= 1;
        }
    }

    // ========================================================================
    // Awaiting insertion
    // ========================================================================

    /// Takes the items queued for display insertion, in the order they were added.
    pub fn take_awaiting(&mut self) -> Vec<ItemId> {
        std::mem::take(&mut self.state.awaiting)
    }

    /// Queues a visible item for display insertion (used when the filter lets it back in).
    pub(crate) fn queue_awaiting(&mut self, id: ItemId) {
        if self.items.contains_key(&id) && !self.state.filtered.contains(&id) {
            self.state.awaiting.push(id);
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn get(&self, id: ItemId) -> Option<&ItemInfo> {
        self.items.get(&id)
    }

    /// Mutable access for enrichment and scratch fields. Shell information goes through
    /// `update_item` so the aggregates stay right.
    pub(crate) fn get_mut(&mut self, id: ItemId) -> Option<&mut ItemInfo> {
        self.items.get_mut(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn is_hidden(&self, id: ItemId) -> bool {
        self.state.filtered.contains(&id)
    }

    pub fn find_by_identity(&self, identity: &ItemIdList) -> Option<ItemId> {
        self.by_identity.get(identity).copied()
    }

    /// Finds an item by display name, preferring an exact match over a case-insensitive one.
    pub fn find_by_name(&self, name: &str) -> Option<ItemId> {
        let mut fallback = None;
        for info in self.items.values() {
            if info.display_name == name {
                return Some(info.id);
            }
            if fallback.is_none() && info.display_name.eq_ignore_ascii_case(name) {
                fallback = Some(info.id);
            }
        }
        fallback
    }

    /// Calls `f` for every item not hidden by the filter, in id order.
    pub fn for_each_visible(&self, mut f: impl FnMut(&ItemInfo)) {
        let mut visible: Vec<&ItemInfo> = self
            .items
            .values()
            .filter(|info| !self.state.filtered.contains(&info.id))
            .collect();
        visible.sort_unstable_by_key(|info| info.id);
        for info in visible {
            f(info);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemInfo> {
        self.items.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ItemInfo> {
        self.items.values_mut()
    }

    // ========================================================================
    // Folder sizes
    // ========================================================================

    pub fn set_folder_size(&mut self, id: ItemId, size: u64) {
        if self.items.contains_key(&id) {
            self.state.folder_sizes.insert(id, size);
        }
    }

    pub fn folder_size(&self, id: ItemId) -> Option<u64> {
        self.state.folder_sizes.get(&id).copied()
    }

    pub fn folder_sizes(&self) -> &HashMap<ItemId, u64> {
        &self.state.folder_sizes
    }

    // ========================================================================
    // Aggregates
    // ========================================================================

    pub fn num_items(&self) -> usize {
        self.state.num_items
    }

    pub fn num_visible(&self) -> usize {
        self.state.num_items - self.state.filtered.len()
    }

    pub fn num_hidden(&self) -> usize {
        self.state.filtered.len()
    }

    pub fn num_selected_files(&self) -> usize {
        self.state.num_files_selected
    }

    pub fn num_selected_folders(&self) -> usize {
        self.state.num_folders_selected
    }

    /// Size of every file in the folder, filtered-out ones included.
    pub fn total_size(&self) -> u64 {
        self.state.total_size
    }

    pub fn selection_size(&self) -> u64 {
        self.state.selection_size
    }

    pub fn visible_size(&self) -> u64 {
        self.state.visible_size
    }
}
