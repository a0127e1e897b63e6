//! Display order: where rows go, which group they're in, and which items are shown at all.
//!
//! Display positions are always sorted by group (when grouping) and then by the item
//! comparator, so new rows can go in at a binary-searched position.

use super::FolderView;
use crate::config::ViewMode;
use crate::display::ListDisplay;
use crate::events::ViewEvent;
use crate::filter::ItemFilter;
use crate::grouping::{GroupContext, GroupId, determine_group};
use crate::model::{ItemId, ItemInfo};
use crate::providers::icons::IconRef;
use crate::sorting::{ItemComparator, SortDirection};
use chrono::{DateTime, Local};
use std::cmp::Ordering;

/// Image a row shows in `mode`: the thumbnail when there is one, else the icon.
pub(super) fn row_image(item: &ItemInfo, mode: ViewMode) -> Option<&IconRef> {
    if mode.shows_thumbnails() {
        item.enrichment.thumbnail.as_ref().or(item.icon.as_ref())
    } else {
        item.icon.as_ref()
    }
}

impl<D: ListDisplay> FolderView<D> {
    fn comparator(&self) -> ItemComparator<'_> {
        ItemComparator::new(
            self.settings.sort_mode,
            self.settings.sort_direction,
            self.store.folder_sizes(),
        )
        .with_folders_first(self.settings.folders_first)
    }

    /// Display order of two items: group first, then the item comparator.
    pub(super) fn compare_for_display(&self, a: ItemId, b: ItemId) -> Ordering {
        let (Some(item_a), Some(item_b)) = (self.store.get(a), self.store.get(b)) else {
            return a.cmp(&b);
        };
        if self.settings.show_in_groups
            && let (Some(group_a), Some(group_b)) = (item_a.group(), item_b.group())
            && group_a != group_b
        {
            return self.groups.compare(group_a, group_b, self.settings.group_sort_direction);
        }
        self.comparator().compare(item_a, item_b)
    }

    /// Binary-searched position for `id`. With `skip`, the row at that position (the item
    /// itself) is left out and the result is a position for `move_to`.
    fn insertion_point(&self, id: ItemId, skip: Option<usize>) -> usize {
        let len = self.display.len() - usize::from(skip.is_some());
        let actual = |index: usize| match skip {
            Some(skipped) if index >= skipped => index + 1,
            _ => index,
        };

        let (mut low, mut high) = (0, len);
        while low < high {
            let mid = low + (high - low) / 2;
            match self.display.item_id_at(actual(mid)) {
                Some(other) if self.compare_for_display(other, id) == Ordering::Less => low = mid + 1,
                _ => high = mid,
            }
        }
        low
    }

    // ========================================================================
    // Rows
    // ========================================================================

    /// Puts every item the store has queued for display into its sorted position.
    pub(super) fn insert_awaiting(&mut self) {
        let mut ids = self.store.take_awaiting();
        if ids.is_empty() {
            return;
        }

        // Groups first, the comparator needs them
        let now = Local::now();
        for id in &ids {
            self.assign_group(*id, now);
        }
        // Sorted batches mostly append, which keeps large enumerations cheap
        ids.sort_by(|a, b| self.compare_for_display(*a, *b));
        for id in ids {
            self.insert_row(id);
        }
    }

    fn insert_row(&mut self, id: ItemId) {
        let position = self.insertion_point(id, None);
        self.display.insert_at(position, id);

        let Some(item) = self.store.get(id) else {
            return;
        };
        if let Some(group) = item.group() {
            self.display.set_item_group(position, group);
        }
        if item.is_selected() {
            self.display.set_selected(position, true);
        }
        for (column, text) in &item.enrichment.column_text {
            self.display.set_text(position, *column, text);
        }
        if let Some(image) = row_image(item, self.settings.view_mode) {
            self.display.set_icon(position, image);
        }

        if self.pending_rename.as_ref() == Some(&item.absolute_id) {
            self.pending_rename = None;
            self.start_rename(position);
        }
    }

    /// Takes an item's row out of the display, along with its group membership.
    pub(super) fn remove_row(&mut self, id: ItemId) {
        if let Some(position) = self.display.position_of(id) {
            self.display.remove_at(position);
        }
        self.detach_group(id);
    }

    pub(super) fn refresh_row_image(&mut self, id: ItemId) {
        let (Some(position), Some(item)) = (self.display.position_of(id), self.store.get(id)) else {
            return;
        };
        if let Some(image) = row_image(item, self.settings.view_mode) {
            self.display.set_icon(position, image);
        }
    }

    /// Moves one item to where it belongs now, regrouping it if its group key changed.
    pub(super) fn reposition(&mut self, id: ItemId) {
        if self.display.position_of(id).is_none() {
            return;
        }

        if self.settings.show_in_groups {
            let now = Local::now();
            let changed = self.store.get(id).is_some_and(|item| {
                let ctx = GroupContext {
                    folder_sizes: self.store.folder_sizes(),
                    now,
                };
                let key = determine_group(item, self.settings.group_mode, &ctx);
                let current = item.group().and_then(|group| self.groups.get(group));
                current.is_none_or(|group| group.name != key.name)
            });
            if changed {
                self.detach_group(id);
                self.assign_group(id, now);
            }
        }

        let Some(from) = self.display.position_of(id) else {
            return;
        };
        let to = self.insertion_point(id, Some(from));
        if to != from {
            self.display.move_to(from, to);
        }
        if let Some(group) = self.store.get(id).and_then(ItemInfo::group) {
            self.display.set_item_group(to, group);
        }
    }

    /// Reorders every row after a sort setting changed.
    pub(super) fn resort(&mut self) {
        let mut ids: Vec<ItemId> = (0..self.display.len())
            .filter_map(|position| self.display.item_id_at(position))
            .collect();
        ids.sort_by(|a, b| self.compare_for_display(*a, *b));

        for (index, id) in ids.iter().enumerate() {
            if let Some(item) = self.store.get_mut(*id) {
                item.relative_sort = index as i32;
            }
        }

        self.display.reorder(&ids);

        if self.settings.show_in_groups {
            self.display
                .set_group_order(&self.groups.sorted_ids(self.settings.group_sort_direction));
        }
    }

    // ========================================================================
    // Groups
    // ========================================================================

    fn assign_group(&mut self, id: ItemId, now: DateTime<Local>) {
        if !self.settings.show_in_groups {
            return;
        }
        let Some(item) = self.store.get(id) else {
            return;
        };
        if item.group().is_some() {
            return;
        }

        let ctx = GroupContext {
            folder_sizes: self.store.folder_sizes(),
            now,
        };
        let key = determine_group(item, self.settings.group_mode, &ctx);
        let (group, created) = self.groups.get_or_create(&key);
        self.groups.add_item(group);
        if let Some(item) = self.store.get_mut(id) {
            item.group = Some(group);
        }

        if created {
            log::trace!("FolderView: new group {:?}", key.name);
            self.display.insert_group(group, &key.name);
            self.display
                .set_group_order(&self.groups.sorted_ids(self.settings.group_sort_direction));
        }
        self.refresh_group_header(group);
    }

    fn detach_group(&mut self, id: ItemId) {
        let group = self.store.get_mut(id).and_then(|item| item.group.take());
        let Some(group) = group else {
            return;
        };
        match self.groups.remove_item(group) {
            Some(emptied) => {
                log::trace!("FolderView: group {:?} is empty", emptied.name);
                self.display.remove_group(group);
            }
            None => self.refresh_group_header(group),
        }
    }

    fn refresh_group_header(&mut self, group: GroupId) {
        if let Some(info) = self.groups.get(group) {
            self.display.set_group_header(group, &info.header());
        }
    }

    pub(super) fn clear_groups(&mut self) {
        for group in self.groups.sorted_ids(SortDirection::Ascending) {
            self.display.remove_group(group);
        }
        self.groups.clear();
        for item in self.store.iter_mut() {
            item.group = None;
        }
    }

    /// Rebuilds every group after a grouping setting changed.
    pub(super) fn regroup(&mut self) {
        self.clear_groups();
        self.display.set_groups_enabled(self.settings.show_in_groups);

        if self.settings.show_in_groups {
            let now = Local::now();
            let ids: Vec<ItemId> = (0..self.display.len())
                .filter_map(|position| self.display.item_id_at(position))
                .collect();
            for id in &ids {
                self.assign_group(*id, now);
            }
            for (position, id) in ids.iter().enumerate() {
                if let Some(group) = self.store.get(*id).and_then(ItemInfo::group) {
                    self.display.set_item_group(position, group);
                }
            }
        }

        self.resort();
    }

    // ========================================================================
    // Filter
    // ========================================================================

    /// Installs the filter from the current settings and shows or hides rows to match.
    pub(super) fn apply_filter(&mut self) {
        let filter = ItemFilter::new(
            self.settings.filter_text.clone(),
            self.settings.filter_case_sensitive,
            self.settings.filter_applied,
        );
        let change = self.store.set_filter(filter);
        if change.hidden.is_empty() && change.shown.is_empty() {
            return;
        }

        let selection_touched = change
            .hidden
            .iter()
            .chain(&change.shown)
            .any(|id| self.store.get(*id).is_some_and(ItemInfo::is_selected));

        for id in &change.hidden {
            self.remove_row(*id);
        }
        for id in &change.shown {
            self.store.queue_awaiting(*id);
        }
        self.insert_awaiting();
        self.queue_visible_enrichment();

        log::debug!(
            "FolderView: filter hid {}, showed {}",
            change.hidden.len(),
            change.shown.len()
        );
        self.events.emit(ViewEvent::DirectoryModified);
        if selection_touched {
            self.events.emit(ViewEvent::SelectionChanged);
        }
    }
}
