//! Queueing enrichment for rows on screen, and applying the results as they come back.

use super::FolderView;
use crate::display::ListDisplay;
use crate::model::ItemId;
use crate::providers::BasicItemInfo;
use crate::providers::columns::{ColumnResult, ColumnType, compute_column};
use crate::providers::icons::{ICON_SIZE, IconRef, icon_key};
use crate::providers::info_tips::compute_info_tip;
use crate::providers::thumbnails::THUMBNAIL_SIZE;
use crate::sorting::SortMode;
use crate::tasks::{RequestId, TaskKind};
use chrono::Local;
use std::ops::Range;
use std::sync::Arc;

impl<D: ListDisplay> FolderView<D> {
    fn visible_positions(&self) -> Range<usize> {
        let len = self.display.len();
        match &self.visible_range {
            Some(range) => range.start.min(len)..range.end.min(len),
            None => 0..len,
        }
    }

    /// Queues whatever the rows on screen are still missing.
    pub(super) fn queue_visible_enrichment(&mut self) {
        for position in self.visible_positions() {
            if let Some(id) = self.display.item_id_at(position) {
                self.queue_enrichment(id);
            }
        }
    }

    fn queue_enrichment(&mut self, id: ItemId) {
        let columns: Vec<ColumnType> = self
            .columns
            .for_folder(self.store.is_virtual_folder())
            .iter()
            .filter(|column| column.checked)
            .map(|column| column.column_type)
            .collect();
        let format = self.global.column_format(Local::now());
        let view_mode = self.settings.view_mode;
        let icon_size = if view_mode.shows_thumbnails() { ICON_SIZE } else { view_mode.icon_size() };

        let Some(item) = self.store.get_mut(id) else {
            return;
        };
        let info = BasicItemInfo::capture(item, self.namespace.as_ref());

        for column in columns {
            if item.enrichment.column_text.contains_key(&column) || !item.enrichment.queued_columns.insert(column) {
                continue;
            }
            let info = info.clone();
            self.column_tasks
                .queue(id, move || Some(compute_column(&info, column, &format)));
        }

        let mut cached_icon = false;
        if item.icon.is_none() && !item.enrichment.icon_queued {
            let key = icon_key(&info);
            if let Some(icon) = self.icon_cache.get(&key) {
                item.icon = Some(icon);
                cached_icon = true;
            } else {
                item.enrichment.icon_queued = true;
                let extractor = Arc::clone(&self.icon_extractor);
                let identity = info.absolute_id.clone();
                self.icon_tasks.queue(id, move || match extractor.extract(&identity, icon_size) {
                    Ok(icon) => Some((key, icon)),
                    Err(e) => {
                        log::debug!("FolderView: no icon for {}: {}", identity, e);
                        None
                    }
                });
            }
        }

        if view_mode.shows_thumbnails() && item.enrichment.thumbnail.is_none() && !item.enrichment.thumbnail_queued {
            item.enrichment.thumbnail_queued = true;
            let extractor = Arc::clone(&self.thumbnail_extractor);
            let identity = info.absolute_id;
            self.thumbnail_tasks
                .queue(id, move || match extractor.extract(&identity, THUMBNAIL_SIZE) {
                    Ok(thumbnail) => Some(thumbnail),
                    Err(e) => {
                        log::debug!("FolderView: no thumbnail for {}: {}", identity, e);
                        None
                    }
                });
        }

        if cached_icon {
            self.refresh_row_image(id);
        }
    }

    /// Drops an item's enrichment along with every request still computing it.
    pub(super) fn forget_enrichment(&mut self, id: ItemId) {
        let forgotten = self.column_tasks.forget_item(id)
            + self.icon_tasks.forget_item(id)
            + self.thumbnail_tasks.forget_item(id)
            + self.info_tip_tasks.forget_item(id);
        if forgotten > 0 {
            log::debug!("FolderView: forgot {} in-flight requests for {}", forgotten, id);
        }
        if let Some(item) = self.store.get_mut(id) {
            item.invalidate_enrichment();
        }
    }

    /// Shows the info tip for `position`, computing it first if needed. Returns false if
    /// there's no row there.
    pub fn request_info_tip(&mut self, position: usize) -> bool {
        let Some(id) = self.display.item_id_at(position) else {
            return false;
        };
        let Some(item) = self.store.get_mut(id) else {
            return false;
        };

        if let Some(text) = &item.enrichment.info_tip {
            self.display.show_info_tip(position, text);
            return true;
        }
        if !item.enrichment.info_tip_queued {
            item.enrichment.info_tip_queued = true;
            let info = BasicItemInfo::capture(item, self.namespace.as_ref());
            let kind = self.global.info_tip_kind;
            let now = Local::now();
            self.info_tip_tasks
                .queue(id, move || Some(compute_info_tip(&info, kind, now)));
        }
        true
    }

    // ========================================================================
    // Delivery
    // ========================================================================

    pub(super) fn on_task_ready(&mut self, kind: TaskKind, request_id: RequestId) {
        match kind {
            TaskKind::Column => {
                if let Some((id, result)) = self.column_tasks.take(request_id) {
                    self.apply_column(id, result);
                    return;
                }
            }
            TaskKind::Icon => {
                if let Some((id, result)) = self.icon_tasks.take(request_id) {
                    self.apply_icon(id, result);
                    return;
                }
            }
            TaskKind::Thumbnail => {
                if let Some((id, result)) = self.thumbnail_tasks.take(request_id) {
                    self.apply_thumbnail(id, result);
                    return;
                }
            }
            TaskKind::InfoTip => {
                if let Some((id, result)) = self.info_tip_tasks.take(request_id) {
                    self.apply_info_tip(id, result);
                    return;
                }
            }
        }
        log::debug!("FolderView: dropping stale {:?} result {}", kind, request_id);
    }

    fn apply_column(&mut self, id: ItemId, result: Option<ColumnResult>) {
        let Some(result) = result else {
            return;
        };
        let Some(item) = self.store.get_mut(id) else {
            log::debug!("FolderView: column result for removed item {}", id);
            return;
        };
        item.enrichment.queued_columns.remove(&result.column_type);
        item.enrichment
            .column_text
            .insert(result.column_type, result.text.clone());

        if let Some(position) = self.display.position_of(id) {
            self.display.set_text(position, result.column_type, &result.text);
        }

        if let Some(size) = result.folder_size {
            self.store.set_folder_size(id, size);
            let sorts_by_size = self.settings.sort_mode == SortMode::TotalSize
                || (self.settings.show_in_groups && self.settings.group_mode == SortMode::TotalSize);
            if sorts_by_size {
                self.reposition(id);
            }
        }
    }

    fn apply_icon(&mut self, id: ItemId, result: Option<(String, IconRef)>) {
        let Some((key, icon)) = result else {
            return;
        };
        self.icon_cache.insert(key, icon.clone());
        let Some(item) = self.store.get_mut(id) else {
            return;
        };
        item.icon = Some(icon);
        item.enrichment.icon_queued = false;
        self.refresh_row_image(id);
    }

    fn apply_thumbnail(&mut self, id: ItemId, result: Option<IconRef>) {
        let Some(thumbnail) = result else {
            return;
        };
        let Some(item) = self.store.get_mut(id) else {
            return;
        };
        item.enrichment.thumbnail = Some(thumbnail);
        item.enrichment.thumbnail_queued = false;
        self.refresh_row_image(id);
    }

    fn apply_info_tip(&mut self, id: ItemId, result: Option<String>) {
        let Some(text) = result else {
            return;
        };
        let Some(item) = self.store.get_mut(id) else {
            return;
        };
        item.enrichment.info_tip_queued = false;
        if let Some(position) = self.display.position_of(id) {
            self.display.show_info_tip(position, &text);
        }
        item.enrichment.info_tip = Some(text);
    }
}
