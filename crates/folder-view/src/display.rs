//! The list display the view keeps in lockstep with the store.
//!
//! The display is an ordered sequence of item ids addressed by position. The view decides
//! every position; the display never sorts on its own.

use crate::config::ViewMode;
use crate::grouping::GroupId;
use crate::model::ItemId;
use crate::providers::columns::{Column, ColumnType};
use crate::providers::icons::IconRef;
use std::collections::HashMap;

/// Index-addressed list surface.
///
/// Positions passed in are always in range; implementations may ignore out-of-range calls.
pub trait ListDisplay {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_at(&mut self, position: usize, item_id: ItemId);
    fn remove_at(&mut self, position: usize) -> Option<ItemId>;
    fn move_to(&mut self, from: usize, to: usize);
    /// Puts every row in the order of `order`, which holds each displayed id once. Rows keep
    /// their texts, icon, selection and group.
    fn reorder(&mut self, order: &[ItemId]);
    fn item_id_at(&self, position: usize) -> Option<ItemId>;

    fn position_of(&self, item_id: ItemId) -> Option<usize> {
        (0..self.len()).find(|&position| self.item_id_at(position) == Some(item_id))
    }

    fn remove_all(&mut self);

    fn set_text(&mut self, position: usize, column: ColumnType, text: &str);
    fn set_icon(&mut self, position: usize, icon: &IconRef);

    /// Selected positions, ascending.
    fn selection(&self) -> Vec<usize>;
    fn set_selected(&mut self, position: usize, selected: bool);

    fn set_columns(&mut self, columns: &[Column]) {
        let _ = columns;
    }

    fn set_view_mode(&mut self, mode: ViewMode) {
        let _ = mode;
    }

    // ── Groups ───────────────────────────────────────────────────────

    fn set_groups_enabled(&mut self, enabled: bool);
    fn insert_group(&mut self, group: GroupId, header: &str);
    fn remove_group(&mut self, group: GroupId);
    fn set_group_header(&mut self, group: GroupId, header: &str);
    fn set_item_group(&mut self, position: usize, group: GroupId);
    /// Replaces the group order. `order` holds every group currently inserted.
    fn set_group_order(&mut self, order: &[GroupId]);

    fn begin_label_edit(&mut self, position: usize) {
        let _ = position;
    }

    fn show_info_tip(&mut self, position: usize, text: &str) {
        let _ = (position, text);
    }
}

// ============================================================================
// In-memory display
// ============================================================================

#[derive(Debug, Clone)]
pub struct DisplayRow {
    pub item_id: ItemId,
    pub texts: HashMap<ColumnType, String>,
    pub icon: Option<IconRef>,
    pub selected: bool,
    pub group: Option<GroupId>,
}

impl DisplayRow {
    fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            texts: HashMap::new(),
            icon: None,
            selected: false,
            group: None,
        }
    }
}

/// A `ListDisplay` backed by vectors. Used by headless hosts and tests.
#[derive(Debug, Default)]
pub struct VecListDisplay {
    rows: Vec<DisplayRow>,
    groups_enabled: bool,
    /// Groups in display order, with their headers.
    groups: Vec<(GroupId, String)>,
    columns: Vec<Column>,
    view_mode: ViewMode,
    label_edit: Option<usize>,
    info_tip: Option<(usize, String)>,
}

impl VecListDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub fn row(&self, position: usize) -> Option<&DisplayRow> {
        self.rows.get(position)
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.rows.iter().map(|row| row.item_id).collect()
    }

    pub fn groups_enabled(&self) -> bool {
        self.groups_enabled
    }

    /// Group headers in display order.
    pub fn group_headers(&self) -> Vec<&str> {
        self.groups.iter().map(|(_, header)| header.as_str()).collect()
    }

    pub fn group_ids(&self) -> Vec<GroupId> {
        self.groups.iter().map(|(id, _)| *id).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn label_edit(&self) -> Option<usize> {
        self.label_edit
    }

    pub fn info_tip(&self) -> Option<(usize, &str)> {
        self.info_tip.as_ref().map(|(position, text)| (*position, text.as_str()))
    }
}

impl ListDisplay for VecListDisplay {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn insert_at(&mut self, position: usize, item_id: ItemId) {
        let position = position.min(self.rows.len());
        self.rows.insert(position, DisplayRow::new(item_id));
    }

    fn remove_at(&mut self, position: usize) -> Option<ItemId> {
        if position >= self.rows.len() {
            return None;
        }
        if self.label_edit == Some(position) {
            self.label_edit = None;
        }
        Some(self.rows.remove(position).item_id)
    }

    fn move_to(&mut self, from: usize, to: usize) {
        if from == to || from >= self.rows.len() || to >= self.rows.len() {
            return;
        }
        let row = self.rows.remove(from);
        self.rows.insert(to, row);
    }

    fn reorder(&mut self, order: &[ItemId]) {
        if order.len() != self.rows.len() {
            log::warn!("VecListDisplay: reorder with {} ids for {} rows", order.len(), self.rows.len());
        }
        let editing = self.label_edit.and_then(|position| self.item_id_at(position));
        let tip = self
            .info_tip
            .take()
            .and_then(|(position, text)| self.item_id_at(position).map(|id| (id, text)));

        let mut by_id: HashMap<ItemId, DisplayRow> = self.rows.drain(..).map(|row| (row.item_id, row)).collect();
        self.rows = order.iter().filter_map(|id| by_id.remove(id)).collect();
        // Rows missing from `order` go last
        let mut rest: Vec<DisplayRow> = by_id.into_values().collect();
        rest.sort_by_key(|row| row.item_id);
        self.rows.extend(rest);

        self.label_edit = editing.and_then(|id| self.position_of(id));
        self.info_tip = tip.and_then(|(id, text)| self.position_of(id).map(|position| (position, text)));
    }

    fn item_id_at(&self, position: usize) -> Option<ItemId> {
        self.rows.get(position).map(|row| row.item_id)
    }

    fn position_of(&self, item_id: ItemId) -> Option<usize> {
        self.rows.iter().position(|row| row.item_id == item_id)
    }

    fn remove_all(&mut self) {
        self.rows.clear();
        self.label_edit = None;
        self.info_tip = None;
    }

    fn set_text(&mut self, position: usize, column: ColumnType, text: &str) {
        if let Some(row) = self.rows.get_mut(position) {
            row.texts.insert(column, text.to_string());
        }
    }

    fn set_icon(&mut self, position: usize, icon: &IconRef) {
        if let Some(row) = self.rows.get_mut(position) {
            row.icon = Some(icon.clone());
        }
    }

    fn selection(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.selected)
            .map(|(position, _)| position)
            .collect()
    }

    fn set_selected(&mut self, position: usize, selected: bool) {
        if let Some(row) = self.rows.get_mut(position) {
            row.selected = selected;
        }
    }

    fn set_columns(&mut self, columns: &[Column]) {
        self.columns = columns.to_vec();
    }

    fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    fn set_groups_enabled(&mut self, enabled: bool) {
        self.groups_enabled = enabled;
        if !enabled {
            self.groups.clear();
            for row in &mut self.rows {
                row.group = None;
            }
        }
    }

    fn insert_group(&mut self, group: GroupId, header: &str) {
        if !self.groups.iter().any(|(id, _)| *id == group) {
            self.groups.push((group, header.to_string()));
        }
    }

    fn remove_group(&mut self, group: GroupId) {
        self.groups.retain(|(id, _)| *id != group);
    }

    fn set_group_header(&mut self, group: GroupId, header: &str) {
        if let Some((_, text)) = self.groups.iter_mut().find(|(id, _)| *id == group) {
            *text = header.to_string();
        }
    }

    fn set_item_group(&mut self, position: usize, group: GroupId) {
        if let Some(row) = self.rows.get_mut(position) {
            row.group = Some(group);
        }
    }

    fn set_group_order(&mut self, order: &[GroupId]) {
        self.groups
            .sort_by_key(|(id, _)| order.iter().position(|ordered| ordered == id).unwrap_or(usize::MAX));
    }

    fn begin_label_edit(&mut self, position: usize) {
        if position < self.rows.len() {
            self.label_edit = Some(position);
        }
    }

    fn show_info_tip(&mut self, position: usize, text: &str) {
        self.info_tip = Some((position, text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[u32]) -> Vec<ItemId> {
        values.iter().map(|v| ItemId(*v)).collect()
    }

    #[test]
    fn insert_remove_and_move_keep_order() {
        let mut display = VecListDisplay::new();
        display.insert_at(0, ItemId(1));
        display.insert_at(1, ItemId(3));
        display.insert_at(1, ItemId(2));
        assert_eq!(display.item_ids(), ids(&[1, 2, 3]));

        display.move_to(0, 2);
        assert_eq!(display.item_ids(), ids(&[2, 3, 1]));
        assert_eq!(display.position_of(ItemId(1)), Some(2));

        assert_eq!(display.remove_at(1), Some(ItemId(3)));
        assert_eq!(display.remove_at(5), None);
        assert_eq!(display.item_ids(), ids(&[2, 1]));
    }

    #[test]
    fn text_and_selection_follow_the_row() {
        let mut display = VecListDisplay::new();
        display.insert_at(0, ItemId(1));
        display.insert_at(1, ItemId(2));
        display.set_text(1, ColumnType::Size, "5 bytes");
        display.set_selected(1, true);

        display.move_to(1, 0);
        assert_eq!(display.selection(), vec![0]);
        assert_eq!(display.row(0).unwrap().texts.get(&ColumnType::Size).map(String::as_str), Some("5 bytes"));
    }

    #[test]
    fn reorder_carries_row_state() {
        let mut display = VecListDisplay::new();
        for (position, id) in [1, 2, 3].into_iter().enumerate() {
            display.insert_at(position, ItemId(id));
        }
        display.set_selected(0, true);
        display.set_text(2, ColumnType::Name, "three");
        display.begin_label_edit(2);
        display.show_info_tip(0, "tip");

        display.reorder(&ids(&[3, 1, 2]));
        assert_eq!(display.item_ids(), ids(&[3, 1, 2]));
        assert_eq!(display.selection(), vec![1]);
        assert_eq!(display.row(0).unwrap().texts.get(&ColumnType::Name).map(String::as_str), Some("three"));
        assert_eq!(display.label_edit(), Some(0));
        assert_eq!(display.info_tip(), Some((1, "tip")));
    }

    #[test]
    fn group_order_is_replaced_wholesale() {
        let mut display = VecListDisplay::new();
        display.set_groups_enabled(true);
        display.insert_group(GroupId(0), "B (1 item)");
        display.insert_group(GroupId(1), "A (2 items)");
        display.set_group_order(&[GroupId(1), GroupId(0)]);
        assert_eq!(display.group_headers(), vec!["A (2 items)", "B (1 item)"]);

        display.set_group_header(GroupId(0), "B (2 items)");
        display.remove_group(GroupId(1));
        assert_eq!(display.group_headers(), vec!["B (2 items)"]);

        display.set_groups_enabled(false);
        assert!(display.group_headers().is_empty());
    }
}
