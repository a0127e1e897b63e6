//! Grouping: the group key for each sort mode, and the set of live groups.
//!
//! Group keys that need data we don't have (no owner, invalid metadata, unknown folder
//! size) land in the "Unspecified" group instead of failing.

use crate::model::{ItemId, ItemInfo};
use crate::owner::owner_label;
use crate::providers::columns::{attribute_string, type_name};
use crate::sorting::{SortDirection, SortMode, compare_names_natural};
use chrono::{DateTime, Datelike, Duration, Local, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

pub const UNSPECIFIED_GROUP: &str = "Unspecified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) u32);

/// Group key of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub name: String,
    /// Explicit position, for groups whose natural order isn't alphabetical.
    pub relative_sort_position: Option<i32>,
}

impl GroupInfo {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relative_sort_position: None,
        }
    }

    fn positioned(name: impl Into<String>, position: i32) -> Self {
        Self {
            name: name.into(),
            relative_sort_position: Some(position),
        }
    }

    fn unspecified() -> Self {
        Self::positioned(UNSPECIFIED_GROUP, i32::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub relative_sort_position: Option<i32>,
    pub num_items: usize,
}

impl Group {
    /// Header text shown above the group.
    pub fn header(&self) -> String {
        let noun = if self.num_items == 1 { "item" } else { "items" };
        format!("{} ({} {})", self.name, self.num_items, noun)
    }
}

// ============================================================================
// Group set
// ============================================================================

/// Live groups, indexed by id and by name.
#[derive(Debug, Default)]
pub struct GroupSet {
    by_id: HashMap<GroupId, Group>,
    by_name: HashMap<String, GroupId>,
    next_id: u32,
}

impl GroupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the group for `info`, creating an empty one if needed. The flag is true if
    /// the group was created.
    pub fn get_or_create(&mut self, info: &GroupInfo) -> (GroupId, bool) {
        if let Some(id) = self.by_name.get(&info.name) {
            return (*id, false);
        }
        let id = GroupId(self.next_id);
        self.next_id += 1;
        self.by_name.insert(info.name.clone(), id);
        self.by_id.insert(
            id,
            Group {
                id,
                name: info.name.clone(),
                relative_sort_position: info.relative_sort_position,
                num_items: 0,
            },
        );
        (id, true)
    }

    /// Counts one more item in `id`.
    pub fn add_item(&mut self, id: GroupId) {
        if let Some(group) = self.by_id.get_mut(&id) {
            group.num_items += 1;
        }
    }

    /// Counts one item less in `id`. Returns the group if that emptied it; it's gone from
    /// the set by then.
    pub fn remove_item(&mut self, id: GroupId) -> Option<Group> {
        let group = self.by_id.get_mut(&id)?;
        group.num_items = group.num_items.saturating_sub(1);
        if group.num_items > 0 {
            return None;
        }
        let group = self.by_id.remove(&id)?;
        self.by_name.remove(&group.name);
        Some(group)
    }

    pub fn get(&self, id: GroupId) -> Option<&Group> {
        self.by_id.get(&id)
    }

    pub fn find(&self, name: &str) -> Option<&Group> {
        self.by_name.get(name).and_then(|id| self.by_id.get(id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_name.clear();
    }

    /// Group order: relative position, then name, then first seen. Groups without a
    /// position sort as position 0, which keeps the order total.
    pub fn compare(&self, a: GroupId, b: GroupId, direction: SortDirection) -> Ordering {
        let (Some(ga), Some(gb)) = (self.by_id.get(&a), self.by_id.get(&b)) else {
            return a.cmp(&b);
        };
        let position = |g: &Group| g.relative_sort_position.unwrap_or(0);
        let ordering = position(ga)
            .cmp(&position(gb))
            .then_with(|| compare_names_natural(&ga.name, &gb.name))
            .then_with(|| ga.name.cmp(&gb.name))
            .then_with(|| a.cmp(&b));
        direction.apply(ordering)
    }

    /// All group ids in display order.
    pub fn sorted_ids(&self, direction: SortDirection) -> Vec<GroupId> {
        let mut ids: Vec<GroupId> = self.by_id.keys().copied().collect();
        ids.sort_by(|a, b| self.compare(*a, *b, direction));
        ids
    }
}

// ============================================================================
// Group keys
// ============================================================================

/// Inputs to group key derivation beyond the item itself.
#[derive(Debug, Clone, Copy)]
pub struct GroupContext<'a> {
    pub folder_sizes: &'a HashMap<ItemId, u64>,
    pub now: DateTime<Local>,
}

pub fn determine_group(item: &ItemInfo, mode: SortMode, ctx: &GroupContext<'_>) -> GroupInfo {
    match mode {
        SortMode::Name => name_group(&item.display_name),
        SortMode::Type => GroupInfo::named(type_name(item.is_folder(), item.extension().as_deref())),
        SortMode::Extension => extension_group(item),
        SortMode::Size => {
            if item.is_folder() {
                GroupInfo::positioned("Folders", 0)
            } else if item.metadata_valid {
                size_group(item.metadata.size)
            } else {
                GroupInfo::unspecified()
            }
        }
        SortMode::TotalSize => {
            let size = if item.is_folder() {
                ctx.folder_sizes.get(&item.id).copied()
            } else {
                item.metadata_valid.then(|| item.metadata.size)
            };
            size.map(size_group).unwrap_or_else(GroupInfo::unspecified)
        }
        SortMode::DateModified => date_group(item.metadata.modified, ctx.now),
        SortMode::DateCreated => date_group(item.metadata.created, ctx.now),
        SortMode::DateAccessed => date_group(item.metadata.accessed, ctx.now),
        SortMode::Attributes => {
            let letters = attribute_string(item.metadata.attributes);
            if letters.is_empty() {
                GroupInfo::named("Normal")
            } else {
                GroupInfo::named(letters)
            }
        }
        SortMode::Owner => match owner_label(item.metadata.owner) {
            Some(owner) => GroupInfo::named(owner),
            None => GroupInfo::unspecified(),
        },
    }
}

fn name_group(name: &str) -> GroupInfo {
    match name.chars().next() {
        Some(c) if c.is_alphabetic() => GroupInfo::named(c.to_uppercase().collect::<String>()),
        _ => GroupInfo::positioned("Other", i32::MAX - 1),
    }
}

fn extension_group(item: &ItemInfo) -> GroupInfo {
    if item.is_folder() {
        return GroupInfo::positioned("Folders", -2);
    }
    match item.extension() {
        Some(ext) => GroupInfo::named(format!(".{}", ext)),
        None => GroupInfo::positioned("No extension", -1),
    }
}

const SIZE_BUCKETS: [(u64, &str); 6] = [
    (16 * 1024, "Tiny"),
    (1024 * 1024, "Small"),
    (128 * 1024 * 1024, "Medium"),
    (1024 * 1024 * 1024, "Large"),
    (4 * 1024 * 1024 * 1024, "Huge"),
    (u64::MAX, "Gigantic"),
];

fn size_group(size: u64) -> GroupInfo {
    if size == 0 {
        return GroupInfo::positioned("Empty", 1);
    }
    for (position, (limit, name)) in SIZE_BUCKETS.iter().enumerate() {
        if size < *limit || *limit == u64::MAX {
            return GroupInfo::positioned(*name, position as i32 + 2);
        }
    }
    GroupInfo::unspecified()
}

fn date_group(date: Option<DateTime<Utc>>, now: DateTime<Local>) -> GroupInfo {
    let Some(date) = date else {
        return GroupInfo::unspecified();
    };
    let today = now.date_naive();
    let day = date.with_timezone(&Local).date_naive();
    let days_ago = today.signed_duration_since(day).num_days();

    if days_ago <= 0 {
        return GroupInfo::positioned("Today", 0);
    }
    if days_ago == 1 {
        return GroupInfo::positioned("Yesterday", 1);
    }
    if day.iso_week() == today.iso_week() {
        return GroupInfo::positioned("Earlier this week", 2);
    }
    if day.iso_week() == (today - Duration::days(7)).iso_week() {
        return GroupInfo::positioned("Last week", 3);
    }
    if (day.year(), day.month()) == (today.year(), today.month()) {
        return GroupInfo::positioned("Earlier this month", 4);
    }
    let last_month = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };
    if (day.year(), day.month()) == last_month {
        return GroupInfo::positioned("Last month", 5);
    }
    if day.year() == today.year() {
        return GroupInfo::positioned("Earlier this year", 6);
    }
    if day.year() == today.year() - 1 {
        return GroupInfo::positioned("Last year", 7);
    }
    GroupInfo::positioned("A long time ago", 8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShellItem;
    use crate::shell::{FileAttributes, FileMetadata, ItemIdList};
    use chrono::TimeZone;

    fn item(name: &str, size: u64, folder: bool) -> ItemInfo {
        ItemInfo::new(
            ItemId(7),
            ShellItem {
                absolute_id: ItemIdList::from_segments([name]),
                display_name: name.to_string(),
                parsing_name: name.to_string(),
                metadata: FileMetadata {
                    size,
                    attributes: if folder { FileAttributes::DIRECTORY } else { FileAttributes::empty() },
                    ..FileMetadata::default()
                },
                metadata_valid: true,
                drive: None,
            },
        )
    }

    fn ctx(sizes: &HashMap<ItemId, u64>) -> GroupContext<'_> {
        GroupContext {
            folder_sizes: sizes,
            // A Wednesday
            now: Local.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap(),
        }
    }

    fn local(y: i32, m: u32, d: u32) -> Option<DateTime<Utc>> {
        Some(Local.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap().with_timezone(&Utc))
    }

    #[test]
    fn name_groups_use_first_letter() {
        let sizes = HashMap::new();
        assert_eq!(determine_group(&item("apple", 1, false), SortMode::Name, &ctx(&sizes)).name, "A");
        assert_eq!(determine_group(&item("Zed", 1, false), SortMode::Name, &ctx(&sizes)).name, "Z");
        assert_eq!(determine_group(&item("1st", 1, false), SortMode::Name, &ctx(&sizes)).name, "Other");
    }

    #[test]
    fn size_buckets() {
        let sizes = HashMap::new();
        let group = |size, folder| determine_group(&item("x", size, folder), SortMode::Size, &ctx(&sizes)).name;
        assert_eq!(group(0, true), "Folders");
        assert_eq!(group(0, false), "Empty");
        assert_eq!(group(1000, false), "Tiny");
        assert_eq!(group(500_000, false), "Small");
        assert_eq!(group(10_000_000, false), "Medium");
        assert_eq!(group(200_000_000, false), "Large");
        assert_eq!(group(2_000_000_000, false), "Huge");
        assert_eq!(group(10_000_000_000, false), "Gigantic");
    }

    #[test]
    fn invalid_metadata_is_unspecified() {
        let sizes = HashMap::new();
        let mut broken = item("x", 0, false);
        broken.metadata_valid = false;
        assert_eq!(determine_group(&broken, SortMode::Size, &ctx(&sizes)).name, UNSPECIFIED_GROUP);
        assert_eq!(determine_group(&broken, SortMode::Owner, &ctx(&sizes)).name, UNSPECIFIED_GROUP);
        assert_eq!(
            determine_group(&item("dir", 0, true), SortMode::TotalSize, &ctx(&sizes)).name,
            UNSPECIFIED_GROUP
        );
    }

    #[test]
    fn date_buckets() {
        let sizes = HashMap::new();
        let group = |date| {
            let mut it = item("x", 1, false);
            it.metadata.modified = date;
            determine_group(&it, SortMode::DateModified, &ctx(&sizes)).name
        };
        assert_eq!(group(local(2024, 5, 15)), "Today");
        assert_eq!(group(local(2024, 5, 14)), "Yesterday");
        assert_eq!(group(local(2024, 5, 13)), "Earlier this week");
        assert_eq!(group(local(2024, 5, 8)), "Last week");
        assert_eq!(group(local(2024, 5, 2)), "Earlier this month");
        assert_eq!(group(local(2024, 4, 20)), "Last month");
        assert_eq!(group(local(2024, 1, 3)), "Earlier this year");
        assert_eq!(group(local(2023, 6, 1)), "Last year");
        assert_eq!(group(local(2019, 6, 1)), "A long time ago");
        assert_eq!(group(None), UNSPECIFIED_GROUP);
    }

    #[test]
    fn group_set_tracks_membership() {
        let mut groups = GroupSet::new();
        let (a, created) = groups.get_or_create(&GroupInfo::named("A"));
        assert!(created);
        let (again, created) = groups.get_or_create(&GroupInfo::named("A"));
        assert_eq!(again, a);
        assert!(!created);

        groups.add_item(a);
        groups.add_item(a);
        assert_eq!(groups.get(a).unwrap().header(), "A (2 items)");
        assert!(groups.remove_item(a).is_none());
        let removed = groups.remove_item(a).unwrap();
        assert_eq!(removed.name, "A");
        assert!(groups.find("A").is_none());
        assert!(groups.is_empty());
    }

    #[test]
    fn group_order_position_then_name_then_first_seen() {
        let mut groups = GroupSet::new();
        let (b, _) = groups.get_or_create(&GroupInfo::named("b"));
        let (a, _) = groups.get_or_create(&GroupInfo::named("a"));
        let (large, _) = groups.get_or_create(&GroupInfo::positioned("Large", 5));
        let (tiny, _) = groups.get_or_create(&GroupInfo::positioned("Tiny", 2));

        assert_eq!(groups.compare(tiny, large, SortDirection::Ascending), Ordering::Less);
        assert_eq!(groups.compare(a, b, SortDirection::Ascending), Ordering::Less);
        assert_eq!(groups.compare(a, b, SortDirection::Descending), Ordering::Greater);
        assert_eq!(groups.sorted_ids(SortDirection::Ascending), vec![a, b, tiny, large]);

        let (other, _) = groups.get_or_create(&GroupInfo::positioned("Other", i32::MAX - 1));
        let (folders, _) = groups.get_or_create(&GroupInfo::positioned("Folders", -2));
        let ids = groups.sorted_ids(SortDirection::Ascending);
        assert_eq!(ids.first(), Some(&folders));
        assert_eq!(ids.last(), Some(&other));
    }
}
