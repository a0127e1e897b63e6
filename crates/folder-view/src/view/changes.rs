//! Applying change notifications to the store and the display.

use super::FolderView;
use crate::display::ListDisplay;
use crate::enumerator::shell_item_from_raw;
use crate::events::ViewEvent;
use crate::model::{ItemId, ShellItem, VisibilityChange};
use crate::reconciler::ShellChangeNotification;
use crate::shell::{FileAttributes, ItemIdList};

/// Removable media arriving or going away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Arrived(ItemIdList),
    Removed(ItemIdList),
}

impl<D: ListDisplay> FolderView<D> {
    /// Applies a batch of changes for the displayed folder, then tells observers once.
    pub(super) fn apply_changes(&mut self, changes: Vec<ShellChangeNotification>) {
        if changes.is_empty() {
            return;
        }

        let count = changes.len();
        let mut applied = 0;
        for change in changes {
            if self.apply_change(change) {
                applied += 1;
            }
        }
        log::debug!("FolderView: applied {} of {} changes", applied, count);

        if applied > 0 {
            self.queue_visible_enrichment();
            self.events.emit(ViewEvent::DirectoryModified);
        }
    }

    /// Returns true if the store changed.
    fn apply_change(&mut self, change: ShellChangeNotification) -> bool {
        match change {
            ShellChangeNotification::Added(identity) => self.on_item_added(&identity),
            ShellChangeNotification::Removed(identity) if &identity == self.store.folder() => {
                log::info!("FolderView: displayed folder {} was deleted", identity);
                self.events.emit(ViewEvent::DirectoryDeleted(identity));
                false
            }
            ShellChangeNotification::Removed(identity) => self.on_item_removed(&identity),
            ShellChangeNotification::Renamed { old, new } => self.on_item_renamed(&old, &new),
            ShellChangeNotification::Modified(identity) => self.on_item_modified(&identity),
        }
    }

    fn on_item_added(&mut self, identity: &ItemIdList) -> bool {
        if self.store.find_by_identity(identity).is_some() {
            return self.on_item_modified(identity);
        }

        let raw = match self.namespace.describe(identity) {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("FolderView: added item {} is already gone: {}", identity, e);
                return false;
            }
        };
        if raw.attributes.contains(FileAttributes::HIDDEN) && !self.settings.show_hidden {
            return false;
        }

        let shell = shell_item_from_raw(self.namespace.as_ref(), raw);
        self.store.add_item(shell);
        self.insert_awaiting();
        true
    }

    fn on_item_removed(&mut self, identity: &ItemIdList) -> bool {
        let Some(id) = self.store.find_by_identity(identity) else {
            return false;
        };
        self.remove_row(id);
        self.forget_enrichment(id);
        let removed = self.store.remove_item(id);
        if removed.is_some_and(|item| item.is_selected()) {
            self.events.emit(ViewEvent::SelectionChanged);
        }
        true
    }

    fn on_item_renamed(&mut self, old: &ItemIdList, new: &ItemIdList) -> bool {
        let Some(id) = self.store.find_by_identity(old) else {
            return self.on_item_added(new);
        };
        let raw = match self.namespace.describe(new) {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("FolderView: renamed item {} is already gone: {}", new, e);
                return self.on_item_removed(old);
            }
        };

        // Renamed over another item: that one is replaced
        if let Some(existing) = self.store.find_by_identity(new)
            && existing != id
        {
            self.on_item_removed(new);
        }

        let shell = shell_item_from_raw(self.namespace.as_ref(), raw);
        self.update_item(id, shell)
    }

    fn on_item_modified(&mut self, identity: &ItemIdList) -> bool {
        let Some(id) = self.store.find_by_identity(identity) else {
            return false;
        };
        match self.namespace.describe(identity) {
            Ok(raw) => {
                let shell = shell_item_from_raw(self.namespace.as_ref(), raw);
                self.update_item(id, shell)
            }
            Err(e) => {
                log::debug!("FolderView: modified item {} is gone: {}", identity, e);
                self.on_item_removed(identity)
            }
        }
    }

    /// Updates an item in place. Its enrichment is dropped and recomputed when it's next
    /// on screen.
    fn update_item(&mut self, id: ItemId, shell: ShellItem) -> bool {
        let Some(update) = self.store.update_item(id, shell) else {
            return false;
        };
        self.forget_enrichment(id);

        match update.visibility {
            VisibilityChange::Hidden => self.remove_row(id),
            VisibilityChange::Shown => {
                self.store.queue_awaiting(id);
                self.insert_awaiting();
            }
            VisibilityChange::Unchanged if !self.store.is_hidden(id) => self.reposition(id),
            VisibilityChange::Unchanged => {}
        }
        true
    }

    /// Translates a device arrival or removal into changes for the displayed folder. They go
    /// through the change buffer, so they wait for any enumeration in flight.
    pub fn on_device_change(&mut self, event: DeviceEvent) {
        if !self.committed {
            return;
        }
        let folder = self.store.folder().clone();
        let sink = self.reconciler.sink();

        match event {
            DeviceEvent::Removed(root) => {
                if folder.segments().starts_with(root.segments()) {
                    sink.push(&folder, ShellChangeNotification::Removed(folder.clone()));
                    return;
                }
                let affected: Vec<ItemIdList> = self
                    .store
                    .iter()
                    .filter(|item| {
                        item.absolute_id == root
                            || item
                                .drive
                                .as_ref()
                                .is_some_and(|drive| ItemIdList::parse(&drive.root) == root)
                    })
                    .map(|item| item.absolute_id.clone())
                    .collect();
                for identity in affected {
                    sink.push(&folder, ShellChangeNotification::Modified(identity));
                }
            }
            DeviceEvent::Arrived(root) => {
                if root.is_child_of(&folder) {
                    sink.push(&folder, ShellChangeNotification::Added(root));
                }
            }
        }
    }
}
