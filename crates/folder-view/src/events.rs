//! Observer notifications published by a folder view.

use crate::enumerator::EnumerationError;
use crate::shell::ItemIdList;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Buffer per subscriber. A subscriber that falls further behind gets `Lagged`.
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigateParams {
    pub navigation_id: Uuid,
    pub folder: ItemIdList,
}

/// State of the view at a navigation milestone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationSnapshot {
    pub navigation_id: Uuid,
    pub folder: ItemIdList,
    pub virtual_folder: bool,
    pub num_items: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// Items or aggregates changed.
    DirectoryModified,
    SelectionChanged,
    ColumnsChanged,
    NavigationStarted(NavigateParams),
    /// The old folder's state is gone and the new folder's items are going in.
    NavigationCommitted(NavigationSnapshot),
    NavigationCompleted(NavigationSnapshot),
    /// The previous folder stays displayed.
    NavigationFailed { params: NavigateParams, error: EnumerationError },
    /// The displayed folder was deleted.
    DirectoryDeleted(ItemIdList),
}

/// Fan-out of view events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ViewEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.sender.subscribe()
    }

    /// Publishes `event`. Having no subscribers is fine.
    pub fn emit(&self, event: ViewEvent) {
        log::trace!("Events: {:?}", event);
        let _ = self.sender.send(event);
    }
}
