//! Change reconciler: holds back change notifications while an enumeration is in flight,
//! then replays only the ones the snapshot doesn't already reflect.
//!
//! The watcher thread pushes into a `ChangeSink` (the one mutex-guarded buffer shared with
//! other threads). The synchronizing thread drains it:
//! - Idle: changes for the current folder are handed straight back for applying.
//! - EnumerationInFlight: everything is deferred. When the snapshot lands, deferred changes
//!   whose identity is in the snapshot are dropped, the rest come back in arrival order.

use crate::ignore_poison::IgnorePoison;
use crate::messages::ViewMessage;
use crate::shell::ItemIdList;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};

// ── Notifications ────────────────────────────────────────────────────

/// One change reported for a monitored folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellChangeNotification {
    Added(ItemIdList),
    Removed(ItemIdList),
    Renamed { old: ItemIdList, new: ItemIdList },
    Modified(ItemIdList),
}

impl ShellChangeNotification {
    /// The identity that decides whether an enumeration snapshot already covers this change.
    /// For renames that's the new identity.
    pub fn identity(&self) -> &ItemIdList {
        match self {
            Self::Added(id) | Self::Removed(id) | Self::Modified(id) => id,
            Self::Renamed { new, .. } => new,
        }
    }

    /// Restates the change from the point of view of `folder`, or `None` if it doesn't
    /// concern the folder's children. A rename across the folder boundary becomes an add or
    /// a remove. Removal of the folder itself is kept.
    pub fn relative_to(self, folder: &ItemIdList) -> Option<Self> {
        match self {
            Self::Renamed { old, new } => match (old.is_child_of(folder), new.is_child_of(folder)) {
                (true, true) => Some(Self::Renamed { old, new }),
                (true, false) => Some(Self::Removed(old)),
                (false, true) => Some(Self::Added(new)),
                (false, false) => None,
            },
            Self::Removed(id) if &id == folder => Some(Self::Removed(id)),
            other => other.identity().is_child_of(folder).then_some(other),
        }
    }
}

/// A change together with the folder whose watcher reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedChange {
    pub folder: ItemIdList,
    pub change: ShellChangeNotification,
}

// ── Shared buffer ────────────────────────────────────────────────────

/// Producer side of the change buffer. Cheap to clone; hand one to each watcher.
#[derive(Clone)]
pub struct ChangeSink {
    buffer: Arc<Mutex<Vec<TaggedChange>>>,
    /// Set while a `DirectoryAltered` wake-up is queued and not yet drained.
    wake_pending: Arc<AtomicBool>,
    notify: mpsc::Sender<ViewMessage>,
}

impl ChangeSink {
    fn new(notify: mpsc::Sender<ViewMessage>) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            wake_pending: Arc::new(AtomicBool::new(false)),
            notify,
        }
    }

    /// Records a change for `folder` and wakes the view (once per batch).
    pub fn push(&self, folder: &ItemIdList, change: ShellChangeNotification) {
        self.buffer.lock_ignore_poison().push(TaggedChange {
            folder: folder.clone(),
            change,
        });
        if !self.wake_pending.swap(true, Ordering::AcqRel) {
            let _ = self.notify.send(ViewMessage::DirectoryAltered);
        }
    }

    fn take_all(&self) -> Vec<TaggedChange> {
        // Clear the flag first so a push racing with us queues a fresh wake-up
        self.wake_pending.store(false, Ordering::Release);
        std::mem::take(&mut *self.buffer.lock_ignore_poison())
    }
}

// ── Reconciler ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReconcilerState {
    Idle,
    EnumerationInFlight,
}

pub struct ChangeReconciler {
    sink: ChangeSink,
    state: ReconcilerState,
    /// Changes held back during the current enumeration, in arrival order.
    deferred: Vec<TaggedChange>,
}

impl ChangeReconciler {
    pub fn new(notify: mpsc::Sender<ViewMessage>) -> Self {
        Self {
            sink: ChangeSink::new(notify),
            state: ReconcilerState::Idle,
            deferred: Vec::new(),
        }
    }

    pub fn sink(&self) -> ChangeSink {
        self.sink.clone()
    }

    pub fn begin_enumeration(&mut self) {
        self.state = ReconcilerState::EnumerationInFlight;
    }

    pub fn is_buffering(&self) -> bool {
        self.state == ReconcilerState::EnumerationInFlight
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Pulls whatever the watchers pushed. Returns the changes to apply now to
    /// `current_folder`; while an enumeration is in flight that's nothing.
    pub fn drain(&mut self, current_folder: &ItemIdList) -> Vec<ShellChangeNotification> {
        let raw = self.sink.take_all();
        if self.is_buffering() {
            self.deferred.extend(raw);
            return Vec::new();
        }
        filter_for_folder(raw, current_folder)
    }

    /// Ends the in-flight enumeration of `folder`. Returns the deferred changes that the
    /// snapshot doesn't cover, in arrival order.
    pub fn finish_enumeration(
        &mut self,
        folder: &ItemIdList,
        snapshot: &HashSet<ItemIdList>,
    ) -> Vec<ShellChangeNotification> {
        self.state = ReconcilerState::Idle;
        let mut buffered = std::mem::take(&mut self.deferred);
        buffered.extend(self.sink.take_all());

        let total = buffered.len();
        let relevant = filter_for_folder(buffered, folder);
        let relevant_count = relevant.len();
        let replay: Vec<_> = relevant
            .into_iter()
            .filter(|change| !snapshot.contains(change.identity()))
            .collect();

        if total > 0 {
            log::info!(
                "Reconciler: {} buffered changes, {} for {}, replaying {}",
                total,
                relevant_count,
                folder,
                replay.len()
            );
        }
        replay
    }

    /// Ends an enumeration that failed. Deferred changes for `current_folder` (the folder
    /// still displayed) come back for applying; nothing was replaced, so nothing is covered.
    pub fn abandon_enumeration(&mut self, current_folder: &ItemIdList) -> Vec<ShellChangeNotification> {
        self.state = ReconcilerState::Idle;
        let mut buffered = std::mem::take(&mut self.deferred);
        buffered.extend(self.sink.take_all());
        filter_for_folder(buffered, current_folder)
    }
}

fn filter_for_folder(changes: Vec<TaggedChange>, folder: &ItemIdList) -> Vec<ShellChangeNotification> {
    changes
        .into_iter()
        .filter(|tagged| &tagged.folder == folder)
        .filter_map(|tagged| tagged.change.relative_to(folder))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(path: &str) -> ItemIdList {
        ItemIdList::parse(path)
    }

    fn reconciler() -> (ChangeReconciler, mpsc::Receiver<ViewMessage>) {
        let (tx, rx) = mpsc::channel();
        (ChangeReconciler::new(tx), rx)
    }

    #[test]
    fn idle_changes_pass_straight_through() {
        let (mut reconciler, _rx) = reconciler();
        let sink = reconciler.sink();
        sink.push(&id("/docs"), ShellChangeNotification::Added(id("/docs/new.txt")));

        let changes = reconciler.drain(&id("/docs"));
        assert_eq!(changes, vec![ShellChangeNotification::Added(id("/docs/new.txt"))]);
        assert!(reconciler.drain(&id("/docs")).is_empty());
    }

    #[test]
    fn one_wake_up_per_batch() {
        let (mut reconciler, rx) = reconciler();
        let sink = reconciler.sink();
        sink.push(&id("/docs"), ShellChangeNotification::Added(id("/docs/a")));
        sink.push(&id("/docs"), ShellChangeNotification::Added(id("/docs/b")));
        assert!(matches!(rx.try_recv(), Ok(ViewMessage::DirectoryAltered)));
        assert!(rx.try_recv().is_err());

        reconciler.drain(&id("/docs"));
        sink.push(&id("/docs"), ShellChangeNotification::Added(id("/docs/c")));
        assert!(matches!(rx.try_recv(), Ok(ViewMessage::DirectoryAltered)));
    }

    #[test]
    fn in_flight_changes_are_deferred_then_filtered_by_snapshot() {
        let (mut reconciler, _rx) = reconciler();
        let sink = reconciler.sink();
        reconciler.begin_enumeration();

        sink.push(&id("/docs"), ShellChangeNotification::Added(id("/docs/seen.txt")));
        sink.push(&id("/docs"), ShellChangeNotification::Added(id("/docs/late.txt")));
        sink.push(&id("/docs"), ShellChangeNotification::Removed(id("/docs/old.txt")));
        assert!(reconciler.drain(&id("/docs")).is_empty());
        assert_eq!(reconciler.deferred_len(), 3);

        let snapshot = HashSet::from([id("/docs/seen.txt"), id("/docs/old.txt")]);
        let replay = reconciler.finish_enumeration(&id("/docs"), &snapshot);
        assert_eq!(replay, vec![ShellChangeNotification::Added(id("/docs/late.txt"))]);
        assert!(!reconciler.is_buffering());
        assert_eq!(reconciler.deferred_len(), 0);
    }

    #[test]
    fn changes_for_other_folders_are_dropped() {
        let (mut reconciler, _rx) = reconciler();
        let sink = reconciler.sink();
        reconciler.begin_enumeration();
        sink.push(&id("/old"), ShellChangeNotification::Added(id("/old/a")));
        sink.push(&id("/new"), ShellChangeNotification::Added(id("/new/b")));

        let replay = reconciler.finish_enumeration(&id("/new"), &HashSet::new());
        assert_eq!(replay, vec![ShellChangeNotification::Added(id("/new/b"))]);
    }

    #[test]
    fn abandoned_enumeration_returns_changes_for_displayed_folder() {
        let (mut reconciler, _rx) = reconciler();
        let sink = reconciler.sink();
        reconciler.begin_enumeration();
        sink.push(&id("/shown"), ShellChangeNotification::Modified(id("/shown/x")));
        sink.push(&id("/target"), ShellChangeNotification::Added(id("/target/y")));

        let changes = reconciler.abandon_enumeration(&id("/shown"));
        assert_eq!(changes, vec![ShellChangeNotification::Modified(id("/shown/x"))]);
    }

    #[test]
    fn renames_across_the_folder_boundary() {
        let folder = id("/docs");
        let rename = |old: &str, new: &str| ShellChangeNotification::Renamed { old: id(old), new: id(new) };

        assert_eq!(
            rename("/docs/a", "/docs/b").relative_to(&folder),
            Some(rename("/docs/a", "/docs/b"))
        );
        assert_eq!(
            rename("/docs/a", "/elsewhere/a").relative_to(&folder),
            Some(ShellChangeNotification::Removed(id("/docs/a")))
        );
        assert_eq!(
            rename("/elsewhere/a", "/docs/a").relative_to(&folder),
            Some(ShellChangeNotification::Added(id("/docs/a")))
        );
        assert_eq!(rename("/x/a", "/y/a").relative_to(&folder), None);
        assert_eq!(rename("/docs/a", "/docs/b").identity(), &id("/docs/b"));
    }

    #[test]
    fn removal_of_the_folder_itself_is_kept() {
        let folder = id("/docs");
        assert_eq!(
            ShellChangeNotification::Removed(id("/docs")).relative_to(&folder),
            Some(ShellChangeNotification::Removed(id("/docs")))
        );
        assert_eq!(ShellChangeNotification::Modified(id("/docs")).relative_to(&folder), None);
        assert_eq!(ShellChangeNotification::Added(id("/docs/sub/deep")).relative_to(&folder), None);
    }
}
