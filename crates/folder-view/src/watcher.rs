//! File system watcher for the displayed folder.
//!
//! Debounced notify events are mapped to `ShellChangeNotification`s and pushed into the
//! reconciler's sink. Only folders with a file system path can be watched.

use crate::reconciler::{ChangeSink, ShellChangeNotification};
use crate::shell::ItemIdList;
use notify_debouncer_full::notify::event::{ModifyKind, RenameMode};
use notify_debouncer_full::notify::{Event, EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{DebounceEventResult, Debouncer, RecommendedCache, new_debouncer};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default debounce duration in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    Create(String),
    #[error("Failed to watch {path}: {message}")]
    Watch { path: PathBuf, message: String },
}

/// Watches one folder for as long as it's alive.
pub struct FolderWatcher {
    folder: ItemIdList,
    #[allow(dead_code, reason = "Debouncer must be held to keep watching")]
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl FolderWatcher {
    /// Starts watching `path` (the file system location of `folder`), non-recursively.
    pub fn start(path: &Path, folder: ItemIdList, sink: ChangeSink, debounce: Duration) -> Result<Self, WatcherError> {
        let watched_path = path.to_path_buf();
        let watched_folder = folder.clone();

        let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| match result {
            Ok(events) => {
                for event in events {
                    for change in convert_event(&event) {
                        sink.push(&watched_folder, change);
                    }
                }
            }
            Err(errors) => {
                // Errors often mean the folder itself went away
                if !watched_path.exists() {
                    log::info!("Watcher: watched folder is gone: {}", watched_path.display());
                    sink.push(&watched_folder, ShellChangeNotification::Removed(watched_folder.clone()));
                } else {
                    for e in errors {
                        log::warn!("Watcher: error watching {}: {}", watched_path.display(), e);
                    }
                }
            }
        })
        .map_err(|e| WatcherError::Create(e.to_string()))?;

        debouncer
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatcherError::Watch {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        log::debug!("Watcher: watching {}", path.display());
        Ok(Self { folder, debouncer })
    }

    pub fn folder(&self) -> &ItemIdList {
        &self.folder
    }
}

/// Maps one notify event to change notifications. Access events carry no change and are
/// dropped.
pub fn convert_event(event: &Event) -> Vec<ShellChangeNotification> {
    let ids = || event.paths.iter().map(|p| ItemIdList::from_path(p));

    match event.kind {
        EventKind::Create(_) => ids().map(ShellChangeNotification::Added).collect(),
        EventKind::Remove(_) => ids().map(ShellChangeNotification::Removed).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => match (mode, event.paths.as_slice()) {
            (RenameMode::From, _) => ids().map(ShellChangeNotification::Removed).collect(),
            (RenameMode::To, _) => ids().map(ShellChangeNotification::Added).collect(),
            (_, [old, new]) => vec![ShellChangeNotification::Renamed {
                old: ItemIdList::from_path(old),
                new: ItemIdList::from_path(new),
            }],
            _ => ids().map(ShellChangeNotification::Modified).collect(),
        },
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => {
            ids().map(ShellChangeNotification::Modified).collect()
        }
        EventKind::Access(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ViewMessage;
    use crate::reconciler::ChangeReconciler;
    use notify_debouncer_full::notify::event::{AccessKind, CreateKind, DataChange, RemoveKind};
    use std::sync::mpsc;
    use std::time::Instant;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths.iter().fold(Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    fn id(path: &str) -> ItemIdList {
        ItemIdList::parse(path)
    }

    #[test]
    fn test_convert_create_and_remove() {
        let created = convert_event(&event(EventKind::Create(CreateKind::File), &["/d/a"]));
        assert_eq!(created, vec![ShellChangeNotification::Added(id("/d/a"))]);

        let removed = convert_event(&event(EventKind::Remove(RemoveKind::Any), &["/d/a", "/d/b"]));
        assert_eq!(
            removed,
            vec![
                ShellChangeNotification::Removed(id("/d/a")),
                ShellChangeNotification::Removed(id("/d/b"))
            ]
        );
    }

    #[test]
    fn test_convert_renames() {
        let both = convert_event(&event(EventKind::Modify(ModifyKind::Name(RenameMode::Both)), &["/d/a", "/d/b"]));
        assert_eq!(
            both,
            vec![ShellChangeNotification::Renamed {
                old: id("/d/a"),
                new: id("/d/b")
            }]
        );

        let from = convert_event(&event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/d/a"]));
        assert_eq!(from, vec![ShellChangeNotification::Removed(id("/d/a"))]);

        let to = convert_event(&event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/d/b"]));
        assert_eq!(to, vec![ShellChangeNotification::Added(id("/d/b"))]);
    }

    #[test]
    fn test_convert_modify_and_access() {
        let modified = convert_event(&event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), &["/d/a"]));
        assert_eq!(modified, vec![ShellChangeNotification::Modified(id("/d/a"))]);
        assert!(convert_event(&event(EventKind::Access(AccessKind::Any), &["/d/a"])).is_empty());
    }

    #[test]
    fn test_watcher_reports_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let folder = ItemIdList::from_path(dir.path());
        let (tx, rx) = mpsc::channel();
        let mut reconciler = ChangeReconciler::new(tx);
        let _watcher = FolderWatcher::start(dir.path(), folder.clone(), reconciler.sink(), Duration::from_millis(50)).unwrap();

        std::fs::write(dir.path().join("fresh.txt"), "x").unwrap();
        let expected = ItemIdList::from_path(&dir.path().join("fresh.txt"));

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut seen = false;
        while !seen && Instant::now() < deadline {
            if let Ok(ViewMessage::DirectoryAltered) = rx.recv_timeout(Duration::from_millis(200)) {
                seen = reconciler
                    .drain(&folder)
                    .iter()
                    .any(|change| change == &ShellChangeNotification::Added(expected.clone()));
            }
        }
        assert!(seen, "no Added notification for the new file");
    }
}
