//! Folder enumeration: one full listing of a folder, run off the synchronizing thread.
//!
//! Metadata comes from the namespace's property store when it has it, else from a direct
//! per-item query. Items whose metadata can't be read either way are kept with defaults.

use crate::messages::ViewMessage;
use crate::model::ShellItem;
use crate::shell::{FileMetadata, ItemIdList, RawChild, ShellError, ShellNamespace};
use std::sync::{Arc, mpsc};
use std::time::Instant;
use uuid::Uuid;

/// Why a folder couldn't be listed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnumerationError {
    #[error("Folder not found: {0}")]
    FolderNotFound(String),
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Folder unreachable: {0}")]
    Unreachable(String),
}

impl From<ShellError> for EnumerationError {
    fn from(err: ShellError) -> Self {
        match err {
            ShellError::NotFound(message) => Self::FolderNotFound(message),
            ShellError::PermissionDenied(message) => Self::AccessDenied(message),
            ShellError::NotAvailable(message) | ShellError::Io(message) => Self::Unreachable(message),
            ShellError::NotSupported => Self::Unreachable("operation not supported".to_string()),
        }
    }
}

/// Builds a shell item from a raw child, filling in metadata through the slow path if the
/// namespace didn't report it.
pub fn shell_item_from_raw(namespace: &dyn ShellNamespace, mut raw: RawChild) -> ShellItem {
    if let Some(metadata) = raw.metadata.take() {
        return ShellItem::from_raw(raw, metadata, true);
    }

    match namespace.get_metadata(&raw.id) {
        Ok(metadata) => ShellItem::from_raw(raw, metadata, true),
        Err(e) => {
            log::debug!("Enumerator: no metadata for {}, using defaults: {}", raw.id, e);
            let defaults = FileMetadata {
                attributes: raw.attributes,
                ..FileMetadata::default()
            };
            ShellItem::from_raw(raw, defaults, false)
        }
    }
}

/// Lists `folder`. Hidden children are dropped here unless `show_hidden` is set.
pub fn enumerate(
    namespace: &dyn ShellNamespace,
    folder: &ItemIdList,
    show_hidden: bool,
) -> Result<Vec<ShellItem>, EnumerationError> {
    let overall_start = Instant::now();

    let children = namespace.enumerate_children(folder, show_hidden)?;
    let read_time = overall_start.elapsed();
    let count = children.len();

    let items: Vec<ShellItem> = children
        .into_iter()
        .map(|raw| shell_item_from_raw(namespace, raw))
        .collect();
    let fallbacks = items.iter().filter(|item| !item.metadata_valid).count();

    log::debug!(
        "enumerate: folder={}, entries={}, metadata_unavailable={}, read={}ms, total={}ms",
        folder,
        count,
        fallbacks,
        read_time.as_millis(),
        overall_start.elapsed().as_millis()
    );

    Ok(items)
}

/// A one-shot enumeration on its own thread. The result arrives on the view's queue as
/// `ViewMessage::EnumerationCompleted`.
pub struct EnumerationJob;

impl EnumerationJob {
    pub fn spawn(
        namespace: Arc<dyn ShellNamespace>,
        folder: ItemIdList,
        show_hidden: bool,
        navigation_id: Uuid,
        notify: mpsc::Sender<ViewMessage>,
    ) -> std::io::Result<()> {
        std::thread::Builder::new()
            .name("folder-enumeration".to_string())
            .spawn(move || {
                let result = enumerate(namespace.as_ref(), &folder, show_hidden);
                if let Err(e) = &result {
                    log::info!("Enumerator: listing {} failed: {}", folder, e);
                }
                let _ = notify.send(ViewMessage::EnumerationCompleted { navigation_id, result });
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::InMemoryNamespace;
    use std::time::Duration;

    fn id(path: &str) -> ItemIdList {
        ItemIdList::parse(path)
    }

    fn sample() -> InMemoryNamespace {
        let ns = InMemoryNamespace::new();
        ns.add_folder(&id("/docs"));
        ns.add_file(&id("/docs/a.txt"), 5);
        ns.add_file(&id("/docs/b.txt"), 10);
        ns.add_hidden_file(&id("/docs/.cache"), 1);
        ns
    }

    #[test]
    fn uses_property_store_metadata() {
        let ns = sample();
        let items = enumerate(&ns, &id("/docs"), false).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.metadata_valid));
        assert_eq!(items.iter().map(|i| i.metadata.size).sum::<u64>(), 15);
    }

    #[test]
    fn falls_back_to_direct_query() {
        let ns = sample();
        ns.set_property_store_available(&id("/docs/a.txt"), false);
        let items = enumerate(&ns, &id("/docs"), false).unwrap();
        let a = items.iter().find(|i| i.display_name == "a.txt").unwrap();
        assert!(a.metadata_valid);
        assert_eq!(a.metadata.size, 5);
    }

    #[test]
    fn keeps_items_without_any_metadata() {
        let ns = sample();
        ns.set_property_store_available(&id("/docs/a.txt"), false);
        ns.set_metadata_available(&id("/docs/a.txt"), false);
        let items = enumerate(&ns, &id("/docs"), false).unwrap();
        let a = items.iter().find(|i| i.display_name == "a.txt").unwrap();
        assert!(!a.metadata_valid);
        assert_eq!(a.metadata.size, 0);
    }

    #[test]
    fn hidden_items_only_with_show_hidden() {
        let ns = sample();
        assert_eq!(enumerate(&ns, &id("/docs"), true).unwrap().len(), 3);
    }

    #[test]
    fn failures_map_to_enumeration_errors() {
        let ns = sample();
        assert!(matches!(
            enumerate(&ns, &id("/gone"), false),
            Err(EnumerationError::FolderNotFound(_))
        ));
        ns.set_unreachable(&id("/docs"), true);
        assert!(matches!(
            enumerate(&ns, &id("/docs"), false),
            Err(EnumerationError::Unreachable(_))
        ));
    }

    #[test]
    fn job_reports_on_the_queue() {
        let ns: Arc<dyn ShellNamespace> = Arc::new(sample());
        let (tx, rx) = mpsc::channel();
        let navigation_id = Uuid::new_v4();
        EnumerationJob::spawn(ns, id("/docs"), false, navigation_id, tx).unwrap();

        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            ViewMessage::EnumerationCompleted { navigation_id: got, result } => {
                assert_eq!(got, navigation_id);
                assert_eq!(result.unwrap().len(), 2);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }
}
