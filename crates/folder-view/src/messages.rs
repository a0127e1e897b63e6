//! Messages delivered to the synchronizing thread.

use crate::enumerator::EnumerationError;
use crate::model::ShellItem;
use crate::tasks::{RequestId, TaskKind};
use uuid::Uuid;

/// Everything that reaches a folder view from other threads goes through its queue as one
/// of these.
#[derive(Debug)]
pub enum ViewMessage {
    /// An enumeration job finished.
    EnumerationCompleted {
        navigation_id: Uuid,
        result: Result<Vec<ShellItem>, EnumerationError>,
    },
    /// The watcher pushed change notifications into the shared buffer.
    DirectoryAltered,
    /// A background task has a result waiting.
    TaskReady { kind: TaskKind, request_id: RequestId },
}
