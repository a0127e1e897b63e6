//! Folder item model for a file-browser pane.
//!
//! Enumerates a folder through a [`ShellNamespace`], keeps the items in sync with change
//! notifications, and drives an index-addressed [`ListDisplay`] with sorting, grouping,
//! filtering and background enrichment (columns, icons, thumbnails, info tips).
//!
//! [`FolderView`] ties it together and runs on one synchronizing thread.

// Deny unused code to catch dead code early
#![deny(unused)]
// Warn on unused dependencies to catch platform-specific cfg mismatches
#![warn(unused_crate_dependencies)]
// Warn on redundant path prefixes (e.g., std::path::Path when Path is imported)
#![warn(unused_qualifications)]
// Use log::* macros instead of println!/eprintln! for proper log level control
#![deny(clippy::print_stdout, clippy::print_stderr)]

//noinspection RsUnusedImport
// Silence false positives for dev dependencies used only in benches/
#[cfg(test)]
use criterion as _;

pub mod config;
pub mod display;
pub mod enumerator;
pub mod events;
pub mod filter;
pub mod grouping;
mod ignore_poison;
pub mod messages;
pub mod model;
pub mod owner;
pub mod providers;
pub mod reconciler;
pub mod shell;
pub mod shell_windows;
pub mod sorting;
pub mod tasks;
pub mod view;
pub mod watcher;


pub use config::{FolderSettings, GlobalFolderSettings, ViewMode};
pub use display::{ListDisplay, VecListDisplay};
pub use enumerator::EnumerationError;
pub use events::{NavigateParams, NavigationSnapshot, ViewEvent};
pub use model::{ItemId, ItemInfo, ItemStore, ShellItem};
pub use reconciler::ShellChangeNotification;
pub use shell::{InMemoryNamespace, ItemIdList, LocalNamespace, ShellError, ShellNamespace};
pub use shell_windows::{ShellWindowRegistry, ShellWindowsBackend};
pub use sorting::{SortDirection, SortMode};
pub use view::{DeviceEvent, FolderView, ViewError, ViewOptions};
