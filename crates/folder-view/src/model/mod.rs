//! Item model: item records and the per-folder store that owns them.

mod item;
mod store;


pub use item::{Enrichment, ItemId, ItemInfo, ShellItem};
pub use store::{DirectoryState, FilterChange, ItemStore, ItemUpdate, VisibilityChange};
