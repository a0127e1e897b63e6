//! Icon references, the extraction backend boundary, and the per-kind icon cache.

use super::BasicItemInfo;
use crate::shell::{ItemIdList, ShellError, ShellNamespace};
use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Small icon size in pixels.
pub const ICON_SIZE: u32 = 16;

/// Shared handle to a decoded icon or thumbnail.
#[derive(Clone)]
pub struct IconRef(Arc<RgbaImage>);

impl IconRef {
    pub fn new(image: RgbaImage) -> Self {
        Self(Arc::new(image))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.0
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }
}

/// Two refs are equal when they share the same image.
impl PartialEq for IconRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for IconRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        write!(f, "IconRef({}x{})", width, height)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("No image available for {0}")]
    Unsupported(String),
    #[error("Failed to decode image for {item}: {message}")]
    Decode { item: String, message: String },
    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// Icon and thumbnail extraction backend.
pub trait IconExtractor: Send + Sync {
    fn extract(&self, item: &ItemIdList, size: u32) -> Result<IconRef, ExtractionError>;
}

/// Cache key: items with the same key share an icon.
pub fn icon_key(item: &BasicItemInfo) -> String {
    if item.is_folder {
        return "folder".to_string();
    }
    match &item.extension {
        Some(ext) => format!("ext:{}", ext),
        None => "file".to_string(),
    }
}

/// Icons already extracted, keyed by `icon_key`. Lives on the synchronizing thread.
#[derive(Debug, Default)]
pub struct IconCache {
    entries: HashMap<String, IconRef>,
}

impl IconCache {
    pub fn get(&self, key: &str) -> Option<IconRef> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: String, icon: IconRef) {
        self.entries.insert(key, icon);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Flat-colored stand-in icons, for hosts without a native icon backend.
pub struct PlaceholderIconExtractor {
    namespace: Arc<dyn ShellNamespace>,
}

impl PlaceholderIconExtractor {
    pub fn new(namespace: Arc<dyn ShellNamespace>) -> Self {
        Self { namespace }
    }
}

pub(super) fn placeholder_icon(is_folder: bool, size: u32) -> IconRef {
    let color = if is_folder {
        Rgba([0xE8, 0xB9, 0x3C, 0xFF])
    } else {
        Rgba([0xC8, 0xC8, 0xC8, 0xFF])
    };
    IconRef::new(RgbaImage::from_pixel(size, size, color))
}

impl IconExtractor for PlaceholderIconExtractor {
    fn extract(&self, item: &ItemIdList, size: u32) -> Result<IconRef, ExtractionError> {
        let described = self.namespace.describe(item)?;
        let is_folder = described.attributes.contains(crate::shell::FileAttributes::DIRECTORY);
        Ok(placeholder_icon(is_folder, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemId;
    use crate::shell::{FileMetadata, InMemoryNamespace};

    fn snapshot(name: &str, is_folder: bool, extension: Option<&str>) -> BasicItemInfo {
        BasicItemInfo {
            item_id: ItemId(0),
            absolute_id: ItemIdList::from_segments([name]),
            display_name: name.to_string(),
            is_folder,
            extension: extension.map(str::to_string),
            metadata: FileMetadata::default(),
            metadata_valid: true,
            filesystem_path: None,
        }
    }

    #[test]
    fn keys_group_by_kind() {
        assert_eq!(icon_key(&snapshot("docs", true, None)), "folder");
        assert_eq!(icon_key(&snapshot("a.txt", false, Some("txt"))), "ext:txt");
        assert_eq!(icon_key(&snapshot("Makefile", false, None)), "file");
    }

    #[test]
    fn cache_hands_out_shared_refs() {
        let mut cache = IconCache::default();
        let icon = placeholder_icon(false, ICON_SIZE);
        cache.insert("file".to_string(), icon.clone());
        assert_eq!(cache.get("file"), Some(icon));
        assert!(cache.get("folder").is_none());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn placeholder_extractor_needs_the_item() {
        let ns = Arc::new(InMemoryNamespace::new());
        ns.add_folder(&ItemIdList::parse("/docs"));
        let extractor = PlaceholderIconExtractor::new(ns);

        let icon = extractor.extract(&ItemIdList::parse("/docs"), ICON_SIZE).unwrap();
        assert_eq!(icon.dimensions(), (ICON_SIZE, ICON_SIZE));
        assert!(matches!(
            extractor.extract(&ItemIdList::parse("/missing"), ICON_SIZE),
            Err(ExtractionError::Shell(ShellError::NotFound(_)))
        ));
    }
}
