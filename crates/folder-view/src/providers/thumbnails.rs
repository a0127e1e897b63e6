//! Thumbnail extraction for the thumbnails view.

use super::icons::{ExtractionError, IconExtractor, IconRef, placeholder_icon};
use crate::shell::{FileAttributes, ItemIdList, ShellNamespace};
use std::sync::Arc;

/// Edge length of thumbnails in pixels.
pub const THUMBNAIL_SIZE: u32 = 120;

/// Decodes image files with the `image` crate and scales them down. Items that aren't
/// decodable images get a placeholder.
pub struct ImageThumbnailExtractor {
    namespace: Arc<dyn ShellNamespace>,
}

impl ImageThumbnailExtractor {
    pub fn new(namespace: Arc<dyn ShellNamespace>) -> Self {
        Self { namespace }
    }
}

impl IconExtractor for ImageThumbnailExtractor {
    fn extract(&self, item: &ItemIdList, size: u32) -> Result<IconRef, ExtractionError> {
        let described = self.namespace.describe(item)?;
        if described.attributes.contains(FileAttributes::DIRECTORY) {
            return Ok(placeholder_icon(true, size));
        }

        let Some(path) = self.namespace.filesystem_path(item) else {
            return Ok(placeholder_icon(false, size));
        };

        // Anything the image crate doesn't recognize by extension is just a file
        if image::ImageFormat::from_path(&path).is_err() {
            return Ok(placeholder_icon(false, size));
        }

        let decoded = image::open(&path).map_err(|e| ExtractionError::Decode {
            item: item.to_string(),
            message: e.to_string(),
        })?;
        Ok(IconRef::new(decoded.thumbnail(size, size).to_rgba8()))
    }
}
