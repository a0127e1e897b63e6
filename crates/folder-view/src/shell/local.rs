//! Local file system namespace.

use super::{FileAttributes, FileMetadata, ItemIdList, RawChild, ShellError, ShellNamespace};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// A namespace backed by the local file system.
///
/// Identities map one-to-one onto absolute paths. Dotfiles are reported as hidden.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalNamespace;

impl LocalNamespace {
    pub fn new() -> Self {
        Self
    }
}

fn is_dotfile(name: &str) -> bool {
    name.starts_with('.')
}

/// Converts std metadata into the model's metadata record.
fn metadata_from_std(meta: &fs::Metadata, hidden: bool, is_directory: bool) -> FileMetadata {
    let mut attributes = FileAttributes::empty();
    if is_directory {
        attributes |= FileAttributes::DIRECTORY;
    }
    if meta.file_type().is_symlink() {
        attributes |= FileAttributes::SYMLINK;
    }
    if meta.permissions().readonly() {
        attributes |= FileAttributes::READ_ONLY;
    }
    if hidden {
        attributes |= FileAttributes::HIDDEN;
    }

    #[cfg(unix)]
    let owner = {
        use std::os::unix::fs::MetadataExt;
        Some(meta.uid())
    };
    #[cfg(not(unix))]
    let owner = None;

    FileMetadata {
        size: if is_directory { 0 } else { meta.len() },
        attributes,
        created: meta.created().ok().map(DateTime::<Utc>::from),
        modified: meta.modified().ok().map(DateTime::<Utc>::from),
        accessed: meta.accessed().ok().map(DateTime::<Utc>::from),
        owner,
    }
}

/// Symlinks count as folders when their target is one.
fn resolves_to_directory(path: &Path, meta: &fs::Metadata) -> bool {
    if meta.file_type().is_symlink() {
        fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    } else {
        meta.is_dir()
    }
}

fn raw_child(id: ItemIdList, name: String, attributes: FileAttributes, metadata: Option<FileMetadata>) -> RawChild {
    RawChild {
        id,
        display_name: name.clone(),
        parsing_name: name,
        attributes,
        metadata,
        drive: None,
    }
}

impl ShellNamespace for LocalNamespace {
    fn enumerate_children(&self, folder: &ItemIdList, show_hidden: bool) -> Result<Vec<RawChild>, ShellError> {
        let path = folder.to_path();
        let mut children = Vec::new();

        for entry in fs::read_dir(&path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let hidden = is_dotfile(&name);
            // Skip before stat-ing so hidden entries cost nothing
            if hidden && !show_hidden {
                continue;
            }

            let child_path = entry.path();
            // `DirEntry::metadata` is the cheap path (often served from the readdir buffer)
            let metadata = match entry.metadata() {
                Ok(meta) => {
                    let is_directory = resolves_to_directory(&child_path, &meta);
                    Some(metadata_from_std(&meta, hidden, is_directory))
                }
                Err(e) => {
                    log::debug!("LocalNamespace: no fast metadata for {}: {}", child_path.display(), e);
                    None
                }
            };

            let mut attributes = metadata.as_ref().map(|m| m.attributes).unwrap_or_default();
            if metadata.is_none() {
                if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                    attributes |= FileAttributes::DIRECTORY;
                }
                if hidden {
                    attributes |= FileAttributes::HIDDEN;
                }
            }

            children.push(raw_child(ItemIdList::from_path(&child_path), name, attributes, metadata));
        }

        Ok(children)
    }

    fn get_metadata(&self, item: &ItemIdList) -> Result<FileMetadata, ShellError> {
        let path = item.to_path();
        let meta = fs::metadata(&path)?;
        let hidden = item.child_id().map(|c| is_dotfile(c.as_str())).unwrap_or(false);
        Ok(metadata_from_std(&meta, hidden, meta.is_dir()))
    }

    fn describe(&self, item: &ItemIdList) -> Result<RawChild, ShellError> {
        let path = item.to_path();
        let meta = fs::symlink_metadata(&path)?;
        let name = item
            .child_id()
            .map(|c| c.as_str().to_string())
            .ok_or_else(|| ShellError::NotFound(path.display().to_string()))?;
        let hidden = is_dotfile(&name);
        let metadata = metadata_from_std(&meta, hidden, resolves_to_directory(&path, &meta));
        Ok(raw_child(item.clone(), name, metadata.attributes, Some(metadata)))
    }

    fn filesystem_path(&self, item: &ItemIdList) -> Option<PathBuf> {
        Some(item.to_path())
    }
}
