//! In-memory working set of the files opened from one folder.
//!
//! [`OpenFileSet`] owns every state transition of a [`FileEntry`]: listing,
//! creation, activation, edits, saves, renames and removal. All transitions are
//! synchronous; the async file store round trips live in the app layer.
//!
//! The set upholds these invariants after every call:
//! - at most one entry is active,
//! - paths are unique,
//! - a dirty entry always has loaded content,
//! - switching the active entry never drops dirty content.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::file::FileEntry;

/// Rejected open file set transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpenFileSetError {
    #[error("`{}` is already open", path.display())]
    Conflict { path: PathBuf },
    #[error("`{}` is not the active file", path.display())]
    NotActive { path: PathBuf },
    #[error("`{}` is not open", path.display())]
    UnknownPath { path: PathBuf },
}

/// Ordered collection of open files with at most one active entry.
#[derive(Debug, Default)]
pub struct OpenFileSet {
    entries: Vec<FileEntry>,
    revision: u64,
}

impl OpenFileSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the set with one unloaded, inactive entry per listed path.
    ///
    /// Repeated paths keep their first position.
    pub fn load(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        let mut entries: Vec<FileEntry> = Vec::new();
        for path in paths {
            if entries.iter().any(|entry| entry.path == path) {
                continue;
            }
            entries.push(FileEntry::unloaded(path));
        }

        self.entries = entries;
        self.touch();
    }

    /// Appends the empty entry of a newly created file and makes it active.
    ///
    /// # Errors
    /// Returns [`OpenFileSetError::Conflict`] when `path` is already open.
    pub fn add_created(&mut self, path: PathBuf) -> Result<(), OpenFileSetError> {
        if self.contains(&path) {
            return Err(OpenFileSetError::Conflict { path });
        }

        self.deactivate_current();
        self.entries.push(FileEntry::created(path));
        self.touch();

        Ok(())
    }

    /// Makes `path` the active entry.
    ///
    /// The previously active entry keeps dirty content; clean content is
    /// released since it can be read again. Unknown paths are ignored.
    pub fn activate(&mut self, path: &Path) {
        let Some(index) = self.position(path) else {
            return;
        };
        if self.entries[index].active {
            return;
        }

        self.deactivate_current();
        self.entries[index].active = true;
        self.touch();
    }

    /// Stores content fetched from the file store without marking it dirty.
    ///
    /// Content is only stored while the entry exists and has none yet, so a
    /// late read never overwrites in-memory edits. Returns whether the content
    /// was stored.
    pub fn store_loaded(&mut self, path: &Path, content: String) -> bool {
        let Some(entry) = self.entry_mut(path) else {
            return false;
        };
        if entry.content.is_some() {
            return false;
        }

        entry.content = Some(content);
        self.touch();

        true
    }

    /// Replaces the content of the active entry and marks it dirty.
    ///
    /// # Errors
    /// Returns an error when `path` is not open or is not the active entry.
    pub fn set_content(&mut self, path: &Path, content: String) -> Result<(), OpenFileSetError> {
        let entry = self
            .entry_mut(path)
            .ok_or_else(|| OpenFileSetError::UnknownPath {
                path: path.to_path_buf(),
            })?;
        if !entry.active {
            return Err(OpenFileSetError::NotActive {
                path: path.to_path_buf(),
            });
        }

        entry.content = Some(content);
        entry.dirty = true;
        self.touch();

        Ok(())
    }

    /// Marks `path` as persisted. Unknown or clean entries are left as is.
    pub fn mark_saved(&mut self, path: &Path) {
        let Some(entry) = self.entry_mut(path) else {
            return;
        };
        if !entry.dirty {
            return;
        }

        entry.dirty = false;
        self.touch();
    }

    /// Removes `path` from the set.
    ///
    /// Removing the active entry leaves no entry active.
    pub fn remove(&mut self, path: &Path) -> Option<FileEntry> {
        let index = self.position(path)?;
        let entry = self.entries.remove(index);
        self.touch();

        Some(entry)
    }

    /// Moves the entry at `path` to `new_path`, keeping content and flags.
    ///
    /// # Errors
    /// Returns [`OpenFileSetError::UnknownPath`] when `path` is not open and
    /// [`OpenFileSetError::Conflict`] when `new_path` is already open.
    pub fn rename(&mut self, path: &Path, new_path: PathBuf) -> Result<(), OpenFileSetError> {
        let index = self
            .position(path)
            .ok_or_else(|| OpenFileSetError::UnknownPath {
                path: path.to_path_buf(),
            })?;
        if path == new_path {
            return Ok(());
        }
        if self.contains(&new_path) {
            return Err(OpenFileSetError::Conflict { path: new_path });
        }

        self.entries[index].path = new_path;
        self.touch();

        Ok(())
    }

    /// Returns all entries in insertion order.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Returns the entry for `path`, when open.
    pub fn get(&self, path: &Path) -> Option<&FileEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    /// Returns the active entry, when any.
    pub fn active(&self) -> Option<&FileEntry> {
        self.entries.iter().find(|entry| entry.active)
    }

    /// Returns whether `path` is open.
    pub fn contains(&self, path: &Path) -> bool {
        self.position(path).is_some()
    }

    /// Returns the paths of entries with unsaved changes, in display order.
    pub fn dirty_paths(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter(|entry| entry.dirty)
            .map(|entry| entry.path.clone())
            .collect()
    }

    /// Returns a counter that increases on every state change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn position(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|entry| entry.path == path)
    }

    fn entry_mut(&mut self, path: &Path) -> Option<&mut FileEntry> {
        self.entries.iter_mut().find(|entry| entry.path == path)
    }

    fn deactivate_current(&mut self) {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.active) else {
            return;
        };

        entry.active = false;
        if !entry.dirty {
            entry.content = None;
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
