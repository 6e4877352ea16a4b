use std::path::{Path, PathBuf};

use thiserror::Error;

/// Label shown for a folder that has no usable last path component.
pub const FALLBACK_FOLDER_LABEL: &str = "Folder";

/// A single file tracked by the open file set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    /// Whether this entry is the one currently shown in the editor.
    pub active: bool,
    /// Loaded text, `None` until fetched from the file store.
    pub content: Option<String>,
    /// Whether `content` differs from the last persisted value.
    pub dirty: bool,
    /// Location of the file; unique within one open file set.
    pub path: PathBuf,
}

impl FileEntry {
    /// Builds an entry for a listed file whose content is not fetched yet.
    pub(crate) fn unloaded(path: PathBuf) -> Self {
        Self {
            active: false,
            content: None,
            dirty: false,
            path,
        }
    }

    /// Builds the active, empty entry for a freshly created file.
    pub(crate) fn created(path: PathBuf) -> Self {
        Self {
            active: true,
            content: Some(String::new()),
            dirty: false,
            path,
        }
    }

    /// Returns whether the content has been fetched or edited in memory.
    pub fn is_loaded(&self) -> bool {
        self.content.is_some()
    }

    /// Returns the last path component used as the file list label.
    pub fn display_name(&self) -> String {
        display_name(&self.path)
    }
}

/// Rejection reasons for a user-provided base name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FileNameError {
    #[error("file name cannot be empty")]
    Empty,
    #[error("`{name}` is not a valid file name")]
    Invalid { name: String },
}

/// Returns the last component of `path`, or the whole path when it has none.
pub fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().to_string(),
        |name| name.to_string_lossy().to_string(),
    )
}

/// Returns the label used for the folder header of the file list.
pub fn folder_label(folder: Option<&Path>) -> String {
    folder
        .and_then(Path::file_name)
        .map_or_else(
            || FALLBACK_FOLDER_LABEL.to_string(),
            |name| name.to_string_lossy().to_string(),
        )
}

/// Returns the text after the last `.` of the file name.
///
/// Names whose only dot is the leading one (`.env`) have no extension.
pub fn file_extension(path: &Path) -> Option<&str> {
    let file_name = path.file_name()?.to_str()?;
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }

    Some(extension)
}

/// Builds the path produced by renaming `path` to `new_base_name`.
///
/// The folder and the original extension are kept; only the base name
/// changes.
///
/// # Errors
/// Returns an error when the trimmed base name is empty, is `.`/`..`, or
/// contains a path separator.
pub fn renamed_path(path: &Path, new_base_name: &str) -> Result<PathBuf, FileNameError> {
    let base_name = new_base_name.trim();
    if base_name.is_empty() {
        return Err(FileNameError::Empty);
    }
    if matches!(base_name, "." | "..") || base_name.contains(std::path::is_separator) {
        return Err(FileNameError::Invalid {
            name: base_name.to_string(),
        });
    }

    let file_name = match file_extension(path) {
        Some(extension) => format!("{base_name}.{extension}"),
        None => base_name.to_string(),
    };

    Ok(path
        .parent()
        .map_or_else(|| PathBuf::from(&file_name), |folder| folder.join(&file_name)))
}
