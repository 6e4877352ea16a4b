use std::ffi::OsStr;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use thiserror::Error;

/// Suffix of the sibling files used for atomic writes; never listed.
const TEMP_FILE_SUFFIX: &str = ".ctrlq-tmp";
/// Base name prefix for files allocated by [`FileStore::create`].
const UNTITLED_PREFIX: &str = "untitled-";
/// Extension for files allocated by [`FileStore::create`].
const UNTITLED_EXTENSION: &str = "md";
/// Upper bound on probed `untitled-N` names before giving up.
const MAX_UNTITLED_INDEX: u32 = 10_000;

/// Boxed async result used by [`FileStore`] trait methods.
pub type StoreFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Failures reported by a [`FileStore`].
#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("`{}` already exists", path.display())]
    AlreadyExists { path: PathBuf },
    #[error("i/o failure on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("`{}` was not found", path.display())]
    NotFound { path: PathBuf },
}

impl FileStoreError {
    /// Classifies an I/O error raised while operating on `path`.
    pub(crate) fn from_io(path: PathBuf, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { path, source },
        }
    }

    /// Returns whether the targeted path did not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Async boundary over one folder of plain-text files.
///
/// Production uses [`RealFileStore`], while tests can inject
/// `MockFileStore` to script results and ordering.
#[cfg_attr(test, mockall::automock)]
pub trait FileStore: Send + Sync {
    /// Lists the regular files of `folder`, sorted by file name.
    ///
    /// # Errors
    /// Returns an error when the folder cannot be read.
    fn list(&self, folder: PathBuf) -> StoreFuture<Result<Vec<PathBuf>, FileStoreError>>;

    /// Reads the full text of `path`.
    ///
    /// # Errors
    /// Returns [`FileStoreError::NotFound`] when the file no longer exists.
    fn read(&self, path: PathBuf) -> StoreFuture<Result<String, FileStoreError>>;

    /// Replaces the content of `path` with `content`.
    ///
    /// Readers never observe partially written content.
    ///
    /// # Errors
    /// Returns an error on permission or disk failures.
    fn write(&self, path: PathBuf, content: String) -> StoreFuture<Result<(), FileStoreError>>;

    /// Creates a new empty, uniquely named file inside `folder`.
    ///
    /// # Errors
    /// Returns an error when no file can be created in the folder.
    fn create(&self, folder: PathBuf) -> StoreFuture<Result<PathBuf, FileStoreError>>;

    /// Deletes `path`.
    ///
    /// # Errors
    /// Returns [`FileStoreError::NotFound`] when the file is already gone.
    fn delete(&self, path: PathBuf) -> StoreFuture<Result<(), FileStoreError>>;

    /// Moves `old_path` to `new_path`.
    ///
    /// # Errors
    /// Returns [`FileStoreError::AlreadyExists`] when `new_path` is occupied
    /// and [`FileStoreError::NotFound`] when `old_path` is missing.
    fn rename(
        &self,
        old_path: PathBuf,
        new_path: PathBuf,
    ) -> StoreFuture<Result<(), FileStoreError>>;
}

/// Production [`FileStore`] backed by `tokio::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RealFileStore;

impl FileStore for RealFileStore {
    fn list(&self, folder: PathBuf) -> StoreFuture<Result<Vec<PathBuf>, FileStoreError>> {
        Box::pin(list_files(folder))
    }

    fn read(&self, path: PathBuf) -> StoreFuture<Result<String, FileStoreError>> {
        Box::pin(async move {
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|error| FileStoreError::from_io(path, error))
        })
    }

    fn write(&self, path: PathBuf, content: String) -> StoreFuture<Result<(), FileStoreError>> {
        Box::pin(async move {
            write_atomic(&path, content.as_bytes())
                .await
                .map_err(|error| FileStoreError::from_io(path, error))
        })
    }

    fn create(&self, folder: PathBuf) -> StoreFuture<Result<PathBuf, FileStoreError>> {
        Box::pin(create_untitled_file(folder))
    }

    fn delete(&self, path: PathBuf) -> StoreFuture<Result<(), FileStoreError>> {
        Box::pin(async move {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|error| FileStoreError::from_io(path, error))
        })
    }

    fn rename(
        &self,
        old_path: PathBuf,
        new_path: PathBuf,
    ) -> StoreFuture<Result<(), FileStoreError>> {
        Box::pin(async move {
            let is_occupied = tokio::fs::try_exists(&new_path)
                .await
                .map_err(|error| FileStoreError::from_io(new_path.clone(), error))?;
            if is_occupied {
                return Err(FileStoreError::AlreadyExists { path: new_path });
            }

            tokio::fs::rename(&old_path, &new_path)
                .await
                .map_err(|error| FileStoreError::from_io(old_path, error))
        })
    }
}

/// Writes `contents` to a sibling temp file and moves it over `path`.
///
/// The temp file is removed when any step fails, so `path` either keeps its
/// previous content or holds the complete new content.
///
/// # Errors
/// Returns an error when the temp file cannot be written or moved.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let temp_name = format!(
        ".{}.{}{TEMP_FILE_SUFFIX}",
        file_name.to_string_lossy(),
        uuid::Uuid::new_v4().simple()
    );
    let temp_path = path.with_file_name(temp_name);

    let result = match tokio::fs::write(&temp_path, contents).await {
        Ok(()) => tokio::fs::rename(&temp_path, path).await,
        Err(error) => Err(error),
    };
    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp_path).await;
    }

    result
}

async fn list_files(folder: PathBuf) -> Result<Vec<PathBuf>, FileStoreError> {
    let mut read_dir = tokio::fs::read_dir(&folder)
        .await
        .map_err(|error| FileStoreError::from_io(folder.clone(), error))?;

    let mut paths = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|error| FileStoreError::from_io(folder.clone(), error))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|error| FileStoreError::from_io(entry.path(), error))?;
        if !file_type.is_file() || is_temp_file(&entry.file_name()) {
            continue;
        }

        paths.push(entry.path());
    }
    paths.sort();

    Ok(paths)
}

async fn create_untitled_file(folder: PathBuf) -> Result<PathBuf, FileStoreError> {
    for index in 1..=MAX_UNTITLED_INDEX {
        let path = folder.join(format!("{UNTITLED_PREFIX}{index}.{UNTITLED_EXTENSION}"));
        let created = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;

        match created {
            Ok(_) => return Ok(path),
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(FileStoreError::from_io(path, error)),
        }
    }

    Err(FileStoreError::Io {
        path: folder,
        source: io::Error::other("no free untitled file name"),
    })
}

fn is_temp_file(file_name: &OsStr) -> bool {
    file_name.to_string_lossy().ends_with(TEMP_FILE_SUFFIX)
}
