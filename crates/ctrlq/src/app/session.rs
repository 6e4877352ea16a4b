//! Edit session orchestration between user intents, the open file set and the
//! file store.
//!
//! Each intent runs its synchronous part (validation, content snapshot and
//! queue submission) when called and returns an [`EditFuture`] that waits for
//! the file store and reconciles the result. Results whose target entry was
//! removed or renamed in the meantime are dropped silently.

use std::future::{Future, ready};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info};

use crate::app::service::AppServices;
use crate::domain::config::{AppConfig, ConfigUpdate};
use crate::domain::file::{FileEntry, FileNameError, renamed_path};
use crate::domain::open_file_set::{OpenFileSet, OpenFileSetError};
use crate::infra::file_store::{FileStore, FileStoreError};

/// Boxed async result returned by [`EditSession`] intents.
pub type EditFuture<T> = Pin<Box<dyn Future<Output = Result<T, EditError>> + Send>>;

/// Failures surfaced by [`EditSession`] intents.
#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    FileSet(#[from] OpenFileSetError),
    #[error(transparent)]
    InvalidName(#[from] FileNameError),
    #[error("no file is active")]
    NoActiveFile,
    #[error("no default folder is configured")]
    NoDefaultFolder,
    #[error(transparent)]
    Store(#[from] FileStoreError),
    #[error("unsaved changes in {}", display_paths(paths))]
    UnsavedChanges { paths: Vec<PathBuf> },
    #[error("file worker for `{}` stopped before finishing", path.display())]
    WorkerUnavailable { path: PathBuf },
}

/// Shared mutable state reconciled by in-flight intents.
struct SessionState {
    changes: watch::Sender<u64>,
    files: Mutex<OpenFileSet>,
    /// Sequence of the latest request that activates an entry.
    latest_activation: AtomicU64,
}

impl SessionState {
    /// Applies `mutate` and notifies subscribers when the set changed.
    fn update<R>(&self, mutate: impl FnOnce(&mut OpenFileSet) -> R) -> R {
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        let revision = files.revision();
        let result = mutate(&mut files);
        let next_revision = files.revision();
        drop(files);

        if next_revision != revision {
            self.changes.send_replace(next_revision);
        }

        result
    }

    fn read<R>(&self, inspect: impl FnOnce(&OpenFileSet) -> R) -> R {
        let files = self.files.lock().unwrap_or_else(PoisonError::into_inner);

        inspect(&files)
    }

    /// Starts a new activation request, superseding earlier ones.
    fn next_activation(&self) -> u64 {
        self.latest_activation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest_activation(&self, activation: u64) -> bool {
        self.latest_activation.load(Ordering::SeqCst) == activation
    }
}

/// Outcome of validating a rename against the current set.
enum RenamePlan {
    /// The new name resolves to the current path.
    Unchanged,
    /// The file moves; dirty content is written to the old path first.
    Move { pending_content: Option<String> },
}

/// Controller turning user intents into open file set transitions and file
/// store calls.
pub struct EditSession {
    config: Mutex<AppConfig>,
    services: AppServices,
    state: Arc<SessionState>,
}

impl EditSession {
    /// Creates an empty session using `file_store` and the injected `config`.
    pub fn new(file_store: Arc<dyn FileStore>, config: AppConfig) -> Self {
        let files = OpenFileSet::new();
        let (changes, _) = watch::channel(files.revision());

        Self {
            config: Mutex::new(config),
            services: AppServices::new(file_store),
            state: Arc::new(SessionState {
                changes,
                files: Mutex::new(files),
                latest_activation: AtomicU64::new(0),
            }),
        }
    }

    /// Returns a snapshot of the current configuration.
    pub fn config(&self) -> AppConfig {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `update` to the in-memory configuration and returns the result.
    ///
    /// Persisting the configuration is left to the caller.
    pub fn update_config(&self, update: ConfigUpdate) -> AppConfig {
        let mut config = self.config.lock().unwrap_or_else(PoisonError::into_inner);
        *config = config.merged(update);

        config.clone()
    }

    /// Subscribes to open file set changes.
    ///
    /// The receiver yields the set revision after every mutation; dropping it
    /// unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.state.changes.subscribe()
    }

    /// Returns a snapshot of all entries in display order.
    pub fn entries(&self) -> Vec<FileEntry> {
        self.state.read(|files| files.entries().to_vec())
    }

    /// Returns a snapshot of the active entry.
    pub fn active(&self) -> Option<FileEntry> {
        self.state.read(|files| files.active().cloned())
    }

    /// Replaces the open file set with the listed `paths`.
    pub fn load(&self, paths: Vec<PathBuf>) {
        self.state.update(|files| files.load(paths));
    }

    /// Lists the configured default folder and loads its files.
    pub fn open_default_folder(&self) -> EditFuture<usize> {
        let Some(folder) = self.config().default_folder().map(Path::to_path_buf) else {
            return Box::pin(ready(Err(EditError::NoDefaultFolder)));
        };

        self.open_folder(folder)
    }

    /// Lists `folder` and replaces the open file set with its files.
    ///
    /// Refuses with [`EditError::UnsavedChanges`] while any entry is dirty,
    /// checked both before listing and before replacing the set. Resolves to
    /// the number of listed files.
    pub fn open_folder(&self, folder: PathBuf) -> EditFuture<usize> {
        let dirty_paths = self.state.read(OpenFileSet::dirty_paths);
        if !dirty_paths.is_empty() {
            return Box::pin(ready(Err(EditError::UnsavedChanges { paths: dirty_paths })));
        }

        let file_store = self.services.file_store();
        let list_folder = folder.clone();
        let result_rx = self
            .services
            .path_queue()
            .submit(&folder, move || file_store.list(list_folder));
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            let paths = store_result(result_rx, &folder).await?;
            let file_count = paths.len();
            state.update(|files| -> Result<(), EditError> {
                let dirty_paths = files.dirty_paths();
                if !dirty_paths.is_empty() {
                    return Err(EditError::UnsavedChanges { paths: dirty_paths });
                }
                files.load(paths);

                Ok(())
            })?;
            info!(folder = %folder.display(), file_count, "opened folder");

            Ok(file_count)
        })
    }

    /// Activates `path`, reading its content first when not loaded yet.
    ///
    /// Only the latest activation request wins: a read that finishes after a
    /// newer click or create is dropped.
    pub fn on_file_clicked(&self, path: PathBuf) -> EditFuture<()> {
        let is_loaded = self
            .state
            .read(|files| files.get(&path).map(FileEntry::is_loaded));
        let Some(is_loaded) = is_loaded else {
            return Box::pin(ready(Err(OpenFileSetError::UnknownPath { path }.into())));
        };

        let activation = self.state.next_activation();
        if is_loaded {
            self.state.update(|files| files.activate(&path));

            return Box::pin(ready(Ok(())));
        }

        let file_store = self.services.file_store();
        let read_path = path.clone();
        let result_rx = self
            .services
            .path_queue()
            .submit(&path, move || file_store.read(read_path));
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            let content = store_result(result_rx, &path).await?;
            let is_applied = state.update(|files| {
                if !files.contains(&path) || !state.is_latest_activation(activation) {
                    return false;
                }
                files.store_loaded(&path, content);
                files.activate(&path);

                true
            });
            if !is_applied {
                debug!(path = %path.display(), "dropped superseded or closed read");
            }

            Ok(())
        })
    }

    /// Replaces the content of the active entry and marks it dirty.
    ///
    /// # Errors
    /// Returns [`EditError::NoActiveFile`] when no entry is active.
    pub fn on_text_changed(&self, text: String) -> Result<(), EditError> {
        self.state.update(|files| -> Result<(), EditError> {
            let path = files
                .active()
                .map(|entry| entry.path.clone())
                .ok_or(EditError::NoActiveFile)?;
            files.set_content(&path, text)?;

            Ok(())
        })
    }

    /// Writes the active entry when dirty.
    ///
    /// Resolves to `true` when a write happened. The entry is marked clean
    /// only if its content still equals the written snapshot.
    pub fn on_save_requested(&self) -> EditFuture<bool> {
        let snapshot = self.state.read(|files| -> Result<_, EditError> {
            let entry = files.active().ok_or(EditError::NoActiveFile)?;

            Ok(entry
                .dirty
                .then(|| (entry.path.clone(), entry.content.clone().unwrap_or_default())))
        });
        let (path, content) = match snapshot {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Box::pin(ready(Ok(false))),
            Err(error) => return Box::pin(ready(Err(error))),
        };

        let file_store = self.services.file_store();
        let write_path = path.clone();
        let written = content.clone();
        let result_rx = self
            .services
            .path_queue()
            .submit(&path, move || file_store.write(write_path, written));
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            store_result(result_rx, &path).await?;
            state.update(|files| mark_saved_if_unchanged(files, &path, &content));
            info!(path = %path.display(), "saved file");

            Ok(true)
        })
    }

    /// Creates a new file in `folder` and makes it the active entry.
    ///
    /// Resolves to the created path.
    pub fn on_create_requested(&self, folder: PathBuf) -> EditFuture<PathBuf> {
        self.state.next_activation();
        let file_store = self.services.file_store();
        let create_folder = folder.clone();
        let result_rx = self
            .services
            .path_queue()
            .submit(&folder, move || file_store.create(create_folder));
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            let path = store_result(result_rx, &folder).await?;
            state.update(|files| files.add_created(path.clone()))?;
            info!(path = %path.display(), "created file");

            Ok(path)
        })
    }

    /// Deletes `path` and removes its entry.
    ///
    /// A file that is already gone counts as deleted.
    pub fn on_delete_requested(&self, path: PathBuf) -> EditFuture<()> {
        let file_store = self.services.file_store();
        let delete_path = path.clone();
        let result_rx = self
            .services
            .path_queue()
            .submit(&path, move || file_store.delete(delete_path));
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            match store_result(result_rx, &path).await {
                Ok(()) => {}
                Err(EditError::Store(error)) if error.is_not_found() => {
                    debug!(path = %path.display(), "file was already deleted");
                }
                Err(error) => return Err(error),
            }
            state.update(|files| files.remove(&path));
            info!(path = %path.display(), "deleted file");

            Ok(())
        })
    }

    /// Renames `path` to `new_base_name`, keeping its folder and extension.
    ///
    /// Dirty content is written to the old path before the file moves; a
    /// failed write aborts the rename. Resolves to the new path.
    pub fn on_rename_requested(&self, path: PathBuf, new_base_name: &str) -> EditFuture<PathBuf> {
        let new_path = match renamed_path(&path, new_base_name) {
            Ok(new_path) => new_path,
            Err(error) => return Box::pin(ready(Err(error.into()))),
        };
        let plan = self.state.read(|files| -> Result<RenamePlan, OpenFileSetError> {
            let entry = files
                .get(&path)
                .ok_or_else(|| OpenFileSetError::UnknownPath { path: path.clone() })?;
            if new_path == path {
                return Ok(RenamePlan::Unchanged);
            }
            if files.contains(&new_path) {
                return Err(OpenFileSetError::Conflict {
                    path: new_path.clone(),
                });
            }

            Ok(RenamePlan::Move {
                pending_content: entry
                    .dirty
                    .then(|| entry.content.clone().unwrap_or_default()),
            })
        });
        let pending_content = match plan {
            Ok(RenamePlan::Move { pending_content }) => pending_content,
            Ok(RenamePlan::Unchanged) => return Box::pin(ready(Ok(path))),
            Err(error) => return Box::pin(ready(Err(error.into()))),
        };

        let file_store = self.services.file_store();
        let old_path = path.clone();
        let target_path = new_path.clone();
        let written = pending_content.clone();
        let result_rx = self.services.path_queue().submit(&path, move || async move {
            if let Some(content) = written {
                file_store.write(old_path.clone(), content).await?;
            }

            file_store.rename(old_path, target_path).await
        });
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            store_result(result_rx, &path).await?;
            state.update(|files| -> Result<(), EditError> {
                if !files.contains(&path) {
                    debug!(path = %path.display(), "dropped rename for closed file");
                    return Ok(());
                }
                files.rename(&path, new_path.clone())?;
                if let Some(content) = &pending_content {
                    mark_saved_if_unchanged(files, &new_path, content);
                }

                Ok(())
            })?;
            info!(from = %path.display(), to = %new_path.display(), "renamed file");

            Ok(new_path)
        })
    }
}

/// Waits for a queued store operation and lifts its error into [`EditError`].
async fn store_result<T>(
    result_rx: oneshot::Receiver<Result<T, FileStoreError>>,
    path: &Path,
) -> Result<T, EditError> {
    let result = result_rx.await.map_err(|_| EditError::WorkerUnavailable {
        path: path.to_path_buf(),
    })?;

    Ok(result?)
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("`{}`", path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Marks `path` clean when its content is still the persisted `content`.
fn mark_saved_if_unchanged(files: &mut OpenFileSet, path: &Path, content: &str) {
    let is_unchanged = files
        .get(path)
        .and_then(|entry| entry.content.as_deref())
        .is_some_and(|current| current == content);
    if is_unchanged {
        files.mark_saved(path);
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::Duration;

    use mockall::Sequence;
    use mockall::predicate::eq;

    use super::*;
    use crate::infra::file_store::MockFileStore;

    fn session_with(mock: MockFileStore) -> EditSession {
        EditSession::new(Arc::new(mock), AppConfig::default())
    }

    fn loaded_session(mock: MockFileStore, paths: &[&str]) -> EditSession {
        let session = session_with(mock);
        session.load(paths.iter().map(PathBuf::from).collect());

        session
    }

    fn entry(session: &EditSession, path: &str) -> FileEntry {
        session
            .entries()
            .into_iter()
            .find(|entry| entry.path == Path::new(path))
            .expect("missing entry")
    }

    fn expect_read(mock: &mut MockFileStore, path: &'static str, content: &'static str) {
        mock.expect_read()
            .with(eq(PathBuf::from(path)))
            .times(1)
            .returning(move |_| Box::pin(async move { Ok(content.to_string()) }));
    }

    #[tokio::test]
    async fn test_file_click_reads_then_activates() {
        // Arrange
        let mut mock = MockFileStore::new();
        expect_read(&mut mock, "/f/a.md", "hello");
        let session = loaded_session(mock, &["/f/a.md", "/f/b.md"]);

        // Act
        session
            .on_file_clicked(PathBuf::from("/f/a.md"))
            .await
            .expect("failed to open file");

        // Assert
        let clicked = entry(&session, "/f/a.md");
        assert_eq!(clicked.content.as_deref(), Some("hello"));
        assert!(clicked.active);
        assert!(!clicked.dirty);
        assert!(entry(&session, "/f/b.md").content.is_none());
    }

    #[tokio::test]
    async fn test_file_click_read_failure_leaves_state_unchanged() {
        // Arrange
        let mut mock = MockFileStore::new();
        mock.expect_read().times(1).returning(|path| {
            Box::pin(async move { Err(FileStoreError::NotFound { path }) })
        });
        let session = loaded_session(mock, &["/f/a.md"]);

        // Act
        let result = session.on_file_clicked(PathBuf::from("/f/a.md")).await;

        // Assert
        assert!(matches!(result, Err(EditError::Store(FileStoreError::NotFound { .. }))));
        assert!(session.active().is_none());
        assert!(entry(&session, "/f/a.md").content.is_none());
    }

    #[tokio::test]
    async fn test_file_click_on_loaded_entry_skips_read() {
        // Arrange
        let created_count = Arc::new(Mutex::new(0));
        let mut mock = MockFileStore::new();
        mock.expect_read().never();
        mock.expect_create().times(2).returning(move |folder| {
            let mut created_count = created_count.lock().expect("failed to lock count");
            *created_count += 1;
            let path = folder.join(format!("untitled-{created_count}.md"));

            Box::pin(async move { Ok(path) })
        });
        let session = session_with(mock);
        session
            .on_create_requested(PathBuf::from("/f"))
            .await
            .expect("failed to create file");
        session
            .on_text_changed("draft".to_string())
            .expect("failed to edit");
        session
            .on_create_requested(PathBuf::from("/f"))
            .await
            .expect("failed to create file");

        // Act
        let result = session
            .on_file_clicked(PathBuf::from("/f/untitled-1.md"))
            .await;

        // Assert
        assert!(result.is_ok());
        let reopened = session.active().expect("missing active entry");
        assert_eq!(reopened.path, PathBuf::from("/f/untitled-1.md"));
        assert_eq!(reopened.content.as_deref(), Some("draft"));
        assert!(reopened.dirty);
    }

    #[tokio::test]
    async fn test_text_change_without_active_file_fails() {
        // Arrange
        let session = loaded_session(MockFileStore::new(), &["/f/a.md"]);

        // Act
        let result = session.on_text_changed("text".to_string());

        // Assert
        assert!(matches!(result, Err(EditError::NoActiveFile)));
        assert!(!entry(&session, "/f/a.md").dirty);
    }

    #[tokio::test]
    async fn test_edit_then_save_writes_content_and_marks_clean() {
        // Arrange
        let mut mock = MockFileStore::new();
        expect_read(&mut mock, "/f/a.md", "hello");
        mock.expect_write()
            .with(eq(PathBuf::from("/f/a.md")), eq("hello world".to_string()))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        let session = loaded_session(mock, &["/f/a.md"]);
        session
            .on_file_clicked(PathBuf::from("/f/a.md"))
            .await
            .expect("failed to open file");

        // Act
        session
            .on_text_changed("hello world".to_string())
            .expect("failed to edit");
        let is_dirty_before_save = entry(&session, "/f/a.md").dirty;
        let saved = session.on_save_requested().await.expect("failed to save");

        // Assert
        assert!(is_dirty_before_save);
        assert!(saved);
        assert!(!entry(&session, "/f/a.md").dirty);
    }

    #[tokio::test]
    async fn test_second_save_without_edit_does_not_write() {
        // Arrange
        let mut mock = MockFileStore::new();
        expect_read(&mut mock, "/f/a.md", "hello");
        mock.expect_write()
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        let session = loaded_session(mock, &["/f/a.md"]);
        session
            .on_file_clicked(PathBuf::from("/f/a.md"))
            .await
            .expect("failed to open file");
        session
            .on_text_changed("changed".to_string())
            .expect("failed to edit");

        // Act
        let first = session.on_save_requested().await.expect("failed to save");
        let second = session.on_save_requested().await.expect("failed to save");

        // Assert
        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_entry_dirty() {
        // Arrange
        let mut mock = MockFileStore::new();
        expect_read(&mut mock, "/f/a.md", "hello");
        mock.expect_write().times(1).returning(|path, _| {
            Box::pin(async move {
                Err(FileStoreError::Io {
                    path,
                    source: io::Error::from(io::ErrorKind::PermissionDenied),
                })
            })
        });
        let session = loaded_session(mock, &["/f/a.md"]);
        session
            .on_file_clicked(PathBuf::from("/f/a.md"))
            .await
            .expect("failed to open file");
        session
            .on_text_changed("unsaved".to_string())
            .expect("failed to edit");

        // Act
        let result = session.on_save_requested().await;

        // Assert
        assert!(matches!(result, Err(EditError::Store(FileStoreError::Io { .. }))));
        let edited = entry(&session, "/f/a.md");
        assert!(edited.dirty);
        assert_eq!(edited.content.as_deref(), Some("unsaved"));
    }

    #[tokio::test]
    async fn test_queued_saves_persist_in_issue_order() {
        // Arrange
        let writes = Arc::new(Mutex::new(Vec::new()));
        let recorded_writes = Arc::clone(&writes);
        let mut mock = MockFileStore::new();
        expect_read(&mut mock, "/f/a.md", "");
        mock.expect_write().times(2).returning(move |_, content| {
            let recorded_writes = Arc::clone(&recorded_writes);
            Box::pin(async move {
                if content == "one" {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                }
                recorded_writes
                    .lock()
                    .expect("failed to lock writes")
                    .push(content);

                Ok(())
            })
        });
        let session = loaded_session(mock, &["/f/a.md"]);
        session
            .on_file_clicked(PathBuf::from("/f/a.md"))
            .await
            .expect("failed to open file");

        // Act
        session.on_text_changed("one".to_string()).expect("failed to edit");
        let first_save = session.on_save_requested();
        session.on_text_changed("two".to_string()).expect("failed to edit");
        let second_save = session.on_save_requested();
        let (first, second) = tokio::join!(first_save, second_save);

        // Assert
        assert!(first.is_ok_and(|saved| saved));
        assert!(second.is_ok_and(|saved| saved));
        assert_eq!(
            *writes.lock().expect("failed to lock writes"),
            vec!["one".to_string(), "two".to_string()]
        );
        assert!(!entry(&session, "/f/a.md").dirty);
    }

    #[tokio::test]
    async fn test_edit_during_save_keeps_entry_dirty() {
        // Arrange
        let mut mock = MockFileStore::new();
        expect_read(&mut mock, "/f/a.md", "");
        mock.expect_write().times(1).returning(|_, _| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(())
            })
        });
        let session = loaded_session(mock, &["/f/a.md"]);
        session
            .on_file_clicked(PathBuf::from("/f/a.md"))
            .await
            .expect("failed to open file");
        session
            .on_text_changed("first".to_string())
            .expect("failed to edit");

        // Act
        let save = session.on_save_requested();
        session
            .on_text_changed("second".to_string())
            .expect("failed to edit");
        save.await.expect("failed to save");

        // Assert
        let edited = entry(&session, "/f/a.md");
        assert!(edited.dirty);
        assert_eq!(edited.content.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_switching_files_preserves_unsaved_edits() {
        // Arrange
        let mut mock = MockFileStore::new();
        expect_read(&mut mock, "/f/a.md", "a");
        expect_read(&mut mock, "/f/b.md", "b");
        let session = loaded_session(mock, &["/f/a.md", "/f/b.md"]);
        session
            .on_file_clicked(PathBuf::from("/f/a.md"))
            .await
            .expect("failed to open file");
        session
            .on_text_changed("a edited".to_string())
            .expect("failed to edit");

        // Act
        session
            .on_file_clicked(PathBuf::from("/f/b.md"))
            .await
            .expect("failed to open file");
        session
            .on_file_clicked(PathBuf::from("/f/a.md"))
            .await
            .expect("failed to reopen file");

        // Assert
        let reopened = session.active().expect("missing active entry");
        assert_eq!(reopened.path, PathBuf::from("/f/a.md"));
        assert_eq!(reopened.content.as_deref(), Some("a edited"));
        assert!(reopened.dirty);
    }

    #[tokio::test]
    async fn test_read_result_for_deleted_file_is_dropped() {
        // Arrange
        let mut mock = MockFileStore::new();
        expect_read(&mut mock, "/f/a.md", "late");
        mock.expect_delete()
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));
        let session = loaded_session(mock, &["/f/a.md", "/f/b.md"]);

        // Act
        let click = session.on_file_clicked(PathBuf::from("/f/a.md"));
        session
            .on_delete_requested(PathBuf::from("/f/a.md"))
            .await
            .expect("failed to delete file");
        let click_result = click.await;

        // Assert
        assert!(click_result.is_ok());
        assert!(session.active().is_none());
        assert_eq!(session.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_dirty_entry_writes_old_path_before_moving() {
        // Arrange
        let mut sequence = Sequence::new();
        let mut mock = MockFileStore::new();
        expect_read(&mut mock, "/f/a.md", "hello");
        mock.expect_write()
            .with(eq(PathBuf::from("/f/a.md")), eq("hello world".to_string()))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        mock.expect_rename()
            .with(eq(PathBuf::from("/f/a.md")), eq(PathBuf::from("/f/notes.md")))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        let session = loaded_session(mock, &["/f/a.md"]);
        session
            .on_file_clicked(PathBuf::from("/f/a.md"))
            .await
            .expect("failed to open file");
        session
            .on_text_changed("hello world".to_string())
            .expect("failed to edit");

        // Act
        let new_path = session
            .on_rename_requested(PathBuf::from("/f/a.md"), "notes")
            .await
            .expect("failed to rename");

        // Assert
        let renamed = entry(&session, "/f/notes.md");
        assert_eq!(new_path, PathBuf::from("/f/notes.md"));
        assert!(!renamed.dirty);
        assert!(renamed.active);
        assert_eq!(renamed.content.as_deref(), Some("hello world"));
        assert_eq!(session.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_clean_entry_skips_write() {
        // Arrange
        let mut mock = MockFileStore::new();
        mock.expect_write().never();
        mock.expect_rename()
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        let session = loaded_session(mock, &["/f/a.txt"]);

        // Act
        let new_path = session
            .on_rename_requested(PathBuf::from("/f/a.txt"), "todo")
            .await
            .expect("failed to rename");

        // Assert
        assert_eq!(new_path, PathBuf::from("/f/todo.txt"));
        assert!(entry(&session, "/f/todo.txt").content.is_none());
    }

    #[tokio::test]
    async fn test_rename_aborts_when_write_fails() {
        // Arrange
        let mut mock = MockFileStore::new();
        expect_read(&mut mock, "/f/a.md", "hello");
        mock.expect_write().times(1).returning(|path, _| {
            Box::pin(async move {
                Err(FileStoreError::Io {
                    path,
                    source: io::Error::other("disk full"),
                })
            })
        });
        mock.expect_rename().never();
        let session = loaded_session(mock, &["/f/a.md"]);
        session
            .on_file_clicked(PathBuf::from("/f/a.md"))
            .await
            .expect("failed to open file");
        session
            .on_text_changed("unsaved".to_string())
            .expect("failed to edit");

        // Act
        let result = session
            .on_rename_requested(PathBuf::from("/f/a.md"), "notes")
            .await;

        // Assert
        assert!(matches!(result, Err(EditError::Store(FileStoreError::Io { .. }))));
        let unchanged = entry(&session, "/f/a.md");
        assert!(unchanged.dirty);
        assert_eq!(unchanged.content.as_deref(), Some("unsaved"));
    }

    #[tokio::test]
    async fn test_rename_to_open_path_conflicts_without_store_calls() {
        // Arrange
        let mut mock = MockFileStore::new();
        mock.expect_write().never();
        mock.expect_rename().never();
        let session = loaded_session(mock, &["/f/a.md", "/f/b.md"]);

        // Act
        let result = session
            .on_rename_requested(PathBuf::from("/f/a.md"), "b")
            .await;

        // Assert
        assert!(matches!(
            result,
            Err(EditError::FileSet(OpenFileSetError::Conflict { .. }))
        ));
        assert_eq!(session.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_rename_target_taken_on_disk_leaves_entry_untouched() {
        // Arrange
        let mut mock = MockFileStore::new();
        mock.expect_rename().times(1).returning(|_, new_path| {
            Box::pin(async move { Err(FileStoreError::AlreadyExists { path: new_path }) })
        });
        let session = loaded_session(mock, &["/f/a.md"]);

        // Act
        let result = session
            .on_rename_requested(PathBuf::from("/f/a.md"), "taken")
            .await;

        // Assert
        assert!(matches!(
            result,
            Err(EditError::Store(FileStoreError::AlreadyExists { .. }))
        ));
        assert!(session.entries().iter().any(|entry| entry.path == Path::new("/f/a.md")));
    }

    #[tokio::test]
    async fn test_delete_active_entry_leaves_nothing_active() {
        // Arrange
        let mut mock = MockFileStore::new();
        expect_read(&mut mock, "/f/b.md", "b");
        mock.expect_delete()
            .with(eq(PathBuf::from("/f/b.md")))
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));
        let session = loaded_session(mock, &["/f/a.md", "/f/b.md"]);
        session
            .on_file_clicked(PathBuf::from("/f/b.md"))
            .await
            .expect("failed to open file");

        // Act
        session
            .on_delete_requested(PathBuf::from("/f/b.md"))
            .await
            .expect("failed to delete file");

        // Assert
        assert!(session.active().is_none());
        assert_eq!(session.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_file_still_removes_entry() {
        // Arrange
        let mut mock = MockFileStore::new();
        mock.expect_delete().times(1).returning(|path| {
            Box::pin(async move { Err(FileStoreError::NotFound { path }) })
        });
        let session = loaded_session(mock, &["/f/a.md"]);

        // Act
        let result = session.on_delete_requested(PathBuf::from("/f/a.md")).await;

        // Assert
        assert!(result.is_ok());
        assert!(session.entries().is_empty());
    }

    #[tokio::test]
    async fn test_create_appends_active_entry_and_keeps_previous_edits() {
        // Arrange
        let mut mock = MockFileStore::new();
        expect_read(&mut mock, "/f/a.md", "hello");
        mock.expect_create()
            .with(eq(PathBuf::from("/f")))
            .times(1)
            .returning(|_| Box::pin(async { Ok(PathBuf::from("/f/untitled-1.md")) }));
        let session = loaded_session(mock, &["/f/a.md"]);
        session
            .on_file_clicked(PathBuf::from("/f/a.md"))
            .await
            .expect("failed to open file");
        session
            .on_text_changed("hello there".to_string())
            .expect("failed to edit");

        // Act
        let created_path = session
            .on_create_requested(PathBuf::from("/f"))
            .await
            .expect("failed to create file");

        // Assert
        let entries = session.entries();
        let created = entries.last().expect("missing created entry");
        let previous = entry(&session, "/f/a.md");
        assert_eq!(created.path, created_path);
        assert_eq!(created.content.as_deref(), Some(""));
        assert!(created.active);
        assert!(!previous.active);
        assert_eq!(previous.content.as_deref(), Some("hello there"));
    }

    #[tokio::test]
    async fn test_open_default_folder_loads_listing_and_notifies() {
        // Arrange
        let mut mock = MockFileStore::new();
        mock.expect_list()
            .with(eq(PathBuf::from("/f")))
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    Ok(vec![PathBuf::from("/f/a.md"), PathBuf::from("/f/b.md")])
                })
            });
        let config = AppConfig::default().merged(ConfigUpdate {
            default_folder: Some(PathBuf::from("/f")),
            hotkey: None,
        });
        let session = EditSession::new(Arc::new(mock), config);
        let mut changes = session.subscribe();

        // Act
        let file_count = session
            .open_default_folder()
            .await
            .expect("failed to open folder");

        // Assert
        assert_eq!(file_count, 2);
        assert!(changes.has_changed().expect("session dropped"));
        assert!(session.entries().iter().all(|entry| !entry.active));
        let _ = changes.borrow_and_update();
        assert!(!changes.has_changed().expect("session dropped"));
    }

    #[tokio::test]
    async fn test_open_default_folder_without_config_fails() {
        // Arrange
        let session = session_with(MockFileStore::new());

        // Act
        let result = session.open_default_folder().await;

        // Assert
        assert!(matches!(result, Err(EditError::NoDefaultFolder)));
    }

    #[tokio::test]
    async fn test_open_folder_refuses_while_entries_are_dirty() {
        // Arrange
        let mut mock = MockFileStore::new();
        expect_read(&mut mock, "/f/a.md", "hello");
        mock.expect_list().never();
        let session = loaded_session(mock, &["/f/a.md"]);
        session
            .on_file_clicked(PathBuf::from("/f/a.md"))
            .await
            .expect("failed to open file");
        session
            .on_text_changed("unsaved work".to_string())
            .expect("failed to edit");

        // Act
        let result = session.open_folder(PathBuf::from("/g")).await;

        // Assert
        let Err(EditError::UnsavedChanges { paths }) = result else {
            panic!("expected unsaved changes error");
        };
        assert_eq!(paths, vec![PathBuf::from("/f/a.md")]);
        let kept = entry(&session, "/f/a.md");
        assert!(kept.dirty);
        assert!(kept.active);
        assert_eq!(kept.content.as_deref(), Some("unsaved work"));
    }

    #[tokio::test]
    async fn test_open_folder_keeps_set_when_edit_lands_during_listing() {
        // Arrange
        let mut mock = MockFileStore::new();
        mock.expect_create()
            .times(1)
            .returning(|_| Box::pin(async { Ok(PathBuf::from("/f/untitled-1.md")) }));
        mock.expect_list().times(1).returning(|_| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(vec![PathBuf::from("/g/x.md")])
            })
        });
        let session = session_with(mock);
        session
            .on_create_requested(PathBuf::from("/f"))
            .await
            .expect("failed to create file");

        // Act
        let opening = session.open_folder(PathBuf::from("/g"));
        session
            .on_text_changed("typed while listing".to_string())
            .expect("failed to edit");
        let result = opening.await;

        // Assert
        assert!(matches!(result, Err(EditError::UnsavedChanges { .. })));
        let entries = session.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, PathBuf::from("/f/untitled-1.md"));
        assert!(entries[0].dirty);
    }

    #[tokio::test]
    async fn test_latest_click_wins_over_slower_earlier_read() {
        // Arrange
        let mut mock = MockFileStore::new();
        mock.expect_read()
            .with(eq(PathBuf::from("/f/a.md")))
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok("a".to_string())
                })
            });
        expect_read(&mut mock, "/f/b.md", "b");
        let session = loaded_session(mock, &["/f/a.md", "/f/b.md"]);

        // Act
        let first_click = session.on_file_clicked(PathBuf::from("/f/a.md"));
        let second_click = session.on_file_clicked(PathBuf::from("/f/b.md"));
        let (first, second) = tokio::join!(first_click, second_click);

        // Assert
        assert!(first.is_ok());
        assert!(second.is_ok());
        let active = session.active().expect("missing active entry");
        assert_eq!(active.path, PathBuf::from("/f/b.md"));
        assert_eq!(active.content.as_deref(), Some("b"));
        assert!(entry(&session, "/f/a.md").content.is_none());
    }
}
