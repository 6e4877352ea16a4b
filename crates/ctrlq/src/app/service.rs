//! Shared dependency container for edit session workflows.

use std::sync::Arc;

use crate::app::worker::PathQueue;
use crate::infra::file_store::FileStore;

/// Shared dependencies used by edit session workflows.
#[derive(Clone)]
pub(crate) struct AppServices {
    file_store: Arc<dyn FileStore>,
    path_queue: PathQueue,
}

impl AppServices {
    /// Creates a shared service container around `file_store`.
    pub(crate) fn new(file_store: Arc<dyn FileStore>) -> Self {
        Self {
            file_store,
            path_queue: PathQueue::default(),
        }
    }

    /// Returns the shared file store for async file operations.
    pub(crate) fn file_store(&self) -> Arc<dyn FileStore> {
        Arc::clone(&self.file_store)
    }

    /// Returns the per-path queue serializing file store operations.
    pub(crate) fn path_queue(&self) -> &PathQueue {
        &self.path_queue
    }
}
