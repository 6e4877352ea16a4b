//! Per-path async worker orchestration for serialized file store operations.
//!
//! Every path gets one lazily spawned worker that drains a FIFO of queued
//! jobs, so two operations on the same path always run in submission order
//! while different paths proceed independently. A worker that stays idle
//! unregisters itself and exits; the next submission spawns a fresh one.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::infra::file_store::StoreFuture;

/// How long a worker waits for the next job before exiting.
const IDLE_WORKER_TIMEOUT: Duration = Duration::from_secs(30);

/// Type-erased queued operation.
type PathJob = Box<dyn FnOnce() -> StoreFuture<()> + Send>;

type WorkerMap = Arc<Mutex<HashMap<PathBuf, mpsc::UnboundedSender<PathJob>>>>;

/// Registry of per-path worker queues.
#[derive(Clone)]
pub(crate) struct PathQueue {
    idle_timeout: Duration,
    workers: WorkerMap,
}

impl Default for PathQueue {
    fn default() -> Self {
        Self {
            idle_timeout: IDLE_WORKER_TIMEOUT,
            workers: WorkerMap::default(),
        }
    }
}

impl PathQueue {
    /// Enqueues `operation` behind every operation already submitted for
    /// `path` and returns a receiver for its output.
    ///
    /// Submission happens immediately, so call order defines run order. The
    /// receiver errors when the worker stops before running the job.
    pub(crate) fn submit<T, F, Fut>(&self, path: &Path, operation: F) -> oneshot::Receiver<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let job: PathJob = Box::new(move || {
            Box::pin(async move {
                let _ = result_tx.send(operation().await);
            })
        });

        // Sending under the registry lock keeps a worker from unregistering
        // between the lookup and the send.
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        let job = match workers.get(path) {
            Some(sender) => match sender.send(job) {
                Ok(()) => return result_rx,
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };

        let sender = self.spawn_worker(path);
        let _ = sender.send(job);
        workers.insert(path.to_path_buf(), sender);

        result_rx
    }

    /// Returns whether a worker is registered for `path`.
    #[cfg(test)]
    fn has_worker(&self, path: &Path) -> bool {
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    /// Spawns the background loop that executes queued jobs one at a time.
    ///
    /// The caller registers the returned sender while holding the registry
    /// lock.
    fn spawn_worker(&self, path: &Path) -> mpsc::UnboundedSender<PathJob> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<PathJob>();
        let own_sender = sender.downgrade();
        let idle_timeout = self.idle_timeout;
        let workers = Arc::clone(&self.workers);
        let path = path.to_path_buf();

        tokio::spawn(async move {
            loop {
                match tokio::time::timeout(idle_timeout, receiver.recv()).await {
                    Ok(Some(job)) => job().await,
                    Ok(None) => break,
                    Err(_) => {
                        if unregister_if_idle(&workers, &path, &own_sender, &receiver) {
                            break;
                        }
                    }
                }
            }
        });

        sender
    }
}

/// Removes the registry entry for `path` when it still points at this worker
/// and nothing is queued.
fn unregister_if_idle(
    workers: &WorkerMap,
    path: &Path,
    own_sender: &mpsc::WeakUnboundedSender<PathJob>,
    receiver: &mpsc::UnboundedReceiver<PathJob>,
) -> bool {
    let mut workers = workers.lock().unwrap_or_else(PoisonError::into_inner);
    if !receiver.is_empty() {
        return false;
    }

    let is_registered = match (workers.get(path), own_sender.upgrade()) {
        (Some(registered), Some(own)) => registered.same_channel(&own),
        _ => false,
    };
    if is_registered {
        workers.remove(path);
    }

    true
}
