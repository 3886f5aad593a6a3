//! The change watcher: owns the watch set, the worker and the change state.
//!
//! Callers replace what is watched with [`Watcher::update`] and then poll
//! [`Watcher::check`], block on [`Watcher::wait_for_next_change`], or await a
//! [`Watcher::subscribe`] receiver. Only the latest change time is kept.

use crate::config::WatcherConfig;
use crate::watch_set::{WatchRoots, WatchSet};
use crate::worker::{Shared, WorkerHandle};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

pub struct Watcher {
    shared: Arc<Shared>,
    last_checked: AtomicU64,
    worker: Mutex<Option<WorkerHandle>>,
    config: WatcherConfig,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("config", &self.config)
            .field("last_checked", &self.last_checked)
            .finish_non_exhaustive()
    }
}

impl Watcher {
    pub fn new() -> Self {
        Self::with_config(WatcherConfig::default())
    }

    pub fn with_config(config: WatcherConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(&config)),
            last_checked: AtomicU64::new(0),
            worker: Mutex::new(None),
            config,
        }
    }

    /// Replace the files and folders to watch.
    ///
    /// Runs `check()` once so the next call only reports changes made after
    /// this update. The first call starts the worker, which subscribes in the
    /// background; later calls hand the new roots to the running worker, which
    /// switches over at its next tick. No notification backend work happens on
    /// the caller's thread.
    pub fn update<F, D>(&self, files: F, folders: D)
    where
        F: IntoIterator,
        F::Item: AsRef<Path>,
        D: IntoIterator,
        D::Item: AsRef<Path>,
    {
        let mut worker = self.worker.lock();

        let set = WatchSet::new(files, folders);
        let roots = set.roots();
        tracing::debug!(
            files = set.files().len(),
            folders = set.folders().len(),
            roots = roots.len(),
            "Updating watch set"
        );
        self.shared.filter.replace(set);
        self.check();

        self.shared.retarget.publish(roots);
        if worker.is_none() {
            let roots = self.shared.retarget.take().unwrap_or_default();
            *worker = self.start(roots);
        }
    }

    /// Whether anything changed since the previous call.
    pub fn check(&self) -> bool {
        let latest = self.get_latest_mtime();
        let previous = self.last_checked.swap(latest, Ordering::AcqRel);
        latest != previous
    }

    /// Block until a change is signalled or `timeout` elapses.
    ///
    /// Does not report which one happened; follow up with `check()`.
    pub fn wait_for_next_change(&self, timeout: Duration) {
        self.shared.signal.wait(timeout);
    }

    /// Nanoseconds since the Unix epoch of the latest relevant change.
    pub fn get_latest_mtime(&self) -> u64 {
        self.shared.signal.latest()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.signal.subscribe()
    }

    /// Stream of change timestamps, starting with the next change.
    pub fn change_stream(&self) -> WatchStream<u64> {
        WatchStream::from_changes(self.subscribe())
    }

    pub fn watch_set(&self) -> Arc<WatchSet> {
        self.shared.filter.snapshot()
    }

    pub fn roots(&self) -> WatchRoots {
        self.watch_set().roots()
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// Returns within about one poll interval. A later `update` starts a new
    /// worker.
    pub fn shutdown(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            tracing::info!("Shutting down change watcher");
            handle.join();
        }
    }

    /// Spawn the worker; it subscribes to `roots` on its own thread.
    fn start(&self, roots: WatchRoots) -> Option<WorkerHandle> {
        match WorkerHandle::spawn(Arc::clone(&self.shared), roots, self.config.clone()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("{}", e);
                None
            }
        }
    }

    #[cfg(test)]
    fn worker_thread_id(&self) -> Option<std::thread::ThreadId> {
        self.worker.lock().as_ref().map(WorkerHandle::thread_id)
    }
}

impl Default for Watcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.get_mut().take() {
            handle.signal_stop();
        }
    }
}
