//! Background worker that turns notification events into change bumps.

use crate::config::WatcherConfig;
use crate::error::{WatcherError, WatcherResult};
use crate::filter::PathFilter;
use crate::retarget::RetargetSlot;
use crate::signal::ChangeSignal;
use crate::source::{is_informational, NotificationSource, Pending};
use crate::watch_set::WatchRoots;
use notify::Event;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// State shared between the watcher and its worker thread.
pub(crate) struct Shared {
    pub filter: PathFilter,
    pub signal: ChangeSignal,
    pub retarget: RetargetSlot,
}

impl Shared {
    pub fn new(config: &WatcherConfig) -> Self {
        Self {
            filter: PathFilter::new(config.containment),
            signal: ChangeSignal::new(),
            retarget: RetargetSlot::new(),
        }
    }

    /// Bump the change signal if `event` is a relevant change.
    pub fn observe(&self, event: &Event) -> bool {
        if event.need_rescan() {
            // The backend lost events; some of them may have been ours
            if self.filter.snapshot().is_empty() {
                return false;
            }
            let mtime = self.signal.bump();
            tracing::warn!(mtime, "Notification backend requested a rescan");
            return true;
        }

        if is_informational(&event.kind) {
            tracing::trace!(kind = ?event.kind, paths = ?event.paths, "ignoring access event");
            return false;
        }

        match event.paths.iter().find(|path| self.filter.is_watched(path)) {
            Some(path) => {
                let mtime = self.signal.bump();
                tracing::debug!(
                    path = %path.display(),
                    kind = ?event.kind,
                    mtime,
                    "change detected"
                );
                true
            }
            None => false,
        }
    }
}

/// Owned handle to a running worker thread.
pub(crate) struct WorkerHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawn a worker that subscribes to `roots` from its own thread.
    pub fn spawn(
        shared: Arc<Shared>,
        roots: WatchRoots,
        config: WatcherConfig,
    ) -> WatcherResult<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            shared,
            source: None,
            roots,
            config,
            stop: Arc::clone(&stop),
        };

        let thread = std::thread::Builder::new()
            .name("changewatch-worker".to_string())
            .spawn(move || worker.run())
            .map_err(WatcherError::Spawn)?;

        Ok(Self { stop, thread })
    }

    pub fn signal_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    #[cfg(test)]
    pub fn thread_id(&self) -> std::thread::ThreadId {
        self.thread.thread().id()
    }

    pub fn join(self) {
        self.signal_stop();
        if self.thread.join().is_err() {
            tracing::error!("Change watcher worker panicked");
        }
    }
}

struct Worker {
    shared: Arc<Shared>,
    source: Option<NotificationSource>,
    /// Most recently requested roots, kept so a lost backend can be rebuilt
    roots: WatchRoots,
    config: WatcherConfig,
    stop: Arc<AtomicBool>,
}

impl Worker {
    fn run(mut self) {
        tracing::info!(
            poll_interval_ms = self.config.poll_interval_ms,
            "Starting change watcher worker"
        );
        self.reconnect();

        while !self.stop.load(Ordering::Acquire) {
            if let Some(roots) = self.shared.retarget.take() {
                self.retarget(roots);
            }
            self.tick();
        }

        if let Some(source) = self.source.as_mut() {
            source.unsubscribe_all();
        }
        tracing::info!("Change watcher worker stopped");
    }

    fn retarget(&mut self, roots: WatchRoots) {
        self.roots = roots;
        match self.source.as_mut() {
            Some(source) => {
                let subscribed = source.subscribe(&self.roots);
                tracing::info!(roots = self.roots.len(), subscribed, "Retargeted change watcher");
            }
            None => {
                self.reconnect();
            }
        }
    }

    /// Build a fresh backend subscribed to the remembered roots.
    fn reconnect(&mut self) -> bool {
        match NotificationSource::new(&self.config) {
            Ok(mut source) => {
                let subscribed = source.subscribe(&self.roots);
                tracing::info!(roots = self.roots.len(), subscribed, "Subscribed change watcher");
                self.source = Some(source);
                true
            }
            Err(e) => {
                tracing::error!("{}", e);
                false
            }
        }
    }

    fn tick(&mut self) {
        let interval = self.config.poll_interval();
        if self.source.is_none() && !self.reconnect() {
            std::thread::sleep(interval);
            return;
        }
        let Some(source) = self.source.as_ref() else {
            return;
        };

        match source.next_event(interval) {
            Pending::Event(event) => {
                self.shared.observe(&event);
            }
            Pending::Error(e) => {
                tracing::warn!("Notification error: {}", e);
            }
            Pending::Timeout => {}
            Pending::Disconnected => {
                tracing::error!("Notification backend disconnected; rebuilding on next tick");
                self.source = None;
            }
        }
    }
}
