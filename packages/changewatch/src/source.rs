//! OS-level notification subscription for a set of watch roots.

use crate::config::{Backend, WatcherConfig};
use crate::error::{WatcherError, WatcherResult};
use crate::watch_set::WatchRoots;
use notify::event::{AccessKind, AccessMode};
use notify::{
    Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode,
    Watcher as NotifyWatcher,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

type EventSender = Sender<notify::Result<Event>>;

/// Outcome of one bounded wait on the event stream.
#[derive(Debug)]
pub enum Pending {
    Event(Event),
    Error(notify::Error),
    Timeout,
    Disconnected,
}

pub struct NotificationSource {
    watcher: Box<dyn NotifyWatcher + Send>,
    receiver: Receiver<notify::Result<Event>>,
    active: Vec<PathBuf>,
}

impl std::fmt::Debug for NotificationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSource")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl NotificationSource {
    pub fn new(config: &WatcherConfig) -> WatcherResult<Self> {
        let (tx, rx) = channel();
        let watcher = create_backend(config, tx)?;

        Ok(Self {
            watcher,
            receiver: rx,
            active: Vec::new(),
        })
    }

    /// Replace every current watch with `roots`.
    ///
    /// Roots that cannot be watched are logged and left unmonitored. Returns
    /// the number of roots now subscribed.
    pub fn subscribe(&mut self, roots: &WatchRoots) -> usize {
        self.unsubscribe_all();

        for root in roots.iter() {
            match self.watch_root(root) {
                Ok(()) => {
                    tracing::debug!(root = %root.display(), "subscribed");
                    self.active.push(root.clone());
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }

        self.active.len()
    }

    pub fn unsubscribe_all(&mut self) {
        for root in self.active.drain(..) {
            if let Err(e) = self.watcher.unwatch(&root) {
                // The root may have been deleted, which already dropped its watch
                tracing::debug!(root = %root.display(), error = %e, "unwatch failed");
            }
        }
    }

    pub fn active_roots(&self) -> &[PathBuf] {
        &self.active
    }

    pub fn next_event(&self, timeout: Duration) -> Pending {
        match self.receiver.recv_timeout(timeout) {
            Ok(Ok(event)) => Pending::Event(event),
            Ok(Err(e)) => Pending::Error(e),
            Err(RecvTimeoutError::Timeout) => Pending::Timeout,
            Err(RecvTimeoutError::Disconnected) => Pending::Disconnected,
        }
    }

    fn watch_root(&mut self, root: &Path) -> WatcherResult<()> {
        self.watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatcherError::Subscribe {
                root: root.to_path_buf(),
                source,
            })
    }
}

fn create_backend(
    config: &WatcherConfig,
    tx: EventSender,
) -> WatcherResult<Box<dyn NotifyWatcher + Send>> {
    if config.backend == Backend::Poll {
        return create_poll_backend(config, tx);
    }

    let fallback_tx = tx.clone();
    match RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        Config::default(),
    ) {
        Ok(watcher) => Ok(Box::new(watcher)),
        Err(e) => {
            tracing::warn!(
                "Native notification backend unavailable ({}); falling back to polling",
                e
            );
            create_poll_backend(config, fallback_tx)
        }
    }
}

fn create_poll_backend(
    config: &WatcherConfig,
    tx: EventSender,
) -> WatcherResult<Box<dyn NotifyWatcher + Send>> {
    let watcher = PollWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        Config::default().with_poll_interval(config.fallback_poll_interval()),
    )?;
    Ok(Box::new(watcher))
}

/// Events that only report a file being looked at, never a change.
///
/// A close after writing is a completed write and is not informational.
pub fn is_informational(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => false,
        EventKind::Access(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{
        CreateKind, DataChange, MetadataKind, ModifyKind, RemoveKind, RenameMode,
    };
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_informational_kinds() {
        assert!(is_informational(&EventKind::Access(AccessKind::Open(AccessMode::Any))));
        assert!(is_informational(&EventKind::Access(AccessKind::Read)));
        assert!(is_informational(&EventKind::Access(AccessKind::Close(AccessMode::Read))));
        assert!(is_informational(&EventKind::Access(AccessKind::Any)));
    }

    #[test]
    fn test_change_kinds_are_not_informational() {
        let kinds = [
            EventKind::Create(CreateKind::File),
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            EventKind::Remove(RemoveKind::File),
            EventKind::Access(AccessKind::Close(AccessMode::Write)),
            EventKind::Any,
            EventKind::Other,
        ];
        for kind in kinds {
            assert!(!is_informational(&kind), "{:?} should count as a change", kind);
        }
    }

    #[test]
    fn test_subscribe_skips_missing_roots() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let roots: WatchRoots = [temp_dir.path().to_path_buf(), missing].into_iter().collect();

        let mut source = NotificationSource::new(&WatcherConfig::default()).unwrap();
        assert_eq!(source.subscribe(&roots), 1);
        assert_eq!(source.active_roots(), &[temp_dir.path().to_path_buf()]);
    }

    #[test]
    fn test_subscribe_replaces_previous_roots() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();

        let mut source = NotificationSource::new(&WatcherConfig::default()).unwrap();
        source.subscribe(&[first.path().to_path_buf()].into_iter().collect());
        source.subscribe(&[second.path().to_path_buf()].into_iter().collect());

        assert_eq!(source.active_roots(), &[second.path().to_path_buf()]);
    }

    #[test]
    fn test_next_event_times_out_when_idle() {
        let source = NotificationSource::new(&WatcherConfig::default()).unwrap();
        assert!(matches!(
            source.next_event(Duration::from_millis(50)),
            Pending::Timeout
        ));
    }

    #[test]
    fn test_poll_backend_reports_creation() {
        let temp_dir = TempDir::new().unwrap();
        let config = WatcherConfig {
            backend: Backend::Poll,
            fallback_poll_interval_ms: 50,
            ..WatcherConfig::default()
        };
        let mut source = NotificationSource::new(&config).unwrap();
        source.subscribe(&[temp_dir.path().to_path_buf()].into_iter().collect());

        fs::write(temp_dir.path().join("new.txt"), "hello").unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let mut seen = false;
        while std::time::Instant::now() < deadline {
            if let Pending::Event(event) = source.next_event(Duration::from_millis(100)) {
                if event.paths.iter().any(|p| p.ends_with("new.txt")) {
                    seen = true;
                    break;
                }
            }
        }
        assert!(seen, "poll backend should report the new file");
    }
}
