//! Latest-change timestamp with blocking and async wakeups.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Nanoseconds since the Unix epoch.
pub fn now_nanos() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .and_then(|nanos| u64::try_from(nanos).ok())
        .unwrap_or(0)
}

/// The last-modified timestamp and the condition variable waiters block on.
///
/// Every read and write of the timestamp goes through the mutex paired with
/// the condvar. Each bump is also published on a watch channel for async
/// consumers.
pub struct ChangeSignal {
    last_modified: Mutex<u64>,
    changed: Condvar,
    broadcast: watch::Sender<u64>,
}

impl ChangeSignal {
    pub fn new() -> Self {
        let now = now_nanos();
        let (broadcast, _) = watch::channel(now);
        Self {
            last_modified: Mutex::new(now),
            changed: Condvar::new(),
            broadcast,
        }
    }

    pub fn latest(&self) -> u64 {
        *self.last_modified.lock()
    }

    /// Record a change now and wake every waiter.
    ///
    /// The stored value strictly increases on every call even if the wall
    /// clock stalls or steps back.
    pub fn bump(&self) -> u64 {
        let mut last_modified = self.last_modified.lock();
        let next = now_nanos().max(last_modified.saturating_add(1));
        *last_modified = next;
        self.broadcast.send_replace(next);
        self.changed.notify_all();
        next
    }

    /// Block until the next bump or until `timeout` elapses.
    pub fn wait(&self, timeout: Duration) {
        let mut last_modified = self.last_modified.lock();
        let _ = self.changed.wait_for(&mut last_modified, timeout);
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.broadcast.subscribe()
    }
}

impl Default for ChangeSignal {
    fn default() -> Self {
        Self::new()
    }
}
