use crate::watch_set::WatchRoots;
use parking_lot::Mutex;

/// Single-slot handoff of the newest root set to the worker.
///
/// Publishing overwrites whatever the worker has not picked up yet; only the
/// latest roots ever matter.
#[derive(Debug, Default)]
pub struct RetargetSlot {
    pending: Mutex<Option<WatchRoots>>,
}

impl RetargetSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if an unconsumed root set was replaced.
    pub fn publish(&self, roots: WatchRoots) -> bool {
        self.pending.lock().replace(roots).is_some()
    }

    pub fn take(&self) -> Option<WatchRoots> {
        self.pending.lock().take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}
