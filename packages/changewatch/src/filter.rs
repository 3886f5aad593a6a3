use crate::config::Containment;
use crate::watch_set::WatchSet;
use arc_swap::ArcSwap;
use std::path::Path;
use std::sync::Arc;

/// Decides whether a changed path belongs to the current watch set.
///
/// The set is held as an immutable snapshot; `replace` swaps in a new one so
/// readers on the worker thread never observe a half-written update.
pub struct PathFilter {
    set: ArcSwap<WatchSet>,
    containment: Containment,
}

impl PathFilter {
    pub fn new(containment: Containment) -> Self {
        Self {
            set: ArcSwap::from_pointee(WatchSet::default()),
            containment,
        }
    }

    pub fn replace(&self, set: WatchSet) {
        self.set.store(Arc::new(set));
    }

    pub fn snapshot(&self) -> Arc<WatchSet> {
        self.set.load_full()
    }

    pub fn containment(&self) -> Containment {
        self.containment
    }

    pub fn is_watched(&self, path: &Path) -> bool {
        let set = self.set.load();
        if set.files().iter().any(|file| file == path) {
            return true;
        }
        set.folders()
            .iter()
            .any(|folder| contains(self.containment, folder, path))
    }
}

fn contains(containment: Containment, folder: &Path, path: &Path) -> bool {
    match containment {
        Containment::Prefix => path
            .as_os_str()
            .as_encoded_bytes()
            .starts_with(folder.as_os_str().as_encoded_bytes()),
        Containment::Segment => path.starts_with(folder),
    }
}
