//! Watch set snapshots and the directory roots derived from them.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// The files and folders a watcher has been asked to monitor.
///
/// Order is preserved as given and duplicates are kept. Paths are made
/// absolute lexically so they compare equal to what the OS backend reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSet {
    files: Vec<PathBuf>,
    folders: Vec<PathBuf>,
}

impl WatchSet {
    pub fn new<F, D>(files: F, folders: D) -> Self
    where
        F: IntoIterator,
        F::Item: AsRef<Path>,
        D: IntoIterator,
        D::Item: AsRef<Path>,
    {
        Self {
            files: files.into_iter().map(|p| absolutize(p.as_ref())).collect(),
            folders: folders.into_iter().map(|p| absolutize(p.as_ref())).collect(),
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn folders(&self) -> &[PathBuf] {
        &self.folders
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }

    /// Directories the OS subscription must cover: every folder that exists
    /// plus the parent of every file, whether or not that parent exists.
    pub fn roots(&self) -> WatchRoots {
        let folders = self.folders.iter().filter(|f| f.exists()).cloned();
        let parents = self
            .files
            .iter()
            .filter_map(|f| f.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);

        WatchRoots(folders.chain(parents).collect())
    }
}

/// Deduplicated set of directories to subscribe to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchRoots(BTreeSet<PathBuf>);

impl WatchRoots {
    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.0.iter()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<PathBuf> for WatchRoots {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roots_include_file_parents() {
        let set = WatchSet::new(
            ["/srv/ledger/main.beancount", "/srv/ledger/prices.beancount"],
            Vec::<&str>::new(),
        );
        let roots = set.roots();

        assert_eq!(roots.len(), 1);
        assert!(roots.contains(Path::new("/srv/ledger")));
    }

    #[test]
    fn test_roots_keep_missing_file_parents() {
        let set = WatchSet::new(["/does/not/exist/file.txt"], Vec::<&str>::new());
        assert!(set.roots().contains(Path::new("/does/not/exist")));
    }

    #[test]
    fn test_roots_skip_missing_folders() {
        let temp_dir = TempDir::new().unwrap();
        let present = temp_dir.path().join("documents");
        std::fs::create_dir(&present).unwrap();
        let missing = temp_dir.path().join("missing");

        let set = WatchSet::new(Vec::<&str>::new(), [&present, &missing]);
        let roots = set.roots();

        assert_eq!(roots.len(), 1);
        assert!(roots.contains(&present));
        assert!(!roots.contains(&missing));
    }

    #[test]
    fn test_roots_are_deduplicated() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let set = WatchSet::new([dir.join("a.txt"), dir.join("b.txt")], [dir]);

        assert_eq!(set.roots().len(), 1);
    }

    #[test]
    fn test_relative_paths_made_absolute() {
        let set = WatchSet::new(["notes.txt"], ["docs"]);
        let cwd = std::env::current_dir().unwrap();

        assert_eq!(set.files()[0], cwd.join("notes.txt"));
        assert_eq!(set.folders()[0], cwd.join("docs"));
        assert!(set.roots().contains(&cwd));
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        let set = WatchSet::new(["/b.txt", "/a.txt", "/b.txt"], Vec::<&str>::new());
        let files: Vec<_> = set.files().iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(files, vec!["/b.txt", "/a.txt", "/b.txt"]);
    }

    #[test]
    fn test_empty_set() {
        let set = WatchSet::default();
        assert!(set.is_empty());
        assert!(set.roots().is_empty());
    }
}
