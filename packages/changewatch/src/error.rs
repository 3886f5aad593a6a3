use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create notification backend: {0}")]
    Backend(#[from] notify::Error),

    #[error("Failed to subscribe to {}: {source}", root.display())]
    Subscribe {
        root: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Failed to spawn watcher thread: {0}")]
    Spawn(#[source] std::io::Error),
}

pub type WatcherResult<T> = Result<T, WatcherError>;
