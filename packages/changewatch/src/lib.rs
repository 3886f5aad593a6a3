pub mod config;
pub mod error;
pub mod filter;
pub mod retarget;
pub mod signal;
pub mod source;
pub mod watch_set;
pub mod watcher;
mod worker;

pub use config::{Backend, Containment, WatcherConfig, DEFAULT_CONFIG_NAME};
pub use error::{WatcherError, WatcherResult};
pub use filter::PathFilter;
pub use watch_set::{WatchRoots, WatchSet};
pub use watcher::Watcher;
