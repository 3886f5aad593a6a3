use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "changewatch.config.json";

/// How a changed path is matched against a watched folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Containment {
    /// Raw textual prefix: `/data` also matches `/database/x`
    #[default]
    Prefix,
    /// Path-component containment: `/data` matches `/data/x` only
    Segment,
}

/// Which notification backend the worker subscribes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Platform watcher (inotify, kqueue, FSEvents, ReadDirectoryChanges),
    /// falling back to polling if it cannot be created
    #[default]
    Native,
    /// Periodic stat-based polling
    Poll,
}

/// Watcher configuration file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherConfig {
    /// Worker tick: bounded wait for events before checking for retargets
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Folder containment rule used by the path filter
    #[serde(default)]
    pub containment: Containment,

    /// Notification backend
    #[serde(default)]
    pub backend: Backend,

    /// Scan interval of the polling backend
    #[serde(default = "default_fallback_poll_interval_ms")]
    pub fallback_poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_fallback_poll_interval_ms() -> u64 {
    500
}

impl WatcherConfig {
    /// Load config from a directory
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let config_path = dir.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            // Return default config if none exists
            Ok(Self::default())
        }
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: WatcherConfig = serde_json::from_str(content)?;
        if config.poll_interval_ms == 0 {
            anyhow::bail!("pollIntervalMs must be greater than zero");
        }
        Ok(config)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1);
        self
    }

    pub fn with_containment(mut self, containment: Containment) -> Self {
        self.containment = containment;
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn fallback_poll_interval(&self) -> Duration {
        Duration::from_millis(self.fallback_poll_interval_ms.max(1))
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            containment: Containment::default(),
            backend: Backend::default(),
            fallback_poll_interval_ms: default_fallback_poll_interval_ms(),
        }
    }
}
