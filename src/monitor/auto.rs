//! Glue between a change monitor and the reload engine.

use std::sync::Arc;

use crate::config::MonitorConfig;
use crate::reloader::{ReloadError, ReloadReport, Reloader};

use super::error::WatchError;
use super::handle::MonitorHandle;

/// Reloads modules whose sources a monitor reported as changed.
///
/// Call [`poll`](Self::poll) periodically from the thread that owns the
/// application's main loop; reloads run there, never on the monitor thread.
pub struct AutoReloader {
    reloader: Reloader,
    monitor: MonitorHandle,
}

impl AutoReloader {
    pub fn new(reloader: Reloader, monitor: MonitorHandle) -> Self {
        Self { reloader, monitor }
    }

    /// Spawn the monitor described by `config` and attach it.
    pub fn start(reloader: Reloader, config: &MonitorConfig) -> Result<Self, WatchError> {
        let monitor = super::spawn_monitor(Arc::clone(reloader.runtime()), config)?;
        Ok(Self::new(reloader, monitor))
    }

    pub fn reloader(&self) -> &Reloader {
        &self.reloader
    }

    pub fn monitor(&self) -> &MonitorHandle {
        &self.monitor
    }

    /// Reload everything changed since the last call as one batch.
    ///
    /// Returns `Ok(None)` when nothing relevant changed. On error the changed
    /// paths are consumed; the next edit of the file triggers a new attempt.
    pub fn poll(&self) -> Result<Option<ReloadReport>, ReloadError> {
        let changed = self.monitor.drain();
        if changed.is_empty() {
            return Ok(None);
        }

        let modules = self.reloader.runtime().modules_for_paths(&changed);
        if modules.is_empty() {
            crate::debug_event!("monitor", "no loaded module for", "{} paths", changed.len());
            return Ok(None);
        }

        crate::log_event!("monitor", "changed", "{}", modules.join(", "));
        self.reloader.reload_many(&modules).map(Some)
    }

    /// Stop the monitor, keeping the reloader usable.
    pub fn into_reloader(self) -> Reloader {
        let Self {
            reloader,
            mut monitor,
        } = self;
        monitor.stop();
        reloader
    }
}
