//! Modification-time polling.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crossbeam_channel::RecvTimeoutError;

use crate::runtime::Runtime;

use super::ChangeMonitor;
use super::error::WatchError;
use super::handle::MonitorHandle;

/// Remembers the last seen modification time of each source file.
#[derive(Debug, Default)]
pub struct MtimeScanner {
    mtimes: HashMap<PathBuf, SystemTime>,
}

impl MtimeScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return paths whose modification time differs from the previous scan.
    ///
    /// Files seen for the first time are only recorded. Files that cannot be
    /// stat'ed are skipped; they are not reloadable anyway.
    pub fn scan(&mut self, paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
        let mut changed = Vec::new();

        for path in paths {
            let Ok(mtime) = std::fs::metadata(&path).and_then(|m| m.modified()) else {
                continue;
            };

            match self.mtimes.insert(path.clone(), mtime) {
                Some(previous) if previous != mtime => changed.push(path),
                _ => {}
            }
        }

        changed
    }

    pub fn tracked(&self) -> usize {
        self.mtimes.len()
    }
}

/// Background thread scanning loaded module sources at a fixed interval.
#[derive(Debug, Clone)]
pub struct PollMonitor {
    interval: Duration,
}

impl PollMonitor {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl ChangeMonitor for PollMonitor {
    fn name(&self) -> &'static str {
        "poll"
    }

    fn spawn(self, runtime: Arc<Runtime>) -> Result<MonitorHandle, WatchError> {
        let (change_tx, change_rx) = crossbeam_channel::unbounded();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let interval = self.interval;

        let thread = std::thread::Builder::new()
            .name("modreload-poll".to_string())
            .spawn(move || {
                let mut scanner = MtimeScanner::new();
                loop {
                    for path in scanner.scan(runtime.source_paths()) {
                        crate::debug_event!("monitor", "changed", "{}", path.display());
                        if change_tx.send(path).is_err() {
                            return;
                        }
                    }

                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        _ => break,
                    }
                }
            })?;

        crate::log_event!("monitor", "polling", "every {interval:?}");
        Ok(MonitorHandle::new(self.name(), change_rx, stop_tx, thread))
    }
}
