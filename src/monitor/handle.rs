//! Handle to a running monitor thread.

use std::collections::HashSet;
use std::path::PathBuf;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

/// Owns a monitor thread and the queue of changed source paths it feeds.
///
/// Dropping the handle stops the thread and waits for it to exit.
pub struct MonitorHandle {
    kind: &'static str,
    changes: Receiver<PathBuf>,
    /// Dropped to signal shutdown; the thread never receives on it otherwise.
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub(crate) fn new(
        kind: &'static str,
        changes: Receiver<PathBuf>,
        stop: Sender<()>,
        thread: JoinHandle<()>,
    ) -> Self {
        Self {
            kind,
            changes,
            stop: Some(stop),
            thread: Some(thread),
        }
    }

    /// Monitor flavor, for logging.
    pub fn kind(&self) -> &str {
        self.kind
    }

    pub fn changes(&self) -> &Receiver<PathBuf> {
        &self.changes
    }

    /// Take every queued path without blocking.
    pub fn drain(&self) -> HashSet<PathBuf> {
        self.changes.try_iter().collect()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the thread and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("[monitor] {} thread panicked", self.kind);
            } else {
                crate::debug_event!("monitor", "stopped", "{}", self.kind);
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
