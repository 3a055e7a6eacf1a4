//! File system event monitor built on `notify`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, select};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::runtime::Runtime;

use super::ChangeMonitor;
use super::debouncer::Debouncer;
use super::error::WatchError;
use super::handle::MonitorHandle;
use super::path_registry::PathRegistry;

/// How often the worker wakes up to flush debounced paths and pick up new modules.
const TICK: Duration = Duration::from_millis(100);

/// Watches the directories of loaded module sources and reports debounced changes.
#[derive(Debug, Clone)]
pub struct EventMonitor {
    debounce_ms: u64,
}

impl EventMonitor {
    pub fn new(debounce_ms: u64) -> Self {
        Self { debounce_ms }
    }
}

impl ChangeMonitor for EventMonitor {
    fn name(&self) -> &'static str {
        "events"
    }

    fn spawn(self, runtime: Arc<Runtime>) -> Result<MonitorHandle, WatchError> {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        })?;

        let (change_tx, change_rx) = crossbeam_channel::unbounded();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);

        let mut worker = EventWorker {
            runtime,
            watcher,
            registry: PathRegistry::new(),
            debouncer: Debouncer::new(self.debounce_ms),
        };

        let thread = std::thread::Builder::new()
            .name("modreload-events".to_string())
            .spawn(move || worker.run(&event_rx, &stop_rx, &change_tx))?;

        crate::log_event!("monitor", "started", "debounce {}ms", self.debounce_ms);
        Ok(MonitorHandle::new(self.name(), change_rx, stop_tx, thread))
    }
}

struct EventWorker {
    runtime: Arc<Runtime>,
    watcher: RecommendedWatcher,
    registry: PathRegistry,
    debouncer: Debouncer,
}

impl EventWorker {
    fn run(
        &mut self,
        events: &Receiver<notify::Result<Event>>,
        stop: &Receiver<()>,
        changes: &Sender<std::path::PathBuf>,
    ) {
        loop {
            self.refresh();

            select! {
                recv(stop) -> _ => break,
                recv(events) -> msg => match msg {
                    Ok(Ok(event)) => self.handle_event(event),
                    Ok(Err(e)) => tracing::error!("[monitor] file watch error: {e}"),
                    Err(_) => break,
                },
                default(TICK) => {}
            }

            for path in self.debouncer.take_ready() {
                crate::debug_event!("monitor", "changed", "{}", path.display());
                if changes.send(path).is_err() {
                    return;
                }
            }
        }
    }

    /// Pick up sources of modules loaded since the last pass.
    fn refresh(&mut self) {
        let new_dirs = self.registry.add_paths(self.runtime.source_paths());
        if new_dirs.is_empty() {
            return;
        }

        for dir in new_dirs {
            if let Err(e) = self.watch_directory(&dir) {
                // Keep going; other directories may still be watchable.
                crate::warn_event!("monitor", "watch failed", "{e}");
            }
        }
        crate::debug_event!(
            "monitor",
            "tracking",
            "{} files in {} directories",
            self.registry.path_count(),
            self.registry.dir_count()
        );
    }

    fn watch_directory(&mut self, dir: &Path) -> Result<(), WatchError> {
        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;
        crate::debug_event!("monitor", "watching", "{}", dir.display());
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event.kind {
            // Editors that save via rename show up as Create.
            EventKind::Modify(_) | EventKind::Create(_) => {
                for path in event.paths {
                    if self.registry.contains(&path) {
                        self.debouncer.record(path);
                    }
                }
            }
            EventKind::Remove(_) => {
                for path in &event.paths {
                    self.debouncer.remove(path);
                }
            }
            _ => {}
        }
    }
}
