//! Change detection feeding the reload engine.
//!
//! Monitors run on their own thread and only hand over changed source paths
//! through a channel; all reloading happens on the thread calling
//! [`AutoReloader::poll`].
//!
//! # Architecture
//!
//! ```text
//! PollMonitor (mtime scan)   EventMonitor (notify + Debouncer + PathRegistry)
//!            \                 /
//!         crossbeam channel of PathBuf
//!                    |
//!   AutoReloader::poll -> Runtime::modules_for_paths -> Reloader::reload_many
//! ```

mod auto;
mod debouncer;
mod error;
mod events;
mod handle;
mod path_registry;
mod poll;

use std::sync::Arc;
use std::time::Duration;

pub use auto::AutoReloader;
pub use debouncer::Debouncer;
pub use error::WatchError;
pub use events::EventMonitor;
pub use handle::MonitorHandle;
pub use path_registry::PathRegistry;
pub use poll::{MtimeScanner, PollMonitor};

use crate::config::{MonitorConfig, MonitorMode};
use crate::runtime::Runtime;

/// A source of changed module paths running on its own thread.
pub trait ChangeMonitor: Send {
    /// Monitor name for logging.
    fn name(&self) -> &'static str;

    /// Start watching the sources of modules loaded in `runtime`.
    ///
    /// Modules loaded after the monitor starts are picked up on its next pass.
    fn spawn(self, runtime: Arc<Runtime>) -> Result<MonitorHandle, WatchError>;
}

/// Spawn the monitor selected by `config`.
pub fn spawn_monitor(
    runtime: Arc<Runtime>,
    config: &MonitorConfig,
) -> Result<MonitorHandle, WatchError> {
    match config.mode {
        MonitorMode::Poll => {
            PollMonitor::new(Duration::from_millis(config.interval_ms)).spawn(runtime)
        }
        MonitorMode::Events => EventMonitor::new(config.debounce_ms).spawn(runtime),
    }
}
