//! Dependency-tracking module reloader.
//!
//! Modules are loaded through a [`Runtime`], which routes every import through
//! an optional hook. Enabling a [`Reloader`] installs an [`ImportTracker`] as
//! that hook, recording which module imported which. Reloading a module then
//! re-executes its recorded dependencies first, each at most once.
//!
//! ```no_run
//! use std::sync::Arc;
//! use modreload::{ManifestLoader, Reloader, Runtime};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = Arc::new(
//!     Runtime::builder()
//!         .loader(ManifestLoader::new(["modules"]))
//!         .build(),
//! );
//! let reloader = Reloader::new(Arc::clone(&runtime));
//! reloader.enable(["vendor"]);
//!
//! let app = runtime.import("app")?;
//! // ... edit modules/app.toml ...
//! reloader.reload("app")?;
//! println!("{:?}", app.get("greeting"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logging;
pub mod monitor;
pub mod reloader;
pub mod runtime;
pub mod tracker;

pub use config::Settings;
pub use monitor::{AutoReloader, MonitorHandle, WatchError};
pub use reloader::{ReloadError, ReloadReport, Reloader};
pub use runtime::{
    InitializerLoader, LoadError, Loader, ManifestLoader, Module, ModuleDef, ModuleScope,
    Namespace, Runtime, StateSnapshot, Value,
};
pub use tracker::{Blacklist, DependencyGraph, ImportTracker};
