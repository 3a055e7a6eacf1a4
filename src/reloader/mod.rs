//! Reload engine.
//!
//! Reloading a module first reloads, depth-first, every module it imported
//! (most recent import first), so each module re-executes against fresh
//! dependencies. Every module is reloaded at most once per call, which keeps
//! circular imports finite.

mod engine;
mod error;

pub use engine::{ReloadReport, Reloader};
pub use error::ReloadError;
