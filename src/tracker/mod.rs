//! Import graph tracking.
//!
//! The [`ImportTracker`] wraps the runtime's import primitive and records, for
//! every module being imported or reloaded, which source-backed modules it
//! pulled in. The [`Blacklist`] marks modules that stay in the graph but are
//! never reloaded.

mod blacklist;
mod graph;
mod hook;

pub use blacklist::Blacklist;
pub use graph::DependencyGraph;
pub use hook::ImportTracker;
