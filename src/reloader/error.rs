//! Error types for the reload engine.

use thiserror::Error;

use crate::runtime::LoadError;

/// Errors from a reload walk.
///
/// A failure aborts the walk. Modules reloaded before the failure keep their new
/// state and the failed module's dependency list stays cleared until its next
/// successful reload.
#[derive(Error, Debug)]
pub enum ReloadError {
    #[error("Module '{name}' is not loaded")]
    NotLoaded { name: String },

    #[error("Failed to reload '{module}': {source}")]
    Load {
        module: String,
        #[source]
        source: LoadError,
    },
}

impl ReloadError {
    /// Module whose reload failed.
    pub fn module(&self) -> &str {
        match self {
            ReloadError::NotLoaded { name } => name,
            ReloadError::Load { module, .. } => module,
        }
    }
}
