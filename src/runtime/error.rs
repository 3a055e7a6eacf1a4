//! Error types for module loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the load and reload primitives.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("No module named '{name}'")]
    NotFound { name: String },

    #[error("Cannot read module '{name}' from {path}: {source}")]
    Io {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest for module '{name}' at {path}: {reason}")]
    Manifest {
        name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Module '{name}' failed during execution: {reason}")]
    Exec { name: String, reason: String },
}

impl LoadError {
    /// Failure raised from inside a module body.
    pub fn exec(name: impl Into<String>, reason: impl Into<String>) -> Self {
        LoadError::Exec {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Name of the module the error is about.
    pub fn module(&self) -> &str {
        match self {
            LoadError::NotFound { name }
            | LoadError::Io { name, .. }
            | LoadError::Manifest { name, .. }
            | LoadError::Exec { name, .. } => name,
        }
    }
}

pub type LoadResult<T> = Result<T, LoadError>;
