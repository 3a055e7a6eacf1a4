//! Built-in loaders.

mod initializer;
mod manifest;

pub use initializer::{InitializerLoader, ModuleDef};
pub use manifest::ManifestLoader;
