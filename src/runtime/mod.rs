//! Module host: the registry all dynamic loads go through.
//!
//! # Architecture
//!
//! ```text
//! Runtime
//!   - loaded modules (name -> Arc<Module>)
//!   - ordered loaders (InitializerLoader, ManifestLoader, ...)
//!   - optional ImportHook wrapped around every import
//!         |
//!   Loader::exec(spec, ModuleScope)
//!         |
//!   ModuleScope::import -> Runtime::import (nested, same lock)
//! ```

mod error;
mod loader;
pub mod loaders;
mod module;
mod registry;

pub use error::{LoadError, LoadResult};
pub use loader::{Loader, ModuleScope};
pub use loaders::{InitializerLoader, ManifestLoader, ModuleDef};
pub use module::{
    Attr, MigrationHook, Module, ModuleSpec, Namespace, NativeFn, StateSnapshot, Value,
};
pub use registry::{ImportHook, Runtime, RuntimeBuilder};
