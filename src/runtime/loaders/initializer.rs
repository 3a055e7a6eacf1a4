//! Modules defined by registered Rust initializer functions.
//!
//! Reloading such a module re-runs its initializer. Registering a new definition
//! under an existing name replaces the body used by the next reload, which is how
//! an embedding application swaps in new code.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::runtime::error::{LoadError, LoadResult};
use crate::runtime::loader::{Loader, ModuleScope};
use crate::runtime::module::ModuleSpec;

type Initializer = Arc<dyn Fn(&mut ModuleScope<'_>) -> LoadResult<()> + Send + Sync>;

/// A named module body.
#[derive(Clone)]
pub struct ModuleDef {
    name: String,
    path: Option<PathBuf>,
    init: Initializer,
}

impl ModuleDef {
    pub fn new(
        name: impl Into<String>,
        init: impl Fn(&mut ModuleScope<'_>) -> LoadResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            path: None,
            init: Arc::new(init),
        }
    }

    /// Associate a source file. Modules without one are treated as built-ins.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ModuleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDef")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Loader over a shared table of [`ModuleDef`]s.
///
/// Clones share the table, so a handle kept outside the runtime can redefine modules.
#[derive(Clone, Default)]
pub struct InitializerLoader {
    defs: Arc<RwLock<IndexMap<String, ModuleDef>>>,
}

impl InitializerLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn module(self, def: ModuleDef) -> Self {
        self.register(def);
        self
    }

    /// Register or replace a module definition.
    pub fn register(&self, def: ModuleDef) {
        let replaced = self.defs.write().insert(def.name.clone(), def);
        if let Some(old) = replaced {
            crate::debug_event!("initializer", "redefined", "{}", old.name);
        }
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.defs.write().shift_remove(name).is_some()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.defs.read().contains_key(name)
    }
}

impl Loader for InitializerLoader {
    fn name(&self) -> &str {
        "initializer"
    }

    fn find(&self, name: &str) -> LoadResult<Option<ModuleSpec>> {
        Ok(self
            .defs
            .read()
            .get(name)
            .map(|def| ModuleSpec::new(name, def.path.clone())))
    }

    fn exec(&self, spec: &ModuleSpec, scope: &mut ModuleScope<'_>) -> LoadResult<()> {
        // Release the table before running the body; it may import or redefine.
        let init = self
            .defs
            .read()
            .get(&spec.name)
            .map(|def| Arc::clone(&def.init))
            .ok_or_else(|| LoadError::NotFound {
                name: spec.name.clone(),
            })?;
        init(scope)
    }
}
