//! The module registry every dynamic load is routed through.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};

use super::error::{LoadError, LoadResult};
use super::loader::{Loader, ModuleScope};
use super::module::{Module, ModuleSpec};

/// Interception point around the import primitive.
///
/// `import` performs the underlying load (or returns the cached module). A hook
/// must call it at most once and must return its error unchanged.
pub trait ImportHook: Send + Sync {
    fn on_import(
        &self,
        name: &str,
        import: &mut dyn FnMut() -> LoadResult<Arc<Module>>,
    ) -> LoadResult<Arc<Module>>;
}

/// Registry of loaded modules plus the loaders that produce them.
///
/// All imports are serialized by a reentrant lock, so a module body importing
/// other modules on the same thread re-enters it while other threads wait.
pub struct Runtime {
    loaders: Vec<Arc<dyn Loader>>,
    modules: RwLock<IndexMap<String, Arc<Module>>>,
    import_lock: ReentrantMutex<()>,
    hook: RwLock<Option<Arc<dyn ImportHook>>>,
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Import a module by name, running the installed hook if any.
    pub fn import(&self, name: &str) -> LoadResult<Arc<Module>> {
        let _guard = self.import_lock.lock();
        let hook = self.hook.read().clone();
        match hook {
            Some(hook) => hook.on_import(name, &mut || self.base_import(name)),
            None => self.base_import(name),
        }
    }

    /// The import primitive without interception.
    fn base_import(&self, name: &str) -> LoadResult<Arc<Module>> {
        if let Some(module) = self.get(name) {
            return Ok(module);
        }

        let (loader, spec) = self.find_spec(name)?;
        let module = Arc::new(Module::new(spec, loader));

        // Registered before the body runs so circular imports see the partial module.
        self.modules
            .write()
            .insert(name.to_string(), Arc::clone(&module));

        match self.execute(&module) {
            Ok(()) => {
                crate::debug_event!("runtime", "loaded", "{name}");
                Ok(module)
            }
            Err(e) => {
                self.modules.write().shift_remove(name);
                Err(e)
            }
        }
    }

    /// The reload primitive: re-run the module body and swap in the new namespace.
    ///
    /// On failure the previous namespace stays in place.
    pub fn reload(&self, module: &Arc<Module>) -> LoadResult<()> {
        let _guard = self.import_lock.lock();
        self.execute(module)?;
        crate::debug_event!(
            "runtime",
            "re-executed",
            "{} (generation {})",
            module.name(),
            module.generation()
        );
        Ok(())
    }

    fn execute(&self, module: &Arc<Module>) -> LoadResult<()> {
        let mut scope = ModuleScope::new(self, module.name());
        module.loader().exec(module.spec(), &mut scope)?;
        let (namespace, migration) = scope.finish();
        module.install(namespace, migration);
        Ok(())
    }

    fn find_spec(&self, name: &str) -> LoadResult<(Arc<dyn Loader>, ModuleSpec)> {
        for loader in &self.loaders {
            if let Some(spec) = loader.find(name)? {
                return Ok((Arc::clone(loader), spec));
            }
        }
        Err(LoadError::NotFound {
            name: name.to_string(),
        })
    }

    /// Hold the import lock, e.g. for the duration of a reload walk.
    pub(crate) fn lock_imports(&self) -> ReentrantMutexGuard<'_, ()> {
        self.import_lock.lock()
    }

    pub(crate) fn set_hook(&self, hook: Option<Arc<dyn ImportHook>>) {
        *self.hook.write() = hook;
    }

    pub fn has_hook(&self) -> bool {
        self.hook.read().is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Module>> {
        self.modules.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.read().contains_key(name)
    }

    /// Drop a module from the registry. Existing handles stay valid.
    pub fn remove(&self, name: &str) -> Option<Arc<Module>> {
        let _guard = self.import_lock.lock();
        self.modules.write().shift_remove(name)
    }

    /// Loaded module names in load order.
    pub fn module_names(&self) -> Vec<String> {
        self.modules.read().keys().cloned().collect()
    }

    /// Source files of all loaded, source-backed modules.
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.modules
            .read()
            .values()
            .filter_map(|m| m.path().map(Path::to_path_buf))
            .collect()
    }

    /// Names of loaded modules whose source is one of `paths`, in load order.
    pub fn modules_for_paths(&self, paths: &HashSet<PathBuf>) -> Vec<String> {
        self.modules
            .read()
            .values()
            .filter(|m| m.path().is_some_and(|p| paths.contains(p)))
            .map(|m| m.name().to_string())
            .collect()
    }
}

/// Builder for [`Runtime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    loaders: Vec<Arc<dyn Loader>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a loader. Earlier loaders win when several can resolve a name.
    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loaders.push(Arc::new(loader));
        self
    }

    pub fn build(self) -> Runtime {
        Runtime {
            loaders: self.loaders,
            modules: RwLock::new(IndexMap::new()),
            import_lock: ReentrantMutex::new(()),
            hook: RwLock::new(None),
        }
    }
}
