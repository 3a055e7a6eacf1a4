//! Loader trait and the execution scope handed to module bodies.

use std::sync::Arc;

use super::error::LoadResult;
use super::module::{MigrationHook, Module, ModuleSpec, Namespace, StateSnapshot, Value};
use super::registry::Runtime;

/// A source of modules.
///
/// Loaders are consulted in registration order. `exec` runs the module body and is
/// called again, with the same spec, on every reload.
pub trait Loader: Send + Sync {
    /// Loader name for logging.
    fn name(&self) -> &str;

    /// Resolve a module name. `Ok(None)` lets the next loader try.
    fn find(&self, name: &str) -> LoadResult<Option<ModuleSpec>>;

    /// Execute the module body into `scope`.
    fn exec(&self, spec: &ModuleSpec, scope: &mut ModuleScope<'_>) -> LoadResult<()>;
}

/// Execution context of a single module body run.
///
/// Bindings go into a fresh namespace that replaces the module's namespace once the
/// body completes. Imports are routed through the runtime, so they are tracked.
pub struct ModuleScope<'rt> {
    runtime: &'rt Runtime,
    name: String,
    namespace: Namespace,
    migration: Option<MigrationHook>,
}

impl<'rt> ModuleScope<'rt> {
    pub(crate) fn new(runtime: &'rt Runtime, name: &str) -> Self {
        Self {
            runtime,
            name: name.to_string(),
            namespace: Namespace::new(),
            migration: None,
        }
    }

    /// Name of the module being executed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Import another module on behalf of this one.
    pub fn import(&mut self, name: &str) -> LoadResult<Arc<Module>> {
        self.runtime.import(name)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.namespace.set(key, value);
    }

    pub fn define_fn(
        &mut self,
        key: impl Into<String>,
        f: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) {
        self.namespace.define_fn(key, f);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.namespace.get(key)
    }

    /// Register the hook used to carry state into the next reload of this module.
    pub fn set_migration_hook(
        &mut self,
        hook: impl Fn(&StateSnapshot, &mut Namespace) + Send + Sync + 'static,
    ) {
        self.migration = Some(Arc::new(hook));
    }

    pub(crate) fn finish(self) -> (Namespace, Option<MigrationHook>) {
        (self.namespace, self.migration)
    }
}
