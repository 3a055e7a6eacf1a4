//! Loaded modules and their attribute namespaces.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::loader::Loader;

/// Attribute value carried across reloads.
pub type Value = serde_json::Value;

/// Callback invoked after a reload with the pre-reload state snapshot.
///
/// Mutating the namespace is the only way to carry state into the new module body.
pub type MigrationHook = Arc<dyn Fn(&StateSnapshot, &mut Namespace) + Send + Sync>;

/// A native function bound into a module namespace.
#[derive(Clone)]
pub struct NativeFn(Arc<dyn Fn(&[Value]) -> Value + Send + Sync>);

impl NativeFn {
    pub fn new(f: impl Fn(&[Value]) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeFn(..)")
    }
}

/// A single namespace entry.
#[derive(Debug, Clone)]
pub enum Attr {
    /// Plain data. Included in state snapshots.
    Value(Value),
    /// Runtime-internal callable. Never snapshotted.
    Function(NativeFn),
}

/// Ordered attribute mapping of a module.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    attrs: IndexMap<String, Attr>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a data attribute, replacing any previous binding.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attrs.insert(key.into(), Attr::Value(value.into()));
    }

    /// Bind a function attribute.
    pub fn define_fn(
        &mut self,
        key: impl Into<String>,
        f: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) {
        self.attrs
            .insert(key.into(), Attr::Function(NativeFn::new(f)));
    }

    /// Data attribute by name. Functions are not returned here.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.attrs.get(key)? {
            Attr::Value(value) => Some(value),
            Attr::Function(_) => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&Attr> {
        self.attrs.get(key)
    }

    /// Call a function attribute. Returns `None` if it is missing or not callable.
    pub fn call(&self, key: &str, args: &[Value]) -> Option<Value> {
        match self.attrs.get(key)? {
            Attr::Function(f) => Some(f.call(args)),
            Attr::Value(_) => None,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Attr> {
        self.attrs.shift_remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Copy every data attribute. Function attributes are left out.
    pub fn snapshot(&self) -> StateSnapshot {
        let values = self
            .attrs
            .iter()
            .filter_map(|(key, attr)| match attr {
                Attr::Value(value) => Some((key.clone(), value.clone())),
                Attr::Function(_) => None,
            })
            .collect();
        StateSnapshot(values)
    }
}

/// Owned copy of a module's data attributes taken right before a reload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot(IndexMap<String, Value>);

impl StateSnapshot {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.0
    }
}

/// Where a module comes from, as resolved by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec {
    /// Dotted module name.
    pub name: String,
    /// Source file backing the module. `None` for built-in modules.
    pub path: Option<PathBuf>,
}

impl ModuleSpec {
    pub fn new(name: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

struct ModuleState {
    namespace: Namespace,
    migration: Option<MigrationHook>,
}

/// A module owned by the [`Runtime`](super::Runtime) registry.
///
/// The namespace is replaced in place on every reload, so `Arc<Module>` handles
/// held by other modules observe the new attributes.
pub struct Module {
    spec: ModuleSpec,
    loader: Arc<dyn Loader>,
    state: RwLock<ModuleState>,
    /// Completed executions of the module body.
    generation: AtomicU64,
}

impl Module {
    pub(crate) fn new(spec: ModuleSpec, loader: Arc<dyn Loader>) -> Self {
        Self {
            spec,
            loader,
            state: RwLock::new(ModuleState {
                namespace: Namespace::new(),
                migration: None,
            }),
            generation: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.spec.path.as_deref()
    }

    pub fn spec(&self) -> &ModuleSpec {
        &self.spec
    }

    /// Only source-backed modules are recorded as dependencies.
    pub fn is_source_backed(&self) -> bool {
        self.spec.path.is_some()
    }

    pub(crate) fn loader(&self) -> &Arc<dyn Loader> {
        &self.loader
    }

    /// Number of times the module body has run to completion.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.read().namespace.get(key).cloned()
    }

    pub fn call(&self, key: &str, args: &[Value]) -> Option<Value> {
        // Clone the function out so the body can touch this module again.
        let f = match self.state.read().namespace.attr(key)? {
            Attr::Function(f) => f.clone(),
            Attr::Value(_) => return None,
        };
        Some(f.call(args))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.read().namespace.contains(key)
    }

    /// Rebind a data attribute at runtime, e.g. to fill a module-level cache.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.state.write().namespace.set(key, value);
    }

    /// Run `f` against a read view of the namespace.
    pub fn with_namespace<R>(&self, f: impl FnOnce(&Namespace) -> R) -> R {
        f(&self.state.read().namespace)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.read().namespace.snapshot()
    }

    pub fn migration_hook(&self) -> Option<MigrationHook> {
        self.state.read().migration.clone()
    }

    pub(crate) fn install(&self, namespace: Namespace, migration: Option<MigrationHook>) {
        let mut state = self.state.write();
        state.namespace = namespace;
        state.migration = migration;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Run a migration hook against the live namespace.
    ///
    /// The hook must not access this module through another handle.
    pub(crate) fn migrate(&self, hook: &MigrationHook, snapshot: &StateSnapshot) {
        let mut state = self.state.write();
        hook(snapshot, &mut state.namespace);
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.spec.name)
            .field("path", &self.spec.path)
            .field("loader", &self.loader.name())
            .field("generation", &self.generation())
            .finish()
    }
}
