//! Import interception that records the dependency graph.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::runtime::{ImportHook, LoadResult, Module};

use super::blacklist::Blacklist;
use super::graph::DependencyGraph;

#[derive(Debug, Default)]
struct TrackerState {
    graph: DependencyGraph,
    blacklist: Blacklist,
    /// Module currently being imported or reloaded.
    parent: Option<String>,
    enabled: bool,
}

/// Records which module caused which other module to be imported.
///
/// Installed on a [`Runtime`](crate::runtime::Runtime) as its [`ImportHook`]. The
/// state lock is never held while the underlying import runs; serialization of
/// the whole import sequence comes from the runtime's import lock.
#[derive(Debug, Default)]
pub struct ImportTracker {
    state: Mutex<TrackerState>,
}

impl ImportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all state and start tracking. Returns whether tracking was already on.
    pub(crate) fn activate(&self, blacklist: Blacklist) -> bool {
        let mut state = self.state.lock();
        let was_enabled = state.enabled;
        state.graph.clear();
        state.blacklist = blacklist;
        state.parent = None;
        state.enabled = true;
        was_enabled
    }

    /// Stop tracking and forget everything.
    pub(crate) fn deactivate(&self) {
        let mut state = self.state.lock();
        state.graph.clear();
        state.blacklist = Blacklist::new();
        state.parent = None;
        state.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn dependencies_of(&self, name: &str) -> Option<Vec<String>> {
        self.state
            .lock()
            .graph
            .dependencies_of(name)
            .map(<[String]>::to_vec)
    }

    pub fn is_blacklisted(&self, name: &str) -> bool {
        self.state.lock().blacklist.contains(name)
    }

    pub fn blacklist(&self) -> Blacklist {
        self.state.lock().blacklist.clone()
    }

    /// Copy of the current graph.
    pub fn graph(&self) -> DependencyGraph {
        self.state.lock().graph.clone()
    }

    pub fn parent(&self) -> Option<String> {
        self.state.lock().parent.clone()
    }

    /// Set the parent pointer, returning the previous value for restoring.
    pub(crate) fn replace_parent(&self, parent: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.state.lock().parent, parent)
    }

    /// Remove a module's dependency list before it is rebuilt by a reload.
    pub(crate) fn forget(&self, name: &str) -> Option<Vec<String>> {
        self.state.lock().graph.remove(name)
    }
}

impl ImportHook for ImportTracker {
    fn on_import(
        &self,
        name: &str,
        import: &mut dyn FnMut() -> LoadResult<Arc<Module>>,
    ) -> LoadResult<Arc<Module>> {
        let parent = self.replace_parent(Some(name.to_string()));

        let result = import();

        let mut state = self.state.lock();
        if let (Ok(module), Some(parent)) = (&result, parent.as_deref()) {
            // Built-ins have no source to reload, so they never become dependencies.
            if module.is_source_backed() {
                state.graph.record(parent, module.name());
                crate::debug_event!("tracker", "recorded", "{parent} -> {}", module.name());
            }
        }
        state.parent = parent;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{InitializerLoader, LoadError, ModuleDef, Runtime};

    fn runtime_with(loader: InitializerLoader, tracker: &Arc<ImportTracker>) -> Runtime {
        let runtime = Runtime::builder().loader(loader).build();
        let hook: Arc<dyn ImportHook> = tracker.clone();
        runtime.set_hook(Some(hook));
        runtime
    }

    #[test]
    fn test_records_nested_imports_only() {
        let loader = InitializerLoader::new()
            .module(
                ModuleDef::new("a", |scope| {
                    scope.import("b")?;
                    scope.import("builtin")?;
                    scope.import("c")?;
                    scope.import("b")?;
                    Ok(())
                })
                .path("a.rs"),
            )
            .module(ModuleDef::new("b", |_| Ok(())).path("b.rs"))
            .module(ModuleDef::new("c", |_| Ok(())).path("c.rs"))
            .module(ModuleDef::new("builtin", |_| Ok(())));
        let tracker = Arc::new(ImportTracker::new());
        tracker.activate(Blacklist::new());
        let runtime = runtime_with(loader, &tracker);

        runtime.import("a").unwrap();

        assert_eq!(tracker.dependencies_of("a").unwrap(), vec!["b", "c", "b"]);
        // Top-level import is nobody's dependency, leaves have no entry.
        assert_eq!(tracker.graph().dependents_of("a"), Vec::<&str>::new());
        assert!(tracker.dependencies_of("b").is_none());
        assert!(tracker.parent().is_none());
    }

    #[test]
    fn test_parent_restored_after_failure() {
        let loader = InitializerLoader::new()
            .module(
                ModuleDef::new("a", |scope| {
                    let _ = scope.import("broken");
                    scope.import("b")?;
                    Ok(())
                })
                .path("a.rs"),
            )
            .module(
                ModuleDef::new("broken", |scope| {
                    Err(LoadError::exec(scope.name(), "syntax error"))
                })
                .path("broken.rs"),
            )
            .module(ModuleDef::new("b", |_| Ok(())).path("b.rs"));
        let tracker = Arc::new(ImportTracker::new());
        tracker.activate(Blacklist::new());
        let runtime = runtime_with(loader, &tracker);

        runtime.import("a").unwrap();

        assert_eq!(tracker.dependencies_of("a").unwrap(), vec!["b"]);
        assert!(tracker.parent().is_none());
    }

    #[test]
    fn test_deactivate_clears_state() {
        let tracker = ImportTracker::new();
        tracker.activate(["x"].into_iter().collect());
        tracker.replace_parent(Some("a".to_string()));
        tracker.state.lock().graph.record("a", "b");

        tracker.deactivate();

        assert!(!tracker.is_enabled());
        assert!(tracker.dependencies_of("a").is_none());
        assert!(tracker.blacklist().is_empty());
        assert!(tracker.parent().is_none());
    }
}
