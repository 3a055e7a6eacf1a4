//! Dependency-ordered reloading.

use std::collections::HashSet;
use std::sync::Arc;

use crate::runtime::{ImportHook, Module, Runtime};
use crate::tracker::{Blacklist, ImportTracker};

use super::error::ReloadError;

/// Outcome of a reload walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadReport {
    /// Modules reloaded, in reload order.
    pub reloaded: Vec<String>,
    /// Blacklisted modules whose subtree was pruned.
    pub blacklisted: Vec<String>,
    /// Recorded dependencies that are no longer in the registry.
    pub unresolved: Vec<String>,
}

impl ReloadReport {
    pub fn is_empty(&self) -> bool {
        self.reloaded.is_empty()
    }

    fn note(list: &mut Vec<String>, name: &str) {
        if !list.iter().any(|n| n == name) {
            list.push(name.to_string());
        }
    }
}

/// A module waiting for its dependencies to be reloaded.
struct Frame {
    module: Arc<Module>,
    /// Dependencies in recorded order; popped from the back.
    pending: Vec<String>,
}

/// Dependency tracking and reloading for one [`Runtime`].
///
/// Cheap to clone; clones share the runtime and the tracker, so a handle can be
/// given to a change monitor callback.
#[derive(Clone)]
pub struct Reloader {
    runtime: Arc<Runtime>,
    tracker: Arc<ImportTracker>,
}

impl Reloader {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self {
            runtime,
            tracker: Arc::new(ImportTracker::new()),
        }
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn tracker(&self) -> &Arc<ImportTracker> {
        &self.tracker
    }

    /// Start tracking imports, excluding `exclude` from reloads.
    ///
    /// Enabling twice resets the recorded graph.
    pub fn enable<S: Into<String>>(&self, exclude: impl IntoIterator<Item = S>) {
        let blacklist: Blacklist = exclude.into_iter().collect();
        let excluded = blacklist.len();

        let _guard = self.runtime.lock_imports();
        if self.tracker.activate(blacklist) {
            crate::warn_event!("reload", "tracking was already enabled, dependency graph reset");
        }
        let hook: Arc<dyn ImportHook> = Arc::clone(&self.tracker) as Arc<dyn ImportHook>;
        self.runtime.set_hook(Some(hook));

        crate::log_event!("reload", "tracking enabled", "{excluded} blacklisted");
    }

    /// Stop tracking and drop all recorded dependencies.
    pub fn disable(&self) {
        let _guard = self.runtime.lock_imports();
        self.runtime.set_hook(None);
        self.tracker.deactivate();

        crate::log_event!("reload", "tracking disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.tracker.is_enabled()
    }

    /// Recorded dependency list, or `None` if `name` never imported anything.
    pub fn dependencies_of(&self, name: &str) -> Option<Vec<String>> {
        self.tracker.dependencies_of(name)
    }

    /// Reload `name` after reloading its dependencies.
    pub fn reload(&self, name: &str) -> Result<ReloadReport, ReloadError> {
        self.reload_many([name])
    }

    /// Reload several modules in one walk; each module is reloaded at most once.
    pub fn reload_many<I, S>(&self, names: I) -> Result<ReloadReport, ReloadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let _guard = self.runtime.lock_imports();
        let mut visited = HashSet::new();
        let mut report = ReloadReport::default();

        for name in names {
            self.walk(name.as_ref(), &mut visited, &mut report)?;
        }

        if !report.is_empty() {
            crate::debug_event!("reload", "batch complete", "{:?}", report.reloaded);
        }
        Ok(report)
    }

    /// Post-order walk from `root` over an explicit stack.
    fn walk(
        &self,
        root: &str,
        visited: &mut HashSet<String>,
        report: &mut ReloadReport,
    ) -> Result<(), ReloadError> {
        if self.tracker.is_blacklisted(root) {
            crate::debug_event!("reload", "blacklisted", "{root}");
            ReloadReport::note(&mut report.blacklisted, root);
            return Ok(());
        }
        if visited.contains(root) {
            return Ok(());
        }

        let module = self
            .runtime
            .get(root)
            .ok_or_else(|| ReloadError::NotLoaded {
                name: root.to_string(),
            })?;
        visited.insert(root.to_string());

        let mut stack = vec![self.frame(module)];
        loop {
            let next = match stack.last_mut() {
                Some(frame) => frame.pending.pop(),
                None => break,
            };

            match next {
                Some(dep) => {
                    if visited.contains(&dep) {
                        continue;
                    }
                    if self.tracker.is_blacklisted(&dep) {
                        crate::debug_event!("reload", "blacklisted", "{dep}");
                        ReloadReport::note(&mut report.blacklisted, &dep);
                        continue;
                    }
                    match self.runtime.get(&dep) {
                        Some(module) => {
                            visited.insert(dep);
                            stack.push(self.frame(module));
                        }
                        None => {
                            crate::debug_event!("reload", "unresolved dependency", "{dep}");
                            ReloadReport::note(&mut report.unresolved, &dep);
                        }
                    }
                }
                None => {
                    if let Some(frame) = stack.pop() {
                        self.reload_one(&frame.module)?;
                        report.reloaded.push(frame.module.name().to_string());
                    }
                }
            }
        }

        Ok(())
    }

    fn frame(&self, module: Arc<Module>) -> Frame {
        let pending = self.tracker.dependencies_of(module.name()).unwrap_or_default();
        Frame { module, pending }
    }

    /// Reload a single module, rebuilding its dependency list.
    fn reload_one(&self, module: &Arc<Module>) -> Result<(), ReloadError> {
        let name = module.name();
        self.tracker.forget(name);
        let previous = self.tracker.replace_parent(Some(name.to_string()));

        let result = match module.migration_hook() {
            Some(hook) => {
                let snapshot = module.snapshot();
                self.runtime.reload(module).map(|()| {
                    module.migrate(&hook, &snapshot);
                    crate::debug_event!("reload", "migrated", "{name} ({} values)", snapshot.len());
                })
            }
            None => self.runtime.reload(module),
        };

        self.tracker.replace_parent(previous);

        match result {
            Ok(()) => {
                crate::log_event!("reload", "reloaded", "{name}");
                Ok(())
            }
            Err(source) => {
                tracing::error!("[reload] {name} failed: {source}");
                Err(ReloadError::Load {
                    module: name.to_string(),
                    source,
                })
            }
        }
    }
}
