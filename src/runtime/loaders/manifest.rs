//! File-backed modules described by TOML manifests.
//!
//! A manifest lists the modules it imports, the attributes it exports and,
//! optionally, which attributes survive a reload:
//!
//! ```toml
//! imports = ["config", "db.pool"]
//!
//! [exports]
//! greeting = "hello"
//! retries = 3
//!
//! [reload]
//! preserve = ["retries"]
//! ```
//!
//! Module `db.pool` resolves to `db/pool.toml` under the first search root that has it.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::runtime::error::{LoadError, LoadResult};
use crate::runtime::loader::{Loader, ModuleScope};
use crate::runtime::module::{ModuleSpec, Value};

const DEFAULT_EXTENSION: &str = "toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    imports: Vec<String>,
    #[serde(default)]
    exports: IndexMap<String, Value>,
    #[serde(default)]
    reload: Option<ReloadSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReloadSection {
    #[serde(default)]
    preserve: Vec<String>,
}

/// Loader for manifest modules under an ordered list of search roots.
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    roots: Vec<PathBuf>,
    extension: String,
}

impl ManifestLoader {
    pub fn new<P: Into<PathBuf>>(roots: impl IntoIterator<Item = P>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Use a different manifest file extension (without the dot).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Map a dotted module name to a manifest file, if one exists.
    ///
    /// Returned paths are canonical so they compare equal to paths reported by
    /// file system watchers.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name.split('.').any(str::is_empty) {
            return None;
        }

        let relative: PathBuf = name.split('.').collect();
        let relative = relative.with_extension(&self.extension);

        self.roots
            .iter()
            .map(|root| root.join(&relative))
            .find(|candidate| candidate.is_file())
            .map(|found| found.canonicalize().unwrap_or(found))
    }

    fn read_manifest(name: &str, path: &Path) -> LoadResult<Manifest> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            name: name.to_string(),
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|e| LoadError::Manifest {
            name: name.to_string(),
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl Loader for ManifestLoader {
    fn name(&self) -> &str {
        "manifest"
    }

    fn find(&self, name: &str) -> LoadResult<Option<ModuleSpec>> {
        Ok(self
            .resolve(name)
            .map(|path| ModuleSpec::new(name, Some(path))))
    }

    fn exec(&self, spec: &ModuleSpec, scope: &mut ModuleScope<'_>) -> LoadResult<()> {
        let Some(path) = spec.path.as_deref() else {
            return Err(LoadError::NotFound {
                name: spec.name.clone(),
            });
        };

        let manifest = Self::read_manifest(&spec.name, path)?;

        for import in &manifest.imports {
            scope.import(import)?;
        }

        for (key, value) in manifest.exports {
            scope.set(key, value);
        }

        let keys = manifest.reload.map(|r| r.preserve).unwrap_or_default();
        if !keys.is_empty() {
            scope.set_migration_hook(move |snapshot, namespace| {
                for key in &keys {
                    if let Some(value) = snapshot.get(key) {
                        namespace.set(key.clone(), value.clone());
                    }
                }
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_resolve_dotted_names() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "db/pool.toml", "");

        let loader = ManifestLoader::new([temp_dir.path()]);
        let resolved = loader.resolve("db.pool").unwrap();
        assert!(resolved.ends_with("db/pool.toml"));
        assert!(loader.resolve("db.missing").is_none());
        assert!(loader.resolve("db..pool").is_none());
        assert!(loader.resolve("").is_none());
    }

    #[test]
    fn test_first_root_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write(first.path(), "shared.toml", "[exports]\norigin = \"first\"\n");
        write(second.path(), "shared.toml", "[exports]\norigin = \"second\"\n");

        let runtime = Runtime::builder()
            .loader(ManifestLoader::new([first.path(), second.path()]))
            .build();
        let module = runtime.import("shared").unwrap();
        assert_eq!(module.get("origin"), Some(json!("first")));
    }

    #[test]
    fn test_exports_and_imports() {
        let temp_dir = TempDir::new().unwrap();
        write(
            temp_dir.path(),
            "app.toml",
            "imports = [\"config\"]\n[exports]\nname = \"app\"\nlimits = { max = 5 }\n",
        );
        write(temp_dir.path(), "config.toml", "[exports]\ndebug = true\n");

        let runtime = Runtime::builder()
            .loader(ManifestLoader::new([temp_dir.path()]))
            .build();
        let app = runtime.import("app").unwrap();

        assert_eq!(app.get("name"), Some(json!("app")));
        assert_eq!(app.get("limits"), Some(json!({"max": 5})));
        assert!(runtime.contains("config"));
        assert!(app.migration_hook().is_none());
    }

    #[test]
    fn test_preserve_builds_migration_hook() {
        let temp_dir = TempDir::new().unwrap();
        write(
            temp_dir.path(),
            "cache.toml",
            "[exports]\nentries = []\n[reload]\npreserve = [\"entries\"]\n",
        );

        let runtime = Runtime::builder()
            .loader(ManifestLoader::new([temp_dir.path()]))
            .build();
        let module = runtime.import("cache").unwrap();
        let hook = module.migration_hook().unwrap();

        let mut snapshot_source = crate::runtime::Namespace::new();
        snapshot_source.set("entries", json!(["warm"]));
        let snapshot = snapshot_source.snapshot();

        let mut fresh = crate::runtime::Namespace::new();
        fresh.set("entries", json!([]));
        hook(&snapshot, &mut fresh);
        assert_eq!(fresh.get("entries"), Some(&json!(["warm"])));
    }

    #[test]
    fn test_malformed_manifest() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "bad.toml", "imports = [unterminated\n");

        let runtime = Runtime::builder()
            .loader(ManifestLoader::new([temp_dir.path()]))
            .build();
        let err = runtime.import("bad").unwrap_err();
        assert!(matches!(err, LoadError::Manifest { .. }));
        assert_eq!(err.module(), "bad");
    }
}
