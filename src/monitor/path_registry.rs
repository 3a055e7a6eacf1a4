//! Module source files and the directories that must be watched for them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Tracked source files plus their parent directories.
///
/// Watchers subscribe to directories, not files, so that editors replacing a
/// file via rename are still observed.
#[derive(Debug, Default)]
pub struct PathRegistry {
    paths: HashSet<PathBuf>,
    watch_dirs: HashSet<PathBuf>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `paths`, returning directories that were not watched before.
    pub fn add_paths(&mut self, paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
        let mut new_dirs = Vec::new();

        for path in paths {
            let dir = Self::watch_dir_for(&path);
            if !self.paths.insert(path) {
                continue;
            }
            let Some(dir) = dir else { continue };
            if self.watch_dirs.insert(dir.clone()) {
                new_dirs.push(dir);
            }
        }

        new_dirs
    }

    /// Directory to watch for `path`; bare file names map to `.`.
    fn watch_dir_for(path: &Path) -> Option<PathBuf> {
        path.parent().map(|parent| {
            if parent.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                parent.to_path_buf()
            }
        })
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn watch_dirs(&self) -> &HashSet<PathBuf> {
        &self.watch_dirs
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn dir_count(&self) -> usize {
        self.watch_dirs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_registry_basic() {
        let mut registry = PathRegistry::new();

        let new_dirs = registry.add_paths(vec![
            PathBuf::from("/project/modules/app.toml"),
            PathBuf::from("/project/modules/db.toml"),
            PathBuf::from("/project/modules/db/pool.toml"),
        ]);

        assert_eq!(new_dirs.len(), 2);
        assert!(new_dirs.contains(&PathBuf::from("/project/modules")));
        assert!(new_dirs.contains(&PathBuf::from("/project/modules/db")));
        assert_eq!(registry.path_count(), 3);
        assert!(registry.contains(Path::new("/project/modules/app.toml")));
    }

    #[test]
    fn test_path_registry_only_reports_new_dirs() {
        let mut registry = PathRegistry::new();
        let path = PathBuf::from("/project/modules/app.toml");

        assert_eq!(registry.add_paths(vec![path.clone()]).len(), 1);
        assert!(registry.add_paths(vec![path]).is_empty());
        assert!(
            registry
                .add_paths(vec![PathBuf::from("/project/modules/other.toml")])
                .is_empty()
        );
        assert_eq!(registry.path_count(), 2);
        assert_eq!(registry.dir_count(), 1);
        assert!(registry.watch_dirs().contains(Path::new("/project/modules")));
    }

    #[test]
    fn test_path_registry_root_files() {
        let mut registry = PathRegistry::new();
        let dirs = registry.add_paths(vec![PathBuf::from("app.toml")]);
        assert_eq!(dirs, vec![PathBuf::from(".")]);
    }
}
