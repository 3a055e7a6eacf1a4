//! Import graph recorded by the tracker.

use indexmap::IndexMap;

/// Module name -> modules it directly imported, in import order.
///
/// Repeated imports of the same child are recorded every time; the reload walk
/// de-duplicates. Modules that never imported anything have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: IndexMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `child` to `parent`'s dependency list.
    pub fn record(&mut self, parent: &str, child: &str) {
        self.edges
            .entry(parent.to_string())
            .or_default()
            .push(child.to_string());
    }

    pub fn dependencies_of(&self, name: &str) -> Option<&[String]> {
        self.edges.get(name).map(Vec::as_slice)
    }

    /// Drop a module's entry ahead of rebuilding it.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.edges.shift_remove(name)
    }

    /// Modules that recorded `name` as a direct dependency.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.iter().any(|d| d == name))
            .map(|(parent, _)| parent.as_str())
            .collect()
    }

    pub fn parents(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_order_and_duplicates() {
        let mut graph = DependencyGraph::new();
        graph.record("a", "b");
        graph.record("a", "c");
        graph.record("a", "b");

        assert_eq!(
            graph.dependencies_of("a").unwrap(),
            &["b".to_string(), "c".to_string(), "b".to_string()]
        );
        assert!(graph.dependencies_of("b").is_none());
    }

    #[test]
    fn test_remove_and_dependents() {
        let mut graph = DependencyGraph::new();
        graph.record("a", "c");
        graph.record("b", "c");
        graph.record("b", "d");

        let mut dependents = graph.dependents_of("c");
        dependents.sort_unstable();
        assert_eq!(dependents, vec!["a", "b"]);

        assert_eq!(graph.remove("b"), Some(vec!["c".to_string(), "d".to_string()]));
        assert_eq!(graph.dependents_of("c"), vec!["a"]);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.parents().collect::<Vec<_>>(), vec!["a"]);
    }
}
