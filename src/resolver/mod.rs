//! Dependency resolution
//!
//! Turns a requested component name into a deduplicated, dependency-first
//! install order:
//!
//! 1. [`graph::discover`] fetches the root and every transitive
//!    `registry_dependencies` entry through a run-scoped [`CachingStore`]
//! 2. [`sort::topological_sort`] orders the discovered graph, failing on cycles
//!
//! Nothing is handed to later stages unless both steps succeed.

pub mod graph;
pub mod sort;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{RegkitError, Result};
use crate::store::{CachingStore, ComponentBundle, ManifestStore};

/// Default worker limit: available parallelism, capped
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
        .min(8)
}

/// Build the bounded worker pool shared by fetching and writing
pub(crate) fn build_pool(jobs: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .thread_name(|i| format!("regkit-worker-{i}"))
        .build()
        .map_err(|e| RegkitError::Io {
            message: format!("failed to start worker pool: {e}"),
        })
}

/// A fully resolved dependency graph
#[derive(Debug, Clone)]
pub struct ResolvedGraph {
    /// Component names, dependencies first
    pub order: Vec<String>,
    pub bundles: HashMap<String, Arc<ComponentBundle>>,
    /// Direct registry dependencies per component (sorted)
    pub edges: BTreeMap<String, Vec<String>>,
}

impl ResolvedGraph {
    pub fn bundle(&self, name: &str) -> Option<&ComponentBundle> {
        self.bundles.get(name).map(Arc::as_ref)
    }

    /// Bundles in install order
    pub fn ordered_bundles(&self) -> impl Iterator<Item = &ComponentBundle> {
        self.order.iter().filter_map(|name| self.bundle(name))
    }

    /// Every component that depends on `name`, directly or transitively
    pub fn transitive_dependents(&self, name: &str) -> BTreeSet<String> {
        transitive_dependents(&self.edges, name)
    }
}

/// Every component in `edges` that reaches `name`
pub fn transitive_dependents(edges: &BTreeMap<String, Vec<String>>, name: &str) -> BTreeSet<String> {
    let mut dependents = BTreeSet::new();
    let mut pending = vec![name.to_string()];
    while let Some(current) = pending.pop() {
        for (component, deps) in edges {
            if deps.contains(&current) && dependents.insert(component.clone()) {
                pending.push(component.clone());
            }
        }
    }
    dependents.remove(name);
    dependents
}

/// Resolves dependency graphs against one store
pub struct Resolver<'a> {
    store: CachingStore<'a>,
    jobs: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn ManifestStore) -> Self {
        Self {
            store: CachingStore::new(store),
            jobs: default_jobs(),
        }
    }

    /// Limit concurrent fetches
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Resolve `root` into an install order.
    ///
    /// Fails with [`RegkitError::MissingComponent`] or [`RegkitError::Cycle`]
    /// before any later stage runs.
    pub fn resolve(&self, root: &str) -> Result<ResolvedGraph> {
        debug!(component = %root, jobs = self.jobs, "resolving dependencies");
        let pool = build_pool(self.jobs)?;
        let graph::DiscoveredGraph { bundles, edges } = graph::discover(root, &self.store, &pool)?;
        let order = sort::topological_sort(root, &edges)?;

        info!(component = %root, components = order.len(), "resolved dependency order");
        Ok(ResolvedGraph {
            order,
            bundles,
            edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ComponentManifest, ComponentType};
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn store(components: &[(&str, &[&str])]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for (name, deps) in components {
            let manifest = deps.iter().fold(
                ComponentManifest::new(*name, ComponentType::Tool, "tools"),
                |m, d| m.with_dependency(*d),
            );
            store.insert(ComponentBundle::new(manifest));
        }
        store
    }

    #[test]
    fn test_resolve_web_search_agent() {
        let store = store(&[
            (
                "web_search_agent",
                &["qwant_search_tool", "duckduckgo_search_tool"],
            ),
            ("duckduckgo_search_tool", &[]),
            ("qwant_search_tool", &[]),
        ]);

        let graph = Resolver::new(&store).resolve("web_search_agent").unwrap();
        assert_eq!(
            graph.order,
            vec![
                "duckduckgo_search_tool",
                "qwant_search_tool",
                "web_search_agent"
            ]
        );
        assert_eq!(graph.ordered_bundles().count(), 3);
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let store = store(&[
            ("app", &["b", "a"]),
            ("a", &["c"]),
            ("b", &["c", "a"]),
            ("c", &[]),
        ]);
        let graph = Resolver::new(&store).with_jobs(1).resolve("app").unwrap();

        let pos = |n: &str| graph.order.iter().position(|x| x == n).unwrap();
        for (component, deps) in &graph.edges {
            for dep in deps {
                assert!(pos(dep) < pos(component), "{dep} must precede {component}");
            }
        }
    }

    #[test]
    fn test_cycle_is_fatal() {
        let store = store(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        match Resolver::new(&store).resolve("a").unwrap_err() {
            RegkitError::Cycle { path } => assert_eq!(path, vec!["a", "b", "c", "a"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_root() {
        let store = store(&[]);
        assert!(matches!(
            Resolver::new(&store).resolve("ghost"),
            Err(RegkitError::MissingComponent { required_by: None, .. })
        ));
    }

    #[test]
    fn test_transitive_dependents() {
        let store = store(&[("a", &["b"]), ("b", &["c"]), ("c", &[]), ("d", &[])]);
        let graph = Resolver::new(&store).resolve("a").unwrap();
        assert_eq!(
            graph.transitive_dependents("c").into_iter().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert!(graph.transitive_dependents("a").is_empty());
    }
}
