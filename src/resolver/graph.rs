//! Dependency graph discovery
//!
//! Starting from the requested component, manifests are fetched in
//! breadth-first waves. Every wave is fetched in parallel on the bounded
//! pool, then merged in name order, so the resulting graph (and the first
//! reported error) does not depend on fetch timing.
//!
//! ## Graph Structure
//!
//! ```text
//! BTreeMap<String, Vec<String>>
//!    ↓              ↓
//!  component     [dep1, dep2]   (sorted, deduplicated)
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::error::{RegkitError, Result};
use crate::store::{CachingStore, ComponentBundle};

/// Fetched bundles plus the adjacency list between them
#[derive(Debug, Clone, Default)]
pub struct DiscoveredGraph {
    pub bundles: HashMap<String, Arc<ComponentBundle>>,
    pub edges: BTreeMap<String, Vec<String>>,
}

/// Fetch `root` and everything it transitively depends on.
///
/// No partial graph is returned: a missing or unreadable component fails
/// the whole discovery.
pub fn discover(
    root: &str,
    store: &CachingStore<'_>,
    pool: &rayon::ThreadPool,
) -> Result<DiscoveredGraph> {
    let mut graph = DiscoveredGraph::default();

    // name -> first component (in name order) that required it
    let mut frontier: BTreeMap<String, Option<String>> = BTreeMap::new();
    frontier.insert(root.to_string(), None);
    let mut seen: BTreeSet<String> = BTreeSet::from([root.to_string()]);

    let mut wave = 0usize;
    while !frontier.is_empty() {
        wave += 1;
        debug!(wave, components = frontier.len(), "fetching dependency wave");

        let requests: Vec<(String, Option<String>)> = frontier.into_iter().collect();
        let fetched: Vec<Result<Arc<ComponentBundle>>> = pool.install(|| {
            requests
                .par_iter()
                .map(|(name, _)| store.get(name))
                .collect()
        });

        let mut next: BTreeMap<String, Option<String>> = BTreeMap::new();
        for ((name, required_by), result) in requests.into_iter().zip(fetched) {
            let bundle = result.map_err(|e| match e {
                RegkitError::MissingComponent { name, .. } => RegkitError::MissingComponent {
                    name,
                    required_by: required_by.clone(),
                },
                other => other,
            })?;

            let mut deps = bundle.manifest.registry_dependencies.clone();
            deps.sort();
            deps.dedup();

            for dep in &deps {
                if seen.insert(dep.clone()) {
                    next.insert(dep.clone(), Some(name.clone()));
                }
            }

            graph.edges.insert(name.clone(), deps);
            graph.bundles.insert(name, bundle);
        }
        frontier = next;
    }

    Ok(graph)
}
