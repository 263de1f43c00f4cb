//! Topological sort implementation using depth-first search (DFS)
//!
//! ## Algorithm
//!
//! Uses DFS with three-color marking to detect cycles and produce ordering:
//!
//! 1. **WHITE** (unvisited): Node hasn't been processed
//! 2. **GRAY** (in progress): Node is on the current DFS path
//! 3. **BLACK** (done): Node and all its dependencies have been emitted
//!
//! A GRAY node reached again closes a cycle; the current path from that node
//! onward is the cycle reported to the user.
//!
//! Nodes are emitted in post-order (dependencies first). Dependencies of a
//! node are visited in ascending name order, which makes the order
//! reproducible for a given graph.

use std::collections::{BTreeMap, HashMap};

use crate::error::{RegkitError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Gray,
    Black,
}

/// Context for topological sort operations
struct TopoSortContext<'a> {
    /// Dependency map (adjacency list, each list sorted)
    edges: &'a BTreeMap<String, Vec<String>>,
    /// Absent = WHITE
    colors: HashMap<&'a str, Color>,
    /// Current DFS path, for cycle reporting
    path: Vec<&'a str>,
    /// Result in dependency order
    result: Vec<String>,
}

/// Order every component reachable from `root`, dependencies first.
///
/// # Errors
///
/// [`RegkitError::Cycle`] with the full loop, e.g. `[a, b, c, a]`, or
/// `[a, a]` for a component that depends on itself.
///
/// # Example
///
/// ```text
/// web_search_agent -> [duckduckgo_search_tool, qwant_search_tool]
///
/// Result: [duckduckgo_search_tool, qwant_search_tool, web_search_agent]
/// ```
pub fn topological_sort(root: &str, edges: &BTreeMap<String, Vec<String>>) -> Result<Vec<String>> {
    let Some((root_key, _)) = edges.get_key_value(root) else {
        return Ok(Vec::new());
    };

    let mut ctx = TopoSortContext {
        edges,
        colors: HashMap::new(),
        path: Vec::new(),
        result: Vec::with_capacity(edges.len()),
    };
    topo_dfs(&mut ctx, root_key)?;
    Ok(ctx.result)
}

fn topo_dfs<'a>(ctx: &mut TopoSortContext<'a>, name: &'a str) -> Result<()> {
    match ctx.colors.get(name) {
        Some(Color::Black) => return Ok(()),
        Some(Color::Gray) => {
            let start = ctx.path.iter().position(|n| *n == name).unwrap_or(0);
            let mut cycle: Vec<String> = ctx.path[start..].iter().map(|n| (*n).to_string()).collect();
            cycle.push(name.to_string());
            return Err(RegkitError::Cycle { path: cycle });
        }
        None => {}
    }

    ctx.colors.insert(name, Color::Gray);
    ctx.path.push(name);

    let edges = ctx.edges;
    if let Some(deps) = edges.get(name) {
        for dep in deps {
            topo_dfs(ctx, dep)?;
        }
    }

    ctx.path.pop();
    ctx.colors.insert(name, Color::Black);
    ctx.result.push(name.to_string());
    Ok(())
}
