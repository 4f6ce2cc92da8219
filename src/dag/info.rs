// src/dag/info.rs

//! Static snapshot of a work graph's forward and reverse adjacency.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::work::Work;

/// Immutable adjacency maps captured once from a root work item.
///
/// `remaining_deps` holds each node's full forward dependency set;
/// `reverse_deps` is the inversion (who depends on whom). Both maps carry an
/// entry for every reachable node, empty sets included, which is what lets a
/// per-run clone treat "key absent" as "already handled".
///
/// Construction does not attempt cycle detection; callers promise
/// acyclicity (see [`crate::dag::validate`]).
#[derive(Debug, Clone)]
pub struct DagInfo<D> {
    remaining_deps: HashMap<D, HashSet<D>>,
    reverse_deps: HashMap<D, HashSet<D>>,
}

impl<D: Work> DagInfo<D> {
    /// Capture the graph reachable from `root` in a single traversal.
    ///
    /// Nodes reachable via multiple paths are visited once; the map-presence
    /// guard makes revisits a no-op.
    pub fn from_root(root: D) -> Self {
        let mut remaining_deps: HashMap<D, HashSet<D>> = HashMap::new();
        let mut reverse_deps: HashMap<D, HashSet<D>> = HashMap::new();

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if remaining_deps.contains_key(&node) {
                continue;
            }

            let deps = node.dependencies();
            reverse_deps.entry(node.clone()).or_default();
            for dep in &deps {
                reverse_deps
                    .entry(dep.clone())
                    .or_default()
                    .insert(node.clone());
            }

            remaining_deps.insert(node, deps.iter().cloned().collect());
            stack.extend(deps);
        }

        debug!(nodes = remaining_deps.len(), "captured work graph");

        Self {
            remaining_deps,
            reverse_deps,
        }
    }
}

impl<D: Work> DagInfo<D> {
    /// All captured nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &D> {
        self.remaining_deps.keys()
    }

    /// Number of captured nodes.
    pub fn len(&self) -> usize {
        self.remaining_deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining_deps.is_empty()
    }

    /// Direct forward dependencies of a node.
    pub fn dependencies_of(&self, node: &D) -> impl Iterator<Item = &D> {
        self.remaining_deps.get(node).into_iter().flatten()
    }

    /// Direct dependents of a node (nodes that list it as a dependency).
    pub fn dependents_of(&self, node: &D) -> impl Iterator<Item = &D> {
        self.reverse_deps.get(node).into_iter().flatten()
    }

    /// Full forward map, for per-run clones.
    pub(crate) fn remaining_deps(&self) -> &HashMap<D, HashSet<D>> {
        &self.remaining_deps
    }

    /// Full reverse map, for per-run clones.
    pub(crate) fn reverse_deps(&self) -> &HashMap<D, HashSet<D>> {
        &self.reverse_deps
    }
}
