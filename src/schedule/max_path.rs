// src/schedule/max_path.rs

//! Longest-path cost assignment over the reverse edges.
//!
//! A node's cost is its own cost plus the maximum cost among the nodes that
//! depend on it, i.e. the length of the longest dependent chain hanging off
//! it. Running high-cost work first keeps the critical path busy.

use std::collections::HashMap;

use tracing::debug;

use crate::dag::DagInfo;
use crate::schedule::strategy::OrderedStrategy;
use crate::work::Work;

/// Build an [`OrderedStrategy`] wired with longest-path costs for `info`.
///
/// `self_cost` is the per-node unit (1 unless callers weight nodes
/// uniformly differently).
pub fn strategy<D: Work>(info: &DagInfo<D>, self_cost: u64) -> OrderedStrategy<D> {
    let table = costs(info, self_cost);
    OrderedStrategy::new(move |work: &D| table.get(work).copied().unwrap_or(self_cost))
}

/// Longest-path cost per node, memoized in a single iterative post-order
/// pass over the reverse edges.
pub fn costs<D: Work>(info: &DagInfo<D>, self_cost: u64) -> HashMap<D, u64> {
    let mut table: HashMap<D, u64> = HashMap::with_capacity(info.len());

    for start in info.nodes() {
        if table.contains_key(start) {
            continue;
        }

        // Two-phase stack: first visit pushes the node back in "expanded"
        // state behind its uncomputed dependents; the second visit finds
        // every dependent cost memoized.
        let mut stack: Vec<(D, bool)> = vec![(start.clone(), false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                let downstream = info
                    .dependents_of(&node)
                    .filter_map(|dependent| table.get(dependent).copied())
                    .max()
                    .unwrap_or(0);
                table.insert(node, self_cost + downstream);
            } else {
                if table.contains_key(&node) {
                    continue;
                }
                stack.push((node.clone(), true));
                for dependent in info.dependents_of(&node) {
                    if !table.contains_key(dependent) {
                        stack.push((dependent.clone(), false));
                    }
                }
            }
        }
    }

    debug!(nodes = table.len(), "assigned longest-path costs");
    table
}
