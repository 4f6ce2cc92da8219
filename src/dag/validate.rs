// src/dag/validate.rs

//! Pre-run acyclicity check for a captured work graph.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::DagInfo;
use crate::errors::{Result, TaskdagError};
use crate::work::Work;

/// Verify that the captured graph is acyclic.
///
/// Builds a petgraph graph over dense node indices with edge direction
/// dependency -> dependent; a topological sort will fail if there is a
/// cycle. `DagInfo` construction itself never checks this, so callers that
/// cannot vouch for their inputs run this first.
pub fn ensure_acyclic<D: Work>(info: &DagInfo<D>, name: impl Fn(&D) -> String) -> Result<()> {
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    let mut index_of: HashMap<&D, usize> = HashMap::new();
    let mut nodes: Vec<&D> = Vec::new();

    for node in info.nodes() {
        index_of.insert(node, nodes.len());
        graph.add_node(nodes.len());
        nodes.push(node);
    }

    for node in info.nodes() {
        let Some(&to) = index_of.get(&node) else {
            continue;
        };
        for dep in info.dependencies_of(node) {
            if let Some(&from) = index_of.get(&dep) {
                graph.add_edge(from, to, ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = nodes[cycle.node_id()];
            Err(TaskdagError::DagCycle(format!(
                "cycle detected in work graph involving '{}'",
                name(node)
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::fixture::Node;

    #[test]
    fn acyclic_graph_passes() {
        let a = Node::leaf("a");
        let b = Node::new("b", vec![a.clone()]);
        let root = Node::new("root", vec![a, b]);

        let info = DagInfo::from_root(root);
        assert!(ensure_acyclic(&info, |n| n.name().to_string()).is_ok());
    }

    #[test]
    fn cycle_is_reported() {
        // A node type whose dependencies come from a fixed topology table,
        // so a cycle can actually be expressed.
        #[derive(Clone, PartialEq, Eq, Hash, Debug)]
        struct Looped(&'static str);

        impl Work for Looped {
            fn dependencies(&self) -> Vec<Looped> {
                match self.0 {
                    "a" => vec![Looped("b")],
                    "b" => vec![Looped("a")],
                    _ => vec![],
                }
            }
        }

        let info = DagInfo::from_root(Looped("a"));
        let err = ensure_acyclic(&info, |n| n.0.to_string()).unwrap_err();
        assert!(matches!(err, TaskdagError::DagCycle(_)));
    }
}
