// src/schedule/dag_scheduler.rs

//! Per-DAG scheduler: one graph, one strategy, one run.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, warn};

use crate::dag::DagInfo;
use crate::schedule::strategy::{OrderedStrategy, ScheduleStrategy};
use crate::schedule::{max_path, Schedule};
use crate::work::{Work, WorkFailure};

/// Binds a [`DagInfo`] run-copy and a [`ScheduleStrategy`] into the
/// [`Schedule`] contract.
///
/// The scheduler owns mutable clones of the adjacency maps:
/// - a node leaves `remaining` the moment its last dependency succeeds (it
///   is then declared ready to the strategy);
/// - a node's `reverse` entry is popped when the node completes or is
///   invalidated, so `reverse` emptying out is the completion signal.
pub struct DagScheduler<D, S> {
    remaining: HashMap<D, HashSet<D>>,
    reverse: HashMap<D, HashSet<D>>,
    strategy: S,
    failures: Vec<WorkFailure<D>>,
}

impl<D: Work, S: ScheduleStrategy<D>> DagScheduler<D, S> {
    /// Clone the run state out of `info` and seed the strategy with every
    /// node that has no prerequisites.
    pub fn new(info: &DagInfo<D>, mut strategy: S) -> Self {
        let mut remaining = info.remaining_deps().clone();
        let reverse = info.reverse_deps().clone();

        let seeds: Vec<D> = remaining
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(work, _)| work.clone())
            .collect();

        debug!(seeds = seeds.len(), nodes = remaining.len(), "seeding run");

        for seed in seeds {
            remaining.remove(&seed);
            strategy.work_ready(seed);
        }

        Self {
            remaining,
            reverse,
            strategy,
            failures: Vec::new(),
        }
    }

    /// Invalidate `work` and everything that transitively depends on it.
    ///
    /// Cleared nodes never become ready and are never reported as failures.
    fn clear(&mut self, work: D) {
        let mut stack = vec![work];
        while let Some(node) = stack.pop() {
            self.remaining.remove(&node);
            if let Some(dependents) = self.reverse.remove(&node) {
                stack.extend(dependents);
            }
        }
    }
}

impl<D: Work> DagScheduler<D, OrderedStrategy<D>> {
    /// Capture the graph under `root` and wire a longest-path-ordered
    /// strategy over it, unit self-cost.
    pub fn max_path(root: D) -> Self {
        let info = DagInfo::from_root(root);
        let strategy = max_path::strategy(&info, 1);
        Self::new(&info, strategy)
    }
}

impl<D, S> fmt::Debug for DagScheduler<D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DagScheduler")
            .field("blocked", &self.remaining.len())
            .field("outstanding", &self.reverse.len())
            .field("failures", &self.failures.len())
            .finish_non_exhaustive()
    }
}

impl<D: Work, S: ScheduleStrategy<D>> Schedule<D> for DagScheduler<D, S> {
    fn next(&mut self, max: usize) -> Vec<D> {
        self.strategy.next(max)
    }

    fn complete(&mut self, work: D, result: Option<String>) {
        match result {
            None => {
                let Some(dependents) = self.reverse.remove(&work) else {
                    warn!(work = ?work, "completion for unknown work; ignoring");
                    return;
                };
                for dependent in dependents {
                    let unblocked = match self.remaining.get_mut(&dependent) {
                        Some(waiting) => {
                            waiting.remove(&work);
                            waiting.is_empty()
                        }
                        None => false,
                    };
                    if unblocked {
                        self.remaining.remove(&dependent);
                        debug!(work = ?dependent, "dependencies satisfied; work ready");
                        self.strategy.work_ready(dependent);
                    }
                }
            }
            Some(message) => {
                warn!(work = ?work, %message, "work failed; invalidating dependents");
                self.failures.push(WorkFailure {
                    work: work.clone(),
                    message,
                });
                self.clear(work);
            }
        }
    }

    fn has_pending(&self) -> bool {
        self.strategy.has_ready() || !self.remaining.is_empty()
    }

    fn is_complete(&self) -> bool {
        !self.strategy.has_ready() && self.reverse.is_empty()
    }

    fn failures(&mut self) -> Vec<WorkFailure<D>> {
        std::mem::take(&mut self.failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::fixture::Node;

    fn chain() -> (Node, Node, Node) {
        let a = Node::leaf("a");
        let b = Node::new("b", vec![a.clone()]);
        let c = Node::new("c", vec![b.clone()]);
        (a, b, c)
    }

    #[test]
    fn seeds_prerequisite_free_work() {
        let (a, _b, c) = chain();
        let mut schedule = DagScheduler::max_path(c);

        assert!(schedule.has_pending());
        assert!(!schedule.is_complete());
        assert_eq!(schedule.next(4), vec![a]);
        // Nothing else is ready until a completes.
        assert!(schedule.next(4).is_empty());
    }

    #[test]
    fn success_unblocks_dependents_in_order() {
        let (a, b, c) = chain();
        let mut schedule = DagScheduler::max_path(c.clone());

        let first = schedule.next(4);
        assert_eq!(first, vec![a.clone()]);

        schedule.complete(a, None);
        assert_eq!(schedule.next(4), vec![b.clone()]);

        schedule.complete(b, None);
        assert_eq!(schedule.next(4), vec![c.clone()]);

        assert!(!schedule.has_pending());
        schedule.complete(c, None);
        assert!(schedule.is_complete());
        assert!(schedule.failures().is_empty());
    }

    #[test]
    fn failure_records_once_and_clears_dependents() {
        let (a, b, c) = chain();
        let mut schedule = DagScheduler::max_path(c.clone());

        let first = schedule.next(1).remove(0);
        schedule.complete(first, None); // a succeeds
        let next = schedule.next(1).remove(0);
        assert_eq!(next, b);
        schedule.complete(next, Some("boom".to_string()));

        // c never becomes ready and the run is over.
        assert!(schedule.next(4).is_empty());
        assert!(!schedule.has_pending());
        assert!(schedule.is_complete());

        let failures = schedule.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].work, b);
        assert_eq!(failures[0].message, "boom");
        let _ = a;
    }

    #[test]
    fn independent_branches_survive_sibling_failure() {
        let x = Node::leaf("x");
        let y = Node::leaf("y");
        let root1 = Node::new("root1", vec![x.clone()]);
        let root2 = Node::new("root2", vec![y.clone()]);
        let top = Node::new("top", vec![root1.clone(), root2.clone()]);

        let mut schedule = DagScheduler::max_path(top);

        let mut leaves = schedule.next(4);
        leaves.sort_by_key(|n| n.name());
        assert_eq!(leaves, vec![x.clone(), y.clone()]);

        schedule.complete(x, Some("nope".to_string()));
        schedule.complete(y, None);

        // root2 still runs; root1 and top are invalidated.
        assert_eq!(schedule.next(4), vec![root2.clone()]);
        schedule.complete(root2, None);

        assert!(schedule.is_complete());
        let failures = schedule.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].work.name(), "x");
    }

    #[test]
    fn pending_covers_blocked_work_between_completions() {
        let (a, b, c) = chain();
        let mut schedule = DagScheduler::max_path(c);

        let batch = schedule.next(4);
        assert_eq!(batch, vec![a.clone()]);
        // a is in flight: nothing ready, but b and c are still blocked.
        assert!(schedule.has_pending());
        assert!(!schedule.is_complete());
        let _ = (b, a);
    }
}
