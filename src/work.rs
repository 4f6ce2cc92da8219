// src/work.rs

//! The work-item contract consumed by the execution core.

use std::fmt::Debug;
use std::hash::Hash;

use crate::schedule::Schedule;

/// One schedulable unit of work with declared dependencies.
///
/// Identity is by value equality and a stable hash; implementations are
/// expected to be cheap to clone (e.g. `Arc`-backed). `dependencies` must be
/// pure and stable across calls within one run, and the resulting graph must
/// be acyclic.
pub trait Work: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Direct forward dependencies: work that must complete before this one
    /// can run.
    fn dependencies(&self) -> Vec<Self>;

    /// Compound-work opt-in.
    ///
    /// A node that returns `Some` is never executed directly when first
    /// scheduled; instead the returned substitutive scheduler runs in its
    /// place, followed by the `do_finally` scheduler. See
    /// [`crate::schedule::CompoundScheduler`] for the full lifecycle.
    fn sub_work(&self) -> Option<SubWork<Self>> {
        None
    }
}

/// The sub-DAG pair a compound work item expands into.
pub struct SubWork<D> {
    /// Runs in place of the compound node itself.
    pub schedule: Box<dyn Schedule<D> + Send>,
    /// Runs once `schedule` has drained, whether or not it failed.
    pub do_finally: Box<dyn Schedule<D> + Send>,
}

/// Terminal record for a work item whose action failed.
///
/// Dependents invalidated by a failure are dropped silently and never get a
/// record of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkFailure<D> {
    pub work: D,
    pub message: String,
}
