// src/schedule/multi.rs

//! Composition of several sub-schedulers behind one front.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::schedule::Schedule;
use crate::work::{Work, WorkFailure};

/// Drives N tagged sub-runs of the same element type.
///
/// `next` round-robins across the live sub-runs and records which sub-run
/// owns each handed-out item, so `complete` can route the outcome back.
/// When a sub-run drains, its failures are absorbed into the combined list,
/// the sub-run is removed, and its tag is surfaced to the caller; this is
/// the hook [`crate::schedule::CompoundScheduler`] uses to trigger
/// "finally" phases.
pub struct MultiScheduler<D, T> {
    subs: BTreeMap<u64, SubRun<D, T>>,
    owners: HashMap<D, u64>,
    next_id: u64,
    failures: Vec<WorkFailure<D>>,
}

struct SubRun<D, T> {
    schedule: Box<dyn Schedule<D> + Send>,
    tag: T,
}

/// A sub-run that has just drained: its tag, and whether it accumulated any
/// failures.
pub struct FinishedSub<T> {
    pub tag: T,
    pub failed: bool,
}

impl<D: Work, T> MultiScheduler<D, T> {
    pub fn new() -> Self {
        Self {
            subs: BTreeMap::new(),
            owners: HashMap::new(),
            next_id: 0,
            failures: Vec::new(),
        }
    }

    /// Install a sub-run; returns its handle for [`Self::finish_if_complete`].
    pub fn add(&mut self, schedule: Box<dyn Schedule<D> + Send>, tag: T) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        debug!(sub = id, "installing sub-run");
        self.subs.insert(id, SubRun { schedule, tag });
        id
    }

    /// Pull up to `max` items, one per live sub-run per pass, recording
    /// ownership as it goes.
    pub fn next(&mut self, max: usize) -> Vec<D> {
        let mut out = Vec::new();
        loop {
            let mut yielded = false;
            let ids: Vec<u64> = self.subs.keys().copied().collect();
            for id in ids {
                if out.len() >= max {
                    return out;
                }
                let Some(sub) = self.subs.get_mut(&id) else {
                    continue;
                };
                for work in sub.schedule.next(1) {
                    self.owners.insert(work.clone(), id);
                    out.push(work);
                    yielded = true;
                }
            }
            if !yielded {
                return out;
            }
        }
    }

    /// Route a completion to the owning sub-run. If that sub-run is now
    /// complete, it is drained and its tag returned.
    pub fn complete(&mut self, work: D, result: Option<String>) -> Option<FinishedSub<T>> {
        let Some(id) = self.owners.remove(&work) else {
            warn!(work = ?work, "completion for work owned by no sub-run; ignoring");
            return None;
        };
        if let Some(sub) = self.subs.get_mut(&id) {
            sub.schedule.complete(work, result);
        }
        self.finish_if_complete(id)
    }

    /// Remove the sub-run if it has drained, absorbing its failures into
    /// the combined list.
    pub fn finish_if_complete(&mut self, id: u64) -> Option<FinishedSub<T>> {
        let finished = self
            .subs
            .get(&id)
            .is_some_and(|sub| sub.schedule.is_complete());
        if !finished {
            return None;
        }

        let mut sub = self.subs.remove(&id)?;
        let sub_failures = sub.schedule.failures();
        let failed = !sub_failures.is_empty();
        debug!(sub = id, failures = sub_failures.len(), "sub-run drained");
        self.failures.extend(sub_failures);
        Some(FinishedSub { tag: sub.tag, failed })
    }

    pub fn has_pending(&self) -> bool {
        self.subs.values().any(|sub| sub.schedule.has_pending())
    }

    /// All sub-runs complete (vacuously true once every one has drained).
    pub fn is_complete(&self) -> bool {
        self.subs.values().all(|sub| sub.schedule.is_complete())
    }

    /// Drain the combined failure list.
    pub fn failures(&mut self) -> Vec<WorkFailure<D>> {
        std::mem::take(&mut self.failures)
    }

    /// Tags of the live sub-runs.
    pub fn tags(&self) -> impl Iterator<Item = &T> {
        self.subs.values().map(|sub| &sub.tag)
    }
}

impl<D: Work, T> Default for MultiScheduler<D, T> {
    fn default() -> Self {
        Self::new()
    }
}
