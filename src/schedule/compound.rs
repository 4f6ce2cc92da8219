// src/schedule/compound.rs

//! Compound-work expansion on top of [`MultiScheduler`].
//!
//! A compound work item is never handed to a worker when first yielded.
//! Its substitutive sub-scheduler runs in its place; once that drains, the
//! stored "finally" sub-scheduler is installed unconditionally, and the
//! compound node itself either becomes runnable (sub-run clean) or is
//! failed with [`SUB_WORK_FAILED`] so its outer dependents are invalidated.

use tracing::debug;

use crate::schedule::multi::{FinishedSub, MultiScheduler};
use crate::schedule::strategy::{OrderedStrategy, ScheduleStrategy};
use crate::schedule::Schedule;
use crate::work::{SubWork, Work, WorkFailure};

/// Failure message recorded for a compound node whose sub-run failed.
pub const SUB_WORK_FAILED: &str = "One or more subtasks failed";

/// Wraps a [`MultiScheduler`] to implement sub-DAG expansion.
pub struct CompoundScheduler<D> {
    multi: MultiScheduler<D, Option<PendingFinally<D>>>,
    /// Compound nodes whose sub-run succeeded: the node's own work is now
    /// the only thing left to run for it.
    final_work: OrderedStrategy<D>,
}

/// Tag carried by a compound node's substitutive sub-run.
struct PendingFinally<D> {
    work: D,
    do_finally: Box<dyn Schedule<D> + Send>,
}

impl<D: Work> CompoundScheduler<D> {
    /// Wrap `top` as the outermost sub-run.
    pub fn new(top: Box<dyn Schedule<D> + Send>) -> Self {
        let mut scheduler = Self {
            multi: MultiScheduler::new(),
            final_work: OrderedStrategy::new(|_| 0),
        };
        let id = scheduler.multi.add(top, None);
        if let Some(finished) = scheduler.multi.finish_if_complete(id) {
            scheduler.sub_run_finished(finished);
        }
        scheduler
    }

    /// Install a compound node's substitutive sub-run; the node stays
    /// logically in flight, owned by whichever sub-run yielded it.
    fn expand(&mut self, work: D, sub: SubWork<D>) {
        debug!(work = ?work, "expanding compound work into a sub-run");
        let id = self.multi.add(
            sub.schedule,
            Some(PendingFinally {
                work,
                do_finally: sub.do_finally,
            }),
        );
        // An empty substitutive graph drains on the spot.
        if let Some(finished) = self.multi.finish_if_complete(id) {
            self.sub_run_finished(finished);
        }
    }

    /// React to a drained sub-run: schedule its "finally" phase, then let
    /// the compound node run or fail.
    fn sub_run_finished(&mut self, finished: FinishedSub<Option<PendingFinally<D>>>) {
        let Some(PendingFinally { work, do_finally }) = finished.tag else {
            // Outermost or "finally" sub-run: nothing further to schedule.
            return;
        };

        let id = self.multi.add(do_finally, None);
        if let Some(fin) = self.multi.finish_if_complete(id) {
            self.sub_run_finished(fin);
        }

        if finished.failed {
            debug!(work = ?work, "sub-run failed; failing compound work");
            self.complete(work, Some(SUB_WORK_FAILED.to_string()));
        } else {
            debug!(work = ?work, "sub-run clean; compound work may run");
            self.final_work.work_ready(work);
        }
    }
}

impl<D: Work> Schedule<D> for CompoundScheduler<D> {
    /// Drain final work first, then pull from the sub-runs, expanding any
    /// compound items on the way. Expansion does not count against `max`,
    /// so the loop keeps pulling until `max` is reached or nothing new
    /// shows up.
    fn next(&mut self, max: usize) -> Vec<D> {
        let mut out = self.final_work.next(max);
        while out.len() < max {
            let batch = self.multi.next(max - out.len());
            let pulled = !batch.is_empty();
            for work in batch {
                match work.sub_work() {
                    Some(sub) => self.expand(work, sub),
                    None => out.push(work),
                }
            }
            if out.len() < max {
                out.extend(self.final_work.next(max - out.len()));
            }
            if !pulled {
                break;
            }
        }
        out
    }

    fn complete(&mut self, work: D, result: Option<String>) {
        if let Some(finished) = self.multi.complete(work, result) {
            self.sub_run_finished(finished);
        }
    }

    fn has_pending(&self) -> bool {
        self.final_work.has_ready()
            || self.multi.has_pending()
            || self.multi.tags().any(|tag| tag.is_some())
    }

    fn is_complete(&self) -> bool {
        self.multi.is_complete() && !self.final_work.has_ready()
    }

    fn failures(&mut self) -> Vec<WorkFailure<D>> {
        self.multi.failures()
    }
}
