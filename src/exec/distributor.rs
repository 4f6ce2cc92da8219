// src/exec/distributor.rs

//! Worker pool and the driving loop.
//!
//! The distributor owns the completion queue and is the only mutator of
//! scheduler state. Workers run the caller's action on the blocking pool
//! and publish a `Done` record; the main loop takes exactly one completion
//! per iteration before asking the scheduler for more work, which gives the
//! scheduler a chance to mark newly unblocked work ready.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, error};

use crate::schedule::Schedule;
use crate::work::{Work, WorkFailure};

/// Per-node execution harness: naming, the action itself, and the span
/// factory serving as the node's logger context.
pub struct WorkRunner<D> {
    name: Box<dyn Fn(&D) -> String + Send + Sync>,
    action: Box<dyn Fn(&D) -> Option<String> + Send + Sync>,
    log: Box<dyn Fn(&D) -> tracing::Span + Send + Sync>,
}

impl<D: Work> WorkRunner<D> {
    pub fn new(
        name: impl Fn(&D) -> String + Send + Sync + 'static,
        action: impl Fn(&D) -> Option<String> + Send + Sync + 'static,
        log: impl Fn(&D) -> tracing::Span + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: Box::new(name),
            action: Box::new(action),
            log: Box::new(log),
        }
    }

    /// Run the action for one work item on the blocking pool, inside the
    /// node's span. Panics are trapped and converted to failure messages;
    /// failures are wrapped with the node's name and logged through its
    /// span before being returned.
    async fn invoke(self: Arc<Self>, work: D) -> Option<String> {
        let span = (self.log)(&work);
        let name = (self.name)(&work);

        let join = {
            let runner = Arc::clone(&self);
            let span = span.clone();
            tokio::task::spawn_blocking(move || span.in_scope(|| (runner.action)(&work)))
        }
        .await;

        let outcome = match join {
            Ok(result) => result,
            Err(err) => Some(trap_message(err)),
        };

        outcome.map(|message| {
            let wrapped = format!("Error running {name}: {message}");
            span.in_scope(|| error!("{wrapped}"));
            wrapped
        })
    }
}

/// Turn a worker join error into a failure message.
fn trap_message(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else {
            "action panicked".to_string()
        }
    } else {
        "action was cancelled".to_string()
    }
}

/// Completion record published by workers.
struct Done<D> {
    work: D,
    result: Option<String>,
}

/// Owns the worker cap and drives a [`Schedule`] to completion.
pub struct Distributor<D, S> {
    schedule: S,
    workers: usize,
    runner: Arc<WorkRunner<D>>,
}

impl<D: Work, S: Schedule<D>> Distributor<D, S> {
    pub fn new(schedule: S, workers: usize, runner: WorkRunner<D>) -> Self {
        Self {
            schedule,
            workers,
            runner: Arc::new(runner),
        }
    }

    /// Run everything to completion and return the direct failures.
    ///
    /// The scheduler contract is asserted here: it must never yield more
    /// items than requested, and must yield at least one item when nothing
    /// is in flight and pending work exists.
    pub async fn run(mut self) -> Vec<WorkFailure<D>> {
        assert!(self.workers >= 1, "distributor requires at least one worker");

        let (tx, mut rx) = mpsc::unbounded_channel::<Done<D>>();
        let mut running = 0usize;

        loop {
            if running < self.workers && self.schedule.has_pending() {
                let available = self.workers - running;
                let batch = self.schedule.next(available);
                assert!(
                    batch.len() <= available,
                    "scheduler yielded {} items with only {} workers available",
                    batch.len(),
                    available
                );
                assert!(
                    running > 0 || !batch.is_empty(),
                    "scheduler yielded nothing while idle with pending work"
                );
                for work in batch {
                    running += 1;
                    self.spawn_worker(work, tx.clone());
                }
            }

            if running == 0 && !self.schedule.has_pending() {
                debug!("nothing running and nothing pending; run finished");
                break;
            }

            // Block for exactly one completion. The sender half lives in
            // this scope, so `None` is unreachable while workers exist.
            match rx.recv().await {
                Some(done) => {
                    running -= 1;
                    debug!(work = ?done.work, running, "worker finished");
                    self.schedule.complete(done.work, done.result);
                }
                None => break,
            }
        }

        self.schedule.failures()
    }

    fn spawn_worker(&self, work: D, tx: mpsc::UnboundedSender<Done<D>>) {
        let runner = Arc::clone(&self.runner);
        debug!(work = ?work, "spawning worker");
        tokio::spawn(async move {
            let result = runner.invoke(work.clone()).await;
            let _ = tx.send(Done { work, result });
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc as StdArc, Mutex};

    use super::*;
    use crate::schedule::{CompoundScheduler, DagScheduler};
    use crate::work::fixture::Node;

    fn runner_with_log(
        log: StdArc<Mutex<Vec<&'static str>>>,
        fail: Option<&'static str>,
    ) -> WorkRunner<Node> {
        WorkRunner::new(
            |n: &Node| n.name().to_string(),
            move |n: &Node| {
                log.lock().unwrap().push(n.name());
                if Some(n.name()) == fail {
                    Some("boom".to_string())
                } else {
                    None
                }
            },
            |n: &Node| tracing::info_span!("work", task = %n.name()),
        )
    }

    #[tokio::test]
    async fn runs_a_chain_in_order() {
        let a = Node::leaf("a");
        let b = Node::new("b", vec![a.clone()]);
        let c = Node::new("c", vec![b.clone()]);

        let log = StdArc::new(Mutex::new(Vec::new()));
        let schedule = CompoundScheduler::new(Box::new(DagScheduler::max_path(c)));
        let distributor = Distributor::new(schedule, 4, runner_with_log(StdArc::clone(&log), None));

        let failures = distributor.run().await;
        assert!(failures.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn wraps_failure_messages_with_the_node_name() {
        let a = Node::leaf("a");
        let b = Node::new("b", vec![a.clone()]);

        let log = StdArc::new(Mutex::new(Vec::new()));
        let schedule = CompoundScheduler::new(Box::new(DagScheduler::max_path(b)));
        let distributor =
            Distributor::new(schedule, 2, runner_with_log(StdArc::clone(&log), Some("a")));

        let failures = distributor.run().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].work.name(), "a");
        assert_eq!(failures[0].message, "Error running a: boom");
        // b was invalidated, never called.
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn traps_panicking_actions() {
        let a = Node::leaf("a");

        let runner = WorkRunner::new(
            |n: &Node| n.name().to_string(),
            |_: &Node| -> Option<String> { panic!("kaboom") },
            |n: &Node| tracing::info_span!("work", task = %n.name()),
        );
        let schedule = CompoundScheduler::new(Box::new(DagScheduler::max_path(a)));
        let distributor = Distributor::new(schedule, 1, runner);

        let failures = distributor.run().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].message, "Error running a: kaboom");
    }
}
