// src/lib.rs

pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod schedule;
pub mod work;

use tracing::{debug, info};

pub use crate::dag::DagInfo;
pub use crate::errors::{Result, TaskdagError};
pub use crate::exec::{Distributor, WorkRunner};
pub use crate::schedule::{
    CompoundScheduler, DagScheduler, MultiScheduler, OrderedStrategy, Schedule, ScheduleStrategy,
};
pub use crate::work::{SubWork, Work, WorkFailure};

/// High-level entry point.
///
/// Captures the graph under `root`, validates it, and executes every
/// reachable work item across at most `maximum_tasks` concurrent workers,
/// longest dependent chains first. Blocks until all reachable work has
/// completed, failed, or been invalidated, and returns the direct failures
/// (invalidated dependents get no record).
///
/// - `name` labels a node for failure messages.
/// - `action` executes one node: `None` for success, `Some(message)` for
///   failure. Panics are trapped and treated as failures.
/// - `log` supplies the span each node's action runs inside.
pub async fn run<D, N, A, L>(
    root: D,
    name: N,
    action: A,
    maximum_tasks: usize,
    log: L,
) -> Result<Vec<WorkFailure<D>>>
where
    D: Work,
    N: Fn(&D) -> String + Send + Sync + 'static,
    A: Fn(&D) -> Option<String> + Send + Sync + 'static,
    L: Fn(&D) -> tracing::Span + Send + Sync + 'static,
{
    if maximum_tasks == 0 {
        return Err(TaskdagError::ConfigError(
            "maximum_tasks must be >= 1 (got 0)".to_string(),
        ));
    }

    let info = DagInfo::from_root(root);
    dag::validate::ensure_acyclic(&info, &name)?;

    info!(
        nodes = info.len(),
        workers = maximum_tasks,
        "starting work graph run"
    );

    let strategy = schedule::max_path::strategy(&info, 1);
    let scheduler = DagScheduler::new(&info, strategy);
    let compound = CompoundScheduler::new(Box::new(scheduler));
    let runner = WorkRunner::new(name, action, log);

    let failures = Distributor::new(compound, maximum_tasks, runner).run().await;
    debug!(failures = failures.len(), "work graph run finished");
    Ok(failures)
}
