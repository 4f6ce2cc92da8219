// src/schedule/strategy.rs

//! Pluggable ready-work policy.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Decides which of the currently-ready work items run next.
///
/// The scheduler declares work ready as its dependencies drain; the
/// strategy hands back up to `max` items per call, highest priority first.
pub trait ScheduleStrategy<D>: Send {
    /// Declare `work` ready to run.
    fn work_ready(&mut self, work: D);

    /// Whether any declared work has not yet been handed out.
    fn has_ready(&self) -> bool;

    /// Remove and return up to `max` items, highest-ordered first.
    fn next(&mut self, max: usize) -> Vec<D>;
}

/// Strategy backed by a sorted set keyed by a caller-supplied cost.
///
/// The full ordering key is (cost, stable hash, insertion sequence), which
/// keeps distinct equal-cost items from collapsing into one set entry and
/// gives a total order even under hash collisions. `next` pops from the
/// max end, so the highest-cost items run first.
pub struct OrderedStrategy<D> {
    ready: BTreeSet<ReadyEntry<D>>,
    cost: Box<dyn Fn(&D) -> u64 + Send>,
    seq: u64,
}

struct ReadyEntry<D> {
    cost: u64,
    hash: u64,
    seq: u64,
    work: D,
}

impl<D> ReadyEntry<D> {
    fn key(&self) -> (u64, u64, u64) {
        (self.cost, self.hash, self.seq)
    }
}

impl<D> PartialEq for ReadyEntry<D> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<D> Eq for ReadyEntry<D> {}

impl<D> PartialOrd for ReadyEntry<D> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<D> Ord for ReadyEntry<D> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl<D: Hash> OrderedStrategy<D> {
    pub fn new(cost: impl Fn(&D) -> u64 + Send + 'static) -> Self {
        Self {
            ready: BTreeSet::new(),
            cost: Box::new(cost),
            seq: 0,
        }
    }

    fn stable_hash(work: &D) -> u64 {
        let mut hasher = DefaultHasher::new();
        work.hash(&mut hasher);
        hasher.finish()
    }
}

impl<D> fmt::Debug for OrderedStrategy<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedStrategy")
            .field("ready", &self.ready.len())
            .finish_non_exhaustive()
    }
}

impl<D: Hash + Send> ScheduleStrategy<D> for OrderedStrategy<D> {
    fn work_ready(&mut self, work: D) {
        let entry = ReadyEntry {
            cost: (self.cost)(&work),
            hash: Self::stable_hash(&work),
            seq: self.seq,
            work,
        };
        self.seq += 1;
        self.ready.insert(entry);
    }

    fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    fn next(&mut self, max: usize) -> Vec<D> {
        let mut out = Vec::new();
        while out.len() < max {
            match self.ready.pop_last() {
                Some(entry) => out.push(entry.work),
                None => break,
            }
        }
        out
    }
}
