// tests/scheduler_property.rs

//! Property test driving the pure scheduler layer synchronously over random
//! acyclic graphs with random failure sets.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use taskdag::{CompoundScheduler, DagScheduler, Schedule};
use taskdag_test_utils::builders::TestWork;

proptest! {
    #[test]
    fn random_dags_terminate_with_exact_failure_reporting(
        // Node i may only depend on nodes 0..i, which keeps the graph acyclic.
        raw_deps in proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..6),
            1..10,
        ),
        failing_raw in proptest::collection::vec(any::<usize>(), 0..4),
        workers in 1..4usize,
    ) {
        let n = raw_deps.len();

        // Build the nodes bottom-up and remember the topology by name.
        let mut nodes: Vec<TestWork> = Vec::with_capacity(n);
        let mut topology: HashMap<String, Vec<String>> = HashMap::new();
        for (i, raw) in raw_deps.iter().enumerate() {
            let mut dep_idx: HashSet<usize> = HashSet::new();
            for &r in raw {
                if i > 0 {
                    dep_idx.insert(r % i);
                }
            }
            let deps: Vec<TestWork> = dep_idx.iter().map(|&j| nodes[j].clone()).collect();
            let name = format!("t{i}");
            topology.insert(name.clone(), deps.iter().map(|d| d.name().to_string()).collect());
            nodes.push(TestWork::node(&name, deps));
        }
        let root = TestWork::node("root", nodes.clone());
        topology.insert(
            "root".to_string(),
            nodes.iter().map(|d| d.name().to_string()).collect(),
        );

        let failing: HashSet<String> =
            failing_raw.iter().map(|&r| format!("t{}", r % n)).collect();

        let mut schedule = CompoundScheduler::new(Box::new(DagScheduler::max_path(root)));

        // Simulated worker pool: FIFO completion of in-flight work.
        let mut executing: Vec<TestWork> = Vec::new();
        let mut called: Vec<String> = Vec::new();
        let mut steps = 0;
        loop {
            steps += 1;
            prop_assert!(steps < 10_000, "simulation did not terminate");

            if executing.len() < workers && schedule.has_pending() {
                let batch = schedule.next(workers - executing.len());
                prop_assert!(batch.len() <= workers - executing.len());
                prop_assert!(
                    !executing.is_empty() || !batch.is_empty(),
                    "scheduler stalled with pending work and nothing in flight"
                );
                executing.extend(batch);
            }

            if executing.is_empty() && !schedule.has_pending() {
                break;
            }

            let work = executing.remove(0);
            called.push(work.name().to_string());
            let result = failing.contains(work.name()).then(|| "boom".to_string());
            schedule.complete(work, result);
        }

        prop_assert!(schedule.is_complete());

        // At-most-once.
        let unique: HashSet<&String> = called.iter().collect();
        prop_assert_eq!(unique.len(), called.len());

        // Dependency order and failure cascade: anything that ran had all
        // its dependencies run first, successfully.
        let position: HashMap<&str, usize> = called
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        for (i, name) in called.iter().enumerate() {
            for dep in &topology[name] {
                let dep_pos = position.get(dep.as_str());
                prop_assert!(
                    dep_pos.is_some_and(|p| *p < i),
                    "{} ran before its dependency {}", name, dep
                );
                prop_assert!(
                    !failing.contains(dep.as_str()),
                    "{} ran although its dependency {} failed", name, dep
                );
            }
        }

        // Exactly-reported: one failure per called failing node, nothing for
        // invalidated dependents.
        let failures = schedule.failures();
        let mut reported: Vec<String> =
            failures.iter().map(|f| f.work.name().to_string()).collect();
        reported.sort();
        let mut expected: Vec<String> = called
            .iter()
            .filter(|name| failing.contains(name.as_str()))
            .cloned()
            .collect();
        expected.sort();
        prop_assert_eq!(reported, expected);
        for failure in &failures {
            prop_assert_eq!(failure.message.as_str(), "boom");
        }
    }
}
