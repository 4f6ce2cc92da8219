#![allow(dead_code)]

//! `TestWork` graph builders to simplify test setup.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use taskdag::{DagScheduler, SubWork, Work};

/// Arc-backed work item for tests, identified by name.
///
/// Equality and hashing go by name only, so clones and reconstructions of
/// "the same" node compare equal the way the engine expects.
#[derive(Clone)]
pub struct TestWork(Arc<Inner>);

struct Inner {
    name: String,
    deps: Vec<TestWork>,
    sub: Option<SubRoots>,
}

struct SubRoots {
    main: TestWork,
    finally_root: TestWork,
}

impl TestWork {
    /// A node with no dependencies.
    pub fn leaf(name: &str) -> TestWork {
        TestWork::node(name, vec![])
    }

    /// A plain node with the given dependencies.
    pub fn node(name: &str, deps: Vec<TestWork>) -> TestWork {
        TestWork(Arc::new(Inner {
            name: name.to_string(),
            deps,
            sub: None,
        }))
    }

    /// A compound node: `sub_root` runs in its place, `finally_root` runs
    /// once the substitutive graph has drained.
    pub fn compound(
        name: &str,
        deps: Vec<TestWork>,
        sub_root: TestWork,
        finally_root: TestWork,
    ) -> TestWork {
        TestWork(Arc::new(Inner {
            name: name.to_string(),
            deps,
            sub: Some(SubRoots {
                main: sub_root,
                finally_root,
            }),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }
}

impl PartialEq for TestWork {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl Eq for TestWork {}

impl Hash for TestWork {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for TestWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

impl Work for TestWork {
    fn dependencies(&self) -> Vec<TestWork> {
        self.0.deps.clone()
    }

    fn sub_work(&self) -> Option<SubWork<TestWork>> {
        self.0.sub.as_ref().map(|roots| SubWork {
            schedule: Box::new(DagScheduler::max_path(roots.main.clone())),
            do_finally: Box::new(DagScheduler::max_path(roots.finally_root.clone())),
        })
    }
}

/// Name accessor with the signature `taskdag::run` expects.
pub fn name_of(work: &TestWork) -> String {
    work.name().to_string()
}

/// Span factory with the signature `taskdag::run` expects.
pub fn span_of(work: &TestWork) -> tracing::Span {
    tracing::info_span!("work", task = %work.name())
}
