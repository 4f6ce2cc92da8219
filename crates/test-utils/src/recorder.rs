#![allow(dead_code)]

//! Recording action harness for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::builders::TestWork;

/// Records every action invocation and tracks how many run concurrently.
///
/// Failures can be scripted per node name; everything else succeeds. An
/// optional per-call delay widens the window in which concurrent actions
/// overlap.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Inner>);

#[derive(Default)]
struct Inner {
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    failures: Mutex<HashMap<String, String>>,
    delay: Mutex<Option<Duration>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a failure for the named node.
    pub fn fail(&self, name: &str, message: &str) {
        self.0
            .failures
            .lock()
            .unwrap()
            .insert(name.to_string(), message.to_string());
    }

    /// Sleep this long inside every action.
    pub fn set_delay(&self, delay: Duration) {
        *self.0.delay.lock().unwrap() = Some(delay);
    }

    /// The recorded invocations, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.0.calls.lock().unwrap().clone()
    }

    /// Position of the first call for `name`, if it ran.
    pub fn call_position(&self, name: &str) -> Option<usize> {
        self.calls().iter().position(|n| n == name)
    }

    pub fn ran(&self, name: &str) -> bool {
        self.call_position(name).is_some()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls().iter().filter(|n| n.as_str() == name).count()
    }

    /// Highest number of actions observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.0.max_in_flight.load(Ordering::SeqCst)
    }

    /// An action that records and then succeeds (unless scripted to fail).
    pub fn action(&self) -> impl Fn(&TestWork) -> Option<String> + Send + Sync + 'static {
        let recorder = self.clone();
        move |work| recorder.invoke(work, |_| None)
    }

    /// An action that records, then defers to `custom` for the outcome of
    /// nodes without a scripted failure.
    pub fn action_with(
        &self,
        custom: impl Fn(&TestWork) -> Option<String> + Send + Sync + 'static,
    ) -> impl Fn(&TestWork) -> Option<String> + Send + Sync + 'static {
        let recorder = self.clone();
        move |work| recorder.invoke(work, &custom)
    }

    fn invoke(
        &self,
        work: &TestWork,
        custom: impl Fn(&TestWork) -> Option<String>,
    ) -> Option<String> {
        let now = self.0.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.0.calls.lock().unwrap().push(work.name().to_string());

        let delay = *self.0.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let scripted = self.0.failures.lock().unwrap().get(work.name()).cloned();
        let result = match scripted {
            Some(message) => Some(message),
            None => custom(work),
        };

        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
