// tests/critical_path.rs
mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;

use taskdag_test_utils::builders::{name_of, span_of, TestWork};
use taskdag_test_utils::recorder::Recorder;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn longer_dependent_chains_are_scheduled_first() -> TestResult {
    with_timeout(async {
        init_tracing();

        // B and C both depend on D and become ready together, but B carries
        // the longer dependent chain (E2 -> E1 -> B), so with a single
        // worker it must be picked before C.
        let d = TestWork::leaf("D");
        let b = TestWork::node("B", vec![d.clone()]);
        let c = TestWork::node("C", vec![d]);
        let a = TestWork::node("A", vec![b.clone(), c]);
        let e1 = TestWork::node("E1", vec![b]);
        let e2 = TestWork::node("E2", vec![e1]);
        let root = TestWork::node("R", vec![a, e2]);

        let recorder = Recorder::new();
        let failures = taskdag::run(root, name_of, recorder.action(), 1, span_of).await?;

        assert!(failures.is_empty());
        assert_eq!(recorder.max_in_flight(), 1);
        assert_eq!(recorder.call_position("D"), Some(0));

        let b_pos = recorder.call_position("B").expect("B ran");
        let c_pos = recorder.call_position("C").expect("C ran");
        assert!(b_pos < c_pos, "critical-path node must be selected first");

        for name in ["R", "A", "B", "C", "D", "E1", "E2"] {
            assert_eq!(recorder.call_count(name), 1);
        }

        Ok(())
    })
    .await
}
