//! Integration tests for condition evaluation and the sample policies.
//!
//! Covers:
//! - Concurrent fan-out, no short-circuiting, declaration-ordered failures
//! - NoCancelledDependencies / NoFailedDependencies / resolvers / silent
//! - Panicking conditions

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{counting, make_queue, wait_finished, EventLog};
use prometheus_operations::conditions::{
    NoCancelledDependencies, NoFailedDependencies, Resolution, SilentCondition,
};
use prometheus_operations::core::{
    Condition, ConditionEvaluator, ConditionResult, ErrorPurpose, Operation, OperationError,
    Outcome,
};
use rand::Rng;

// ============================================================================
// TEST CONDITIONS
// ============================================================================

/// Sleeps, logs its label, then yields a fixed result.
struct Delayed {
    label: &'static str,
    delay: Duration,
    fail: bool,
    log: EventLog,
}

impl Delayed {
    fn new(label: &'static str, delay_ms: u64, fail: bool, log: &EventLog) -> Self {
        Self {
            label,
            delay: Duration::from_millis(delay_ms),
            fail,
            log: log.clone(),
        }
    }
}

#[async_trait]
impl Condition for Delayed {
    fn name(&self) -> String {
        self.label.to_string()
    }

    async fn evaluate(&self, _operation: &Operation) -> ConditionResult {
        tokio::time::sleep(self.delay).await;
        self.log.push(self.label);
        if self.fail {
            ConditionResult::Failed(OperationError::ConditionFailed {
                condition: self.label.to_string(),
                reason: "rejected".into(),
            })
        } else {
            ConditionResult::Satisfied
        }
    }
}

/// Waits until all parties have started evaluating.
struct Rendezvous {
    barrier: Arc<tokio::sync::Barrier>,
}

#[async_trait]
impl Condition for Rendezvous {
    async fn evaluate(&self, _operation: &Operation) -> ConditionResult {
        self.barrier.wait().await;
        ConditionResult::Satisfied
    }
}

struct Companion;

#[async_trait]
impl Condition for Companion {
    fn dependency_for(&self, _operation: &Operation) -> Option<Operation> {
        Some(Operation::from_fn("companion", |_| {
            Outcome::from(Err(OperationError::Execution("companion must not run".into())))
        }))
    }

    async fn evaluate(&self, _operation: &Operation) -> ConditionResult {
        ConditionResult::Satisfied
    }
}

struct Exploding;

#[async_trait]
impl Condition for Exploding {
    async fn evaluate(&self, _operation: &Operation) -> ConditionResult {
        panic!("condition exploded")
    }
}

fn failing(name: &str, message: &str) -> Operation {
    let message = message.to_string();
    Operation::from_fn(name, move |_| {
        Outcome::from(Err(OperationError::Execution(message.clone())))
    })
}

fn condition_names(errors: &[OperationError]) -> Vec<String> {
    errors
        .iter()
        .map(|error| match error {
            OperationError::ConditionFailed { condition, .. } => condition.clone(),
            other => panic!("unexpected error {other:?}"),
        })
        .collect()
}

// ============================================================================
// EVALUATOR
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failures_follow_declaration_order() {
    let queue = make_queue("order", 2);
    let log = EventLog::default();
    let runs = Arc::new(AtomicUsize::new(0));
    let op = counting("guarded", &runs);
    op.add_condition(Delayed::new("c1", 120, true, &log));
    op.add_condition(Delayed::new("c2", 60, false, &log));
    op.add_condition(Delayed::new("c3", 0, true, &log));

    queue.submit(&op);
    wait_finished(&op).await;

    assert_eq!(log.events(), vec!["c3", "c2", "c1"]);
    assert_eq!(condition_names(&op.errors().unwrap()), vec!["c1", "c3"]);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_all_conditions_evaluated_with_random_delays() {
    let queue = make_queue("random", 2);
    let log = EventLog::default();
    let op = Operation::noop("guarded");
    let labels = ["k0", "k1", "k2", "k3", "k4", "k5", "k6", "k7"];
    let mut expected = Vec::new();
    {
        let mut rng = rand::rng();
        for (index, label) in labels.into_iter().enumerate() {
            // The first condition always fails so later ones must not be skipped.
            let fail = index == 0 || rng.random_bool(0.5);
            if fail {
                expected.push(label.to_string());
            }
            op.add_condition(Delayed::new(label, rng.random_range(0..40), fail, &log));
        }
    }

    queue.submit(&op);
    wait_finished(&op).await;

    assert_eq!(log.events().len(), labels.len());
    assert_eq!(condition_names(&op.errors().unwrap()), expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_conditions_start_concurrently() {
    let barrier = Arc::new(tokio::sync::Barrier::new(4));
    let op = Operation::noop("rendezvous");
    let conditions: Vec<Arc<dyn Condition>> = (0..4)
        .map(|_| {
            Arc::new(Rendezvous {
                barrier: Arc::clone(&barrier),
            }) as Arc<dyn Condition>
        })
        .collect();

    let failures = tokio::time::timeout(
        common::TIMEOUT,
        ConditionEvaluator::evaluate(&op, &conditions),
    )
    .await
    .expect("conditions were not evaluated concurrently");
    assert!(failures.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_condition_becomes_failure() {
    let queue = make_queue("panic", 1);
    let log = EventLog::default();
    let op = Operation::noop("guarded");
    op.add_condition(Exploding);
    op.add_condition(Delayed::new("after", 10, false, &log));

    queue.submit(&op);
    wait_finished(&op).await;

    let errors = op.errors().unwrap();
    assert!(matches!(
        &errors[..],
        [OperationError::ConditionFailed { condition, .. }] if condition == "Exploding"
    ));
    assert_eq!(log.events(), vec!["after"]);
}

// ============================================================================
// NO CANCELLED DEPENDENCIES
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_cancelled_names_exact_subset() {
    let queue = make_queue("cancelled", 2);
    let b = Operation::noop("b");
    let c = Operation::noop("c");
    let d = Operation::noop("d");
    b.cancel();
    d.cancel();
    let runs = Arc::new(AtomicUsize::new(0));
    let a = counting("a", &runs);
    for dep in [&b, &c, &d] {
        a.add_dependency(dep);
    }
    a.add_condition(NoCancelledDependencies::new());

    queue.submit_all([&b, &c, &d, &a]);
    wait_finished(&a).await;

    let errors = a.errors().unwrap();
    match &errors[..] {
        [OperationError::DependenciesCancelled(refs)] => {
            let ids: Vec<_> = refs.iter().map(|r| r.id).collect();
            assert_eq!(ids, vec![b.id(), d.id()]);
        }
        other => panic!("unexpected errors: {other:?}"),
    }
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_cancelled_satisfied_without_cancellations() {
    let queue = make_queue("clean", 2);
    let dep = Operation::noop("dep");
    let runs = Arc::new(AtomicUsize::new(0));
    let op = counting("op", &runs);
    op.add_dependency(&dep);
    op.add_condition(NoCancelledDependencies::new());

    queue.submit_all([&dep, &op]);
    wait_finished(&op).await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(op.errors().map(|e| e.len()), Some(0));
}

// ============================================================================
// NO FAILED DEPENDENCIES
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_dependency_blocks_execution() {
    // A depends on B (fails with E) and C (succeeds).
    let queue = make_queue("scenario", 2);
    let b = failing("b", "E");
    let c = Operation::noop("c");
    let runs = Arc::new(AtomicUsize::new(0));
    let a = counting("a", &runs);
    a.add_dependency(&b);
    a.add_dependency(&c);
    a.add_condition(NoFailedDependencies::new());

    queue.submit_all([&b, &c, &a]);
    wait_finished(&a).await;

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    let errors = a.errors().unwrap();
    match &errors[..] {
        [OperationError::DependenciesFailed(failures)] => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].dependency.id, b.id());
            assert!(matches!(
                &failures[0].errors[..],
                [OperationError::Execution(message)] if message == "E"
            ));
        }
        other => panic!("unexpected errors: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_all_errors_fatal_by_default() {
    let queue = make_queue("fatal", 2);
    let dep = failing("dep", "warning");
    dep.set_error_informer(|_: &OperationError| ErrorPurpose::Informative);
    let runs = Arc::new(AtomicUsize::new(0));
    let op = counting("op", &runs);
    op.add_dependency(&dep);
    op.add_condition(NoFailedDependencies::new());

    queue.submit_all([&dep, &op]);
    wait_finished(&op).await;

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(op.errors().map(|e| e.len()), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_significance_filters_informative_errors() {
    let queue = make_queue("significance", 2);
    let informative = failing("informative", "cache miss");
    informative.set_error_informer(|_: &OperationError| ErrorPurpose::Informative);
    let fatal = failing("fatal", "disk gone");
    let runs = Arc::new(AtomicUsize::new(0));

    let lenient = counting("lenient", &runs);
    lenient.add_dependency(&informative);
    lenient.add_condition(NoFailedDependencies::significant_only());

    let strict = counting("strict", &runs);
    strict.add_dependency(&informative);
    strict.add_dependency(&fatal);
    strict.add_condition(NoFailedDependencies::significant_only());

    queue.submit_all([&informative, &fatal, &lenient, &strict]);
    wait_finished(&lenient).await;
    wait_finished(&strict).await;

    assert_eq!(lenient.errors().map(|e| e.len()), Some(0));
    let errors = strict.errors().unwrap();
    match &errors[..] {
        [OperationError::DependenciesFailed(failures)] => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].dependency.id, fatal.id());
        }
        other => panic!("unexpected errors: {other:?}"),
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

// ============================================================================
// RESOLVERS
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_resolver_proceed_runs_dependent() {
    let queue = make_queue("proceed", 2);
    let dep = failing("dep", "offline");
    let runs = Arc::new(AtomicUsize::new(0));
    let op = counting("op", &runs);
    op.add_dependency_resolving(&dep, |_: &Operation, _: &[OperationError]| Resolution::Proceed);

    queue.submit_all([&dep, &op]);
    wait_finished(&op).await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(op.errors().map(|e| e.len()), Some(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_resolver_substitutes_error() {
    let queue = make_queue("substitute", 2);
    let dep = failing("dep", "404");
    let runs = Arc::new(AtomicUsize::new(0));
    let op = counting("op", &runs);
    op.add_dependency_resolving(&dep, |_: &Operation, errors: &[OperationError]| {
        assert_eq!(errors.len(), 1);
        Resolution::Substitute(OperationError::Execution("profile missing".into()))
    });

    queue.submit_all([&dep, &op]);
    wait_finished(&op).await;

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    let errors = op.errors().unwrap();
    assert!(matches!(
        &errors[..],
        [OperationError::Execution(message)] if message == "profile missing"
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_resolver_propagates_dependency_errors() {
    let queue = make_queue("propagate", 2);
    let dep = failing("dep", "boom");
    let op = Operation::noop("op");
    op.add_dependency_resolving(&dep, |_: &Operation, _: &[OperationError]| Resolution::Propagate);

    queue.submit_all([&dep, &op]);
    wait_finished(&op).await;

    let errors = op.errors().unwrap();
    match &errors[..] {
        [OperationError::DependencyFailed(failure)] => {
            assert_eq!(failure.dependency.name, "dep");
            assert_eq!(failure.errors.len(), 1);
        }
        other => panic!("unexpected errors: {other:?}"),
    }
}

// ============================================================================
// SILENT
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_silent_condition_skips_companion() {
    let queue = make_queue("silent", 2);
    let runs = Arc::new(AtomicUsize::new(0));
    let op = counting("op", &runs);
    let silent = SilentCondition::new(Companion);
    assert_eq!(silent.name(), "Silent<Companion>");
    op.add_condition(silent);

    queue.submit(&op);
    assert!(op.dependencies().is_empty());
    wait_finished(&op).await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
}
