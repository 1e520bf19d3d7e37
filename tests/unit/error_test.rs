//! Tests for error types

use prometheus_operations::core::{
    DependencyFailure, DependencyRef, Operation, OperationError, PoolError, SchedulerError,
};

#[test]
fn test_execution_error() {
    let err = OperationError::Execution("disk full".to_string());
    assert_eq!(format!("{err}"), "execution failed: disk full");
}

#[test]
fn test_condition_failed_error() {
    let err = OperationError::ConditionFailed {
        condition: "Reachability".to_string(),
        reason: "offline".to_string(),
    };
    assert_eq!(format!("{err}"), "condition `Reachability` failed: offline");
}

#[test]
fn test_dependency_unfinished_error() {
    let dep = Operation::noop("fetch");
    let err = OperationError::DependencyUnfinished(DependencyRef::of(&dep));
    let text = err.to_string();
    assert!(text.starts_with("dependency `fetch`"));
    assert!(text.ends_with("has not finished"));
}

#[test]
fn test_dependencies_failed_lists_each() {
    let a = Operation::noop("a");
    let b = Operation::noop("b");
    let err = OperationError::DependenciesFailed(vec![
        DependencyFailure {
            dependency: DependencyRef::of(&a),
            errors: vec![OperationError::Execution("x".into())],
        },
        DependencyFailure {
            dependency: DependencyRef::of(&b),
            errors: vec![],
        },
    ]);
    let text = err.to_string();
    assert!(text.contains("`a`"));
    assert!(text.contains("`b`"));
    assert!(text.contains("with 1 error(s)"));
}

#[test]
fn test_pool_errors() {
    assert_eq!(PoolError::PoolShutdown.to_string(), "pool has been shut down");
    assert_eq!(
        PoolError::InvalidConfig("zero".into()).to_string(),
        "invalid configuration: zero"
    );
}

#[test]
fn test_scheduler_error_wraps_pool_error() {
    let err: SchedulerError = PoolError::PoolShutdown.into();
    assert_eq!(err.to_string(), "worker pool error: pool has been shut down");
    assert_eq!(
        SchedulerError::Config("empty name".into()).to_string(),
        "invalid configuration: empty name"
    );
}
