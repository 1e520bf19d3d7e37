//! Tests for utility functions

use prometheus_operations::core::OperationState;
use prometheus_operations::util::telemetry::{init_tracing, DEFAULT_FILTER};

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialized twice");
}

#[test]
fn test_default_filter_targets_crate() {
    assert!(DEFAULT_FILTER.starts_with("prometheus_operations"));
}

#[test]
fn test_state_ordering() {
    assert!(OperationState::Initialized < OperationState::Pending);
    assert!(OperationState::Pending < OperationState::EvaluatingConditions);
    assert!(OperationState::Executing < OperationState::Finished);
}

#[test]
fn test_state_transitions() {
    assert!(OperationState::Initialized.can_transition_to(OperationState::Pending));
    assert!(OperationState::Executing.can_transition_to(OperationState::Finishing));
    assert!(!OperationState::Pending.can_transition_to(OperationState::Executing));
    assert!(!OperationState::Finished.can_transition_to(OperationState::Pending));
}
