//! The condition protocol and its concurrent evaluator.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::core::error::OperationError;
use crate::core::operation::Operation;

/// Outcome of evaluating a [`Condition`].
#[derive(Debug, Clone)]
pub enum ConditionResult {
    /// The operation may execute.
    Satisfied,
    /// The operation must not execute.
    Failed(OperationError),
}

impl ConditionResult {
    /// `true` for [`ConditionResult::Satisfied`].
    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

/// An asynchronous gate that must be satisfied before an operation executes.
///
/// Conditions are evaluated concurrently with the other conditions of the same
/// operation and are never skipped, even when another condition has already
/// failed.
#[async_trait]
pub trait Condition: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> String {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("Condition")
            .to_string()
    }

    /// Companion operation to run before the host operation.
    ///
    /// The queue submits the returned operation and wires it as a dependency
    /// of `operation` before `operation` can reach the pending state.
    fn dependency_for(&self, _operation: &Operation) -> Option<Operation> {
        None
    }

    /// Evaluate the condition for `operation`.
    async fn evaluate(&self, operation: &Operation) -> ConditionResult;
}

/// Runs every condition of an operation and collects the failures.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Evaluate `conditions` for `operation`.
    ///
    /// All evaluations start before any is awaited and all run to completion.
    /// Failures are returned in declaration order, whatever order the
    /// evaluations finished in. Must be called within a tokio runtime.
    pub async fn evaluate(
        operation: &Operation,
        conditions: &[Arc<dyn Condition>],
    ) -> Vec<OperationError> {
        let handles: Vec<_> = conditions
            .iter()
            .map(|condition| {
                let condition = Arc::clone(condition);
                let operation = operation.clone();
                tokio::spawn(async move { condition.evaluate(&operation).await })
            })
            .collect();

        let mut failures = Vec::new();
        for (condition, handle) in conditions.iter().zip(handles) {
            match handle.await {
                Ok(ConditionResult::Satisfied) => {}
                Ok(ConditionResult::Failed(error)) => failures.push(error),
                Err(join_error) => {
                    let name = condition.name();
                    warn!(operation = %operation.name(), condition = %name, "condition evaluation aborted");
                    failures.push(OperationError::ConditionFailed {
                        condition: name,
                        reason: join_error.to_string(),
                    });
                }
            }
        }
        failures
    }
}
